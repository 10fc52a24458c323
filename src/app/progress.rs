use std::{
    path::Path,
    sync::{LazyLock, Mutex, MutexGuard, PoisonError},
};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

fn bars() -> MutexGuard<'static, MultiProgress> {
    static BARS: LazyLock<Mutex<MultiProgress>> = LazyLock::new(|| {
        Mutex::new(MultiProgress::with_draw_target(
            ProgressDrawTarget::stderr_with_hz(4),
        ))
    });

    BARS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hides progress output for the rest of the run.
pub fn disable() {
    bars().set_draw_target(ProgressDrawTarget::hidden());
}

/// Runs `f` with the progress display cleared so other terminal output
/// does not interleave with the bars.
pub fn suspend<T, F: FnOnce() -> T>(f: F) -> T {
    bars().suspend(f)
}

/// Activity display for reading one archive file.
///
/// With a known file length the bar tracks the position within the
/// archive; otherwise a spinner names the record in flight.
pub struct FileProgress {
    bar: ProgressBar,
}

impl FileProgress {
    pub fn start(path: &Path, file_len: Option<u64>) -> Self {
        let template = if file_len.is_some() {
            "{msg} [{wide_bar}] {binary_bytes}/{binary_total_bytes}"
        } else {
            "{spinner} {msg}"
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("|/-\\*")
            .progress_chars("=>.");

        let bar = ProgressBar::new(file_len.unwrap_or_default()).with_style(style);
        bar.set_message(path.display().to_string());
        bars().add(bar.clone());

        Self { bar }
    }

    /// Shows the record currently being processed.
    pub fn record(&self, record_id: &str, position: Option<u64>) {
        self.bar.set_message(format!("record {}", record_id));

        if let Some(position) = position {
            self.bar.set_position(position);
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
        bars().remove(&self.bar);
    }
}
