use std::{io::Write, sync::Mutex};

use tracing_subscriber::filter::LevelFilter;

/// Writer that suspends the progress bars while log lines are printed so
/// the two do not interleave on the terminal.
struct ProgressSuspendWriter<W: Write> {
    dest: W,
}

impl<W: Write> ProgressSuspendWriter<W> {
    fn new(dest: W) -> Self {
        Self { dest }
    }
}

impl<W: Write> Write for ProgressSuspendWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        super::progress::suspend(|| self.dest.write(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        super::progress::suspend(|| self.dest.flush())
    }
}

pub fn set_up_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let writer = ProgressSuspendWriter::new(std::io::stderr());

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(Mutex::new(writer))
        .init();

    tracing::debug!("logging configured");
}
