use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context;

use crate::{record::Record, warc::WarcReader};

use super::arg::Args;
use super::io::ProgramOutput;

static CANCEL: AtomicBool = AtomicBool::new(false);

/// Requests that record iteration stop at the next record boundary.
pub fn request_cancel() {
    CANCEL.store(true, Ordering::Relaxed);
}

fn cancel_requested() -> bool {
    CANCEL.load(Ordering::Relaxed)
}

pub fn open_output(path: &Path) -> anyhow::Result<ProgramOutput> {
    ProgramOutput::open(path).context("opening output file failed")
}

/// Where a record sits within the run.
pub struct RecordContext<'a> {
    pub file: &'a Path,
    /// The record index within the current file.
    pub order: u64,
    /// The record count over all files so far.
    pub num_records: u64,
}

/// Iterates every record of every input file and applies the callback.
///
/// Honors the `--record` ID filter, the `--keep-going` flag (log and
/// continue on per-record errors), the cancellation flag, and drives the
/// progress bar.
pub fn iterate_files<F>(args: &Args, files: &[PathBuf], mut action: F) -> anyhow::Result<()>
where
    F: FnMut(&mut Record, &RecordContext) -> anyhow::Result<()>,
{
    let filter: Option<HashSet<&str>> = if args.record.is_empty() {
        None
    } else {
        Some(args.record.iter().map(String::as_str).collect())
    };

    let mut num_records = 0u64;

    for path in files {
        let span = tracing::info_span!("file", ?path);
        let _span_guard = span.enter();

        let mut reader = WarcReader::open(path, args.force_read_gzip)
            .with_context(|| format!("opening archive {:?} failed", path))?;

        let file_len = std::fs::metadata(path).map(|m| m.len()).ok();
        let progress = super::progress::FileProgress::start(path, file_len);

        let mut order = 0u64;

        loop {
            if cancel_requested() {
                tracing::info!("cancelled");
                break;
            }

            let (mut record, has_more) = match reader.read_record(args.preserve_block) {
                Ok(value) => value,
                Err(error) if args.keep_going => {
                    tracing::error!(?error, "skipping rest of file");
                    break;
                }
                Err(error) => {
                    return Err(error)
                        .with_context(|| format!("reading archive {:?} failed", path));
                }
            };

            progress.record(
                record.record_id().unwrap_or_default(),
                reader.position().ok(),
            );

            let selected = match &filter {
                Some(ids) => record
                    .record_id()
                    .is_some_and(|id| ids.contains(id)),
                None => true,
            };

            if selected {
                let context = RecordContext {
                    file: path,
                    order,
                    num_records,
                };

                match action(&mut record, &context) {
                    Ok(()) => {}
                    Err(error) if args.keep_going => {
                        tracing::error!(?error, record_id = record.record_id(), "record failed");
                    }
                    Err(error) => return Err(error),
                }
            } else {
                tracing::debug!(record_id = record.record_id(), "skipped by filter");
            }

            order += 1;
            num_records += 1;

            if !has_more {
                break;
            }
        }

        progress.finish();

        tracing::info!(records = order, "finished file");
    }

    Ok(())
}
