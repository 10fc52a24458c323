use crate::warc::{GzipMode, WarcWriter};

use super::arg::{Args, FileArgs};

/// Streams the records of every input into a single output archive.
pub fn concat(args: &Args, files: &FileArgs) -> anyhow::Result<()> {
    let output = super::common::open_output(&args.output)?;

    let mode = if args.gzip {
        GzipMode::PerRecord
    } else {
        GzipMode::None
    };

    let mut writer = WarcWriter::new(output, mode);
    let mut written = 0u64;

    super::common::iterate_files(args, &files.file, |record, _context| {
        writer.write_record(record)?;
        written += 1;

        if written % 1000 == 0 {
            tracing::info!(written, "wrote records so far");
        }

        Ok(())
    })?;

    writer.finish()?;

    tracing::info!(written, "concatenated records");

    Ok(())
}
