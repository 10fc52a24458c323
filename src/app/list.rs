use std::io::Write;

use chrono::SecondsFormat;

use super::arg::{Args, FileArgs};

pub fn list(args: &Args, files: &FileArgs) -> anyhow::Result<()> {
    let mut output = super::common::open_output(&args.output)?;

    super::common::iterate_files(args, &files.file, |record, context| {
        let date = record
            .date()
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        writeln!(output, "Record: {}", record.record_id().unwrap_or_default())?;
        writeln!(output, "  Order: {}", context.num_records)?;

        if let Some(offset) = record.file_offset {
            writeln!(output, "  File offset: {}", offset)?;
        }

        writeln!(output, "  Type: {}", record.warc_type().unwrap_or_default())?;
        writeln!(output, "  Date: {}", date)?;
        writeln!(output, "  Size: {}", record.content_length().unwrap_or(0))?;

        Ok(())
    })?;

    output.flush()?;

    Ok(())
}
