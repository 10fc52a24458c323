use anyhow::Context;

use super::arg::{Args, FileArgs};

/// Extracts decoded HTTP response bodies into a directory tree derived
/// from the archived URLs.
pub fn extract(args: &Args, files: &FileArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating directory {:?} failed", args.output_dir))?;

    let mut extracted = 0u64;

    super::common::iterate_files(args, &files.file, |record, _context| {
        if crate::tool::extract_record(record, &args.output_dir)
            .with_context(|| {
                format!(
                    "extracting record {} failed",
                    record.record_id().unwrap_or_default()
                )
            })?
            .is_some()
        {
            extracted += 1;
        }

        Ok(())
    })?;

    tracing::info!(extracted, "extracted files");

    Ok(())
}
