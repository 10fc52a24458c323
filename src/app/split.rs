use anyhow::Context;

use super::arg::{Args, FileArgs};

/// Writes each record to its own `<stem>.<order>.warc[.gz]` file.
pub fn split(args: &Args, files: &FileArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating directory {:?} failed", args.output_dir))?;

    super::common::iterate_files(args, &files.file, |record, context| {
        let stem = context
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = crate::tool::strip_warc_extension(&stem);

        crate::tool::split_record(record, &args.output_dir, stem, context.order, args.gzip)
            .with_context(|| format!("splitting record {} failed", context.order))?;

        Ok(())
    })?;

    Ok(())
}
