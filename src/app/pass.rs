use std::io::Write;

use super::arg::{Args, FileArgs};

/// Reads each archive and re-serializes it to the output.
pub fn pass(args: &Args, files: &FileArgs) -> anyhow::Result<()> {
    let mut output = super::common::open_output(&args.output)?;

    super::common::iterate_files(args, &files.file, |record, _context| {
        record.serialize(&mut output)?;

        Ok(())
    })?;

    output.flush()?;

    Ok(())
}
