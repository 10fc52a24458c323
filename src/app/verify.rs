use std::io::Write;

use crate::verify::Verifier;

use super::arg::{Args, FileArgs};

/// Runs conformance checks and returns the number of problems found.
pub fn verify(args: &Args, files: &FileArgs) -> anyhow::Result<usize> {
    let mut output = super::common::open_output(&args.output)?;
    let mut verifier = Verifier::new();
    let mut reported = 0usize;
    let mut current_file: Option<std::path::PathBuf> = None;

    super::common::iterate_files(args, &files.file, |record, context| {
        if current_file.as_deref() != Some(context.file) {
            verifier.start_archive();
            current_file = Some(context.file.to_path_buf());
        }

        verifier.check_record(record)?;

        // report problems as they are found
        for problem in &verifier.problems()[reported..] {
            writeln!(output, "Problem: {}", problem)?;
        }
        reported = verifier.problem_count();

        Ok(())
    })?;

    output.flush()?;

    Ok(verifier.problem_count())
}
