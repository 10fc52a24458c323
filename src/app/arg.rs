use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Tool for handling Web ARChive (WARC) files.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The operation to perform. Use "help" for a list.
    #[command(subcommand)]
    pub command: Command,

    /// Output to FILE instead of standard out.
    #[clap(long, short, global = true, default_value = "-")]
    pub output: PathBuf,

    /// When outputting a file, use gzip compression.
    #[clap(long, short = 'z', global = true)]
    pub gzip: bool,

    /// Instead of guessing by filename, force reading archives as gzip
    /// compressed.
    #[clap(long, global = true)]
    pub force_read_gzip: bool,

    /// Increase verbosity. Can be used more than once.
    #[clap(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Apply the command to the record with the given ID when reading.
    /// Can be used more than once.
    #[clap(long, global = true)]
    pub record: Vec<String>,

    /// Don't attempt to parse content blocks.
    ///
    /// Parsed content blocks may not match content-length and hash digests
    /// on serialization.
    #[clap(long, global = true)]
    pub preserve_block: bool,

    /// For output operations that make multiple files, use the given
    /// directory instead of the current working directory.
    #[clap(long, short = 'd', global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Show progress or activity.
    #[clap(long, global = true)]
    pub progress: bool,

    /// Continue processing records despite errors.
    #[clap(long, global = true)]
    pub keep_going: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List contents of archives.
    List(FileArgs),
    /// Load archives and write them back out.
    Pass(FileArgs),
    /// Naively join archives into one.
    Concat(FileArgs),
    /// Split archives into individual records.
    Split(FileArgs),
    /// Extract files from archives.
    Extract(FileArgs),
    /// Verify digests and validate conformance.
    Verify(FileArgs),
}

#[derive(Debug, clap::Args)]
pub struct FileArgs {
    /// Filenames of archives to be read.
    #[clap(required = true)]
    pub file: Vec<PathBuf>,
}
