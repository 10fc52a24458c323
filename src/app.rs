use std::process::ExitCode;

use clap::Parser;

use self::arg::{Args, Command};

pub mod arg;

mod common;
mod concat;
mod extract;
mod io;
mod list;
mod logging;
mod pass;
mod progress;
mod split;
mod verify;

const VERIFY_FAILED_EXIT_CODE: u8 = 1;
const ERROR_EXIT_CODE: u8 = 2;

pub fn run() -> ExitCode {
    let args = Args::parse();

    if !args.progress {
        self::progress::disable();
    }

    self::logging::set_up_logging(args.verbose);

    match run_impl(&args) {
        Ok(problems) if problems > 0 => {
            eprintln!("Verification failed. Problems: {}.", problems);
            ExitCode::from(VERIFY_FAILED_EXIT_CODE)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(?error);
            eprintln!("{:#}", error);
            ExitCode::from(ERROR_EXIT_CODE)
        }
    }
}

fn run_impl(args: &Args) -> anyhow::Result<usize> {
    match &args.command {
        Command::List(files) => self::list::list(args, files)?,
        Command::Pass(files) => self::pass::pass(args, files)?,
        Command::Concat(files) => self::concat::concat(args, files)?,
        Command::Split(files) => self::split::split(args, files)?,
        Command::Extract(files) => self::extract::extract(args, files)?,
        Command::Verify(files) => return self::verify::verify(args, files),
    }

    Ok(0)
}
