use std::process::ExitCode;

use clap::Parser;

use photoflow::cli::{self, CliArgs};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    cli::run(CliArgs::parse())
}
