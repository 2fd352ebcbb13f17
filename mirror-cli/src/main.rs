//! mirror — one-way periodic directory mirroring.
//!
//! # Usage
//!
//! ```text
//! mirror <source> <replica> <interval-seconds> <log-file> [--once] [--dry-run]
//! mirror [--once] [--dry-run]                    # reads ./config.json
//! mirror --config <file.json|file.yaml> [--once] [--dry-run] [--json]
//! ```

mod commands;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use commands::sync::SyncArgs;

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Mirror a source directory onto a replica, one way, on a fixed interval",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.sync.run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", format!("Fatal error: {err:#}").red());
            ExitCode::FAILURE
        }
    }
}
