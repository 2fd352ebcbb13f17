//! Argument handling and the two run modes: periodic service and `--once`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use mirror_core::{config, ConfigError, SyncConfig};
use mirror_daemon::{run_once_blocking, start_blocking};
use mirror_sync::{SyncOutcome, SyncReport};

/// Exit status of a `--once` pass that completed with per-file copy failures.
const PARTIAL_FAILURE: u8 = 2;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Directory to mirror from.
    pub source: Option<String>,

    /// Directory to mirror onto; created if missing.
    pub replica: Option<String>,

    /// Seconds between passes.
    #[arg(allow_negative_numbers = true)]
    pub interval: Option<String>,

    /// Operation log file; created with its directory if missing.
    pub log_file: Option<String>,

    /// Read settings from this JSON or YAML file instead of ./config.json.
    #[arg(long, short = 'c', value_name = "FILE", conflicts_with = "source")]
    pub config: Option<PathBuf>,

    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,

    /// Log what would change without touching the replica.
    #[arg(long)]
    pub dry_run: bool,

    /// With `--once`, print the pass report as JSON.
    #[arg(long, requires = "once")]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let config = self.resolve_config().context("Configuration error")?;

        if !self.once {
            let summary = start_blocking(config, self.dry_run)?;
            println!(
                "stopped after {} pass(es), {} failed",
                summary.passes, summary.failed_passes
            );
            return Ok(ExitCode::SUCCESS);
        }

        let report = run_once_blocking(config, self.dry_run)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render report JSON")?
            );
        } else {
            print_report(&report);
        }

        if report.failed() > 0 {
            Ok(ExitCode::from(PARTIAL_FAILURE))
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }

    fn resolve_config(&self) -> Result<SyncConfig, ConfigError> {
        if let Some(path) = &self.config {
            return config::load_from_file(path);
        }
        match (&self.source, &self.replica, &self.interval, &self.log_file) {
            (Some(source), Some(replica), Some(interval), Some(log_file)) => {
                config::from_args(source, replica, interval, log_file)
            }
            (None, None, None, None) => config::load_default(),
            _ => Err(ConfigError::InvalidArgs),
        }
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let headline = format!(
        "{prefix}✓ synchronized in {:.2?} ({} copied, {} deleted, {} unchanged, {} failed)",
        report.elapsed,
        report.copied(),
        report.deleted(),
        report.unchanged(),
        report.failed(),
    );
    if report.failed() > 0 {
        println!("{}", headline.yellow());
    } else {
        println!("{}", headline.green());
    }

    for outcome in &report.outcomes {
        let path = outcome.path().display();
        match outcome {
            SyncOutcome::DirectoryCreated { .. } => println!("  +  {path}/"),
            SyncOutcome::Created { .. } => println!("  +  {path}"),
            SyncOutcome::Updated { .. } => println!("  ✎  {path}"),
            SyncOutcome::Deleted { .. } => println!("  -  {path}"),
            SyncOutcome::DirectoryDeleted { .. } => println!("  -  {path}/"),
            SyncOutcome::Failed { error, .. } => {
                println!("{}", format!("  ✗  {path}: {error}").red())
            }
            SyncOutcome::Unchanged { .. } => {}
        }
    }
}
