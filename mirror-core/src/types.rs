//! Configuration model.
//!
//! Keys are PascalCase on disk so that existing `config.json` files of the
//! form `{"SourcePath": ..., "IntervalInSeconds": ...}` load unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;

/// Settings for one mirrored source/replica pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncConfig {
    pub source_path: PathBuf,
    pub replica_path: PathBuf,
    pub interval_in_seconds: u64,
    pub log_file_path: PathBuf,

    /// Attempts made for each single-file deletion before giving up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base of the exponential delay between deletion attempts.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

impl SyncConfig {
    /// Build a config with default retry settings.
    pub fn new(
        source_path: impl Into<PathBuf>,
        replica_path: impl Into<PathBuf>,
        interval_in_seconds: u64,
        log_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            replica_path: replica_path.into(),
            interval_in_seconds,
            log_file_path: log_file_path.into(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }

    /// Reject settings no sync pass could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { field: "SourcePath" });
        }
        if self.replica_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { field: "ReplicaPath" });
        }
        if self.log_file_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath { field: "LogFilePath" });
        }
        if self.interval_in_seconds == 0 {
            return Err(ConfigError::InvalidInterval {
                value: self.interval_in_seconds.to_string(),
            });
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts);
        }
        check_disjoint(&self.source_path, &self.replica_path)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_in_seconds)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Fail when either root lies inside the other, or both are the same.
///
/// Compares components as given; resolve symlinks and relative parts first
/// to catch aliases.
pub fn check_disjoint(source: &Path, replica: &Path) -> Result<(), ConfigError> {
    if replica.starts_with(source) || source.starts_with(replica) {
        return Err(ConfigError::OverlappingPaths {
            source_path: source.to_path_buf(),
            replica_path: replica.to_path_buf(),
        });
    }
    Ok(())
}
