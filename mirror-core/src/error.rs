//! Error types for mirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No config file at the expected location.
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    /// JSON parse error — includes file path and serde_json line context.
    #[error("Invalid configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parse error — includes file path and serde_yaml line context.
    #[error("Invalid configuration in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Interval is missing, not a number, or not strictly positive.
    #[error("Invalid time interval: {value}")]
    InvalidInterval { value: String },

    /// A required path setting is empty.
    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },

    #[error("RetryAttempts must be at least 1")]
    InvalidRetryAttempts,

    /// Source and replica nest inside one another.
    #[error("ReplicaPath {replica_path} overlaps SourcePath {source_path}")]
    OverlappingPaths {
        source_path: PathBuf,
        replica_path: PathBuf,
    },

    /// Wrong number or shape of command-line arguments.
    #[error(
        "Usage: mirror <source> <replica> <interval-seconds> <log-file> \
         or no arguments for config.json"
    )]
    InvalidArgs,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
