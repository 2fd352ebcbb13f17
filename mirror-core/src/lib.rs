//! mirror core library — configuration model, loading, errors.
//!
//! - [`types`] — [`SyncConfig`]
//! - [`config`] — config-file and argument loading
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use error::ConfigError;
pub use types::SyncConfig;
