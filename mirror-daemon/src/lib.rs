//! Periodic driver around the sync engine: service loop, log file sink,
//! log rotation.

mod error;
pub mod file_log;
pub mod log_rotation;
mod runtime;

pub use error::DaemonError;
pub use file_log::FileLog;
pub use runtime::{run_once_blocking, start_blocking, ServiceSummary, SyncService};
