//! Log sink capability and the operation log's message texts.
//!
//! Every state-changing action of a pass goes through a [`SyncLog`]. Sinks
//! are fire-and-forget: implementations must swallow their own failures so
//! that logging can never fail a pass.

use std::error::Error;
use std::path::Path;
use std::time::Duration;

pub trait SyncLog: Send + Sync {
    /// `op` names the operation that produced the event.
    fn info(&self, op: &str, message: &str);

    fn error(&self, op: &str, message: &str, cause: Option<&(dyn Error + 'static)>);
}

/// Sink that forwards to the `log` facade only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl SyncLog for TracingLog {
    fn info(&self, op: &str, message: &str) {
        tracing::info!("[{op}] {message}");
    }

    fn error(&self, op: &str, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!("[{op}] {message} (cause: {cause})"),
            None => tracing::error!("[{op}] {message}"),
        }
    }
}

pub mod messages {
    use super::*;

    pub const SYNC_STARTED: &str = "Starting synchronization...";
    pub const SYNC_STOPPED_BY_USER: &str = "Synchronization stopped by user request";

    pub fn sync_complete(elapsed: Duration) -> String {
        format!("Synchronization complete. ({elapsed:.2?})")
    }

    pub fn sync_failed(source: &Path, err: &dyn Error) -> String {
        format!("Synchronization failed for {}: {err}", source.display())
    }

    pub fn fatal_sync_error(err: &dyn Error) -> String {
        format!("Fatal sync error: {err}")
    }

    pub fn file_copied(path: &Path) -> String {
        format!("Copied: {}", path.display())
    }

    pub fn file_deleted(path: &Path) -> String {
        format!("Deleted: {}", path.display())
    }

    pub fn dir_created(path: &Path) -> String {
        format!("Created directory: {}", path.display())
    }

    pub fn dir_deleted(path: &Path) -> String {
        format!("Deleted folder: {}", path.display())
    }

    pub fn file_copy_failed(path: &Path, err: &dyn Error) -> String {
        format!("Failed to copy {}: {err}", path.display())
    }

    pub fn dry_run(message: &str) -> String {
        format!("[dry-run] {message}")
    }
}
