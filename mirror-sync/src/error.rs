//! Error types for mirror-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can abort a sync pass.
///
/// Per-file copy failures never surface here; they are logged and recorded
/// as [`crate::SyncOutcome::Failed`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A structural I/O failure (listing or creating a directory, removing a
    /// directory tree), with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every attempt of a retried deletion failed.
    #[error(
        "failed to delete {path} after {} attempt(s): {}",
        .attempts.len(),
        join_errors(.attempts)
    )]
    RetryExhausted {
        path: PathBuf,
        attempts: Vec<std::io::Error>,
    },

    /// Rejected at construction time, before any traversal.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

fn join_errors(errors: &[std::io::Error]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("#{}: {e}", i + 1))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn retry_exhausted_lists_every_attempt() {
        let err = SyncError::RetryExhausted {
            path: PathBuf::from("/replica/locked.txt"),
            attempts: vec![
                Error::new(ErrorKind::PermissionDenied, "locked"),
                Error::new(ErrorKind::PermissionDenied, "still locked"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("/replica/locked.txt"), "got: {msg}");
        assert!(msg.contains("2 attempt(s)"), "got: {msg}");
        assert!(msg.contains("#1: locked"), "got: {msg}");
        assert!(msg.contains("#2: still locked"), "got: {msg}");
    }
}
