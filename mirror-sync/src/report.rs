//! Per-entry outcomes of a sync pass.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one replica entry. Paths are relative to the replica
/// root; the root itself is reported by its full path.
///
/// In dry-run mode the same variants describe what *would* have happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncOutcome {
    DirectoryCreated { path: PathBuf },
    /// File copied where the replica had none.
    Created { path: PathBuf },
    /// File copied over a replica file with different content.
    Updated { path: PathBuf },
    /// Replica file already byte-identical.
    Unchanged { path: PathBuf },
    Deleted { path: PathBuf },
    DirectoryDeleted { path: PathBuf },
    /// Copy failed; the pass carried on.
    Failed { path: PathBuf, error: String },
}

impl SyncOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            SyncOutcome::DirectoryCreated { path }
            | SyncOutcome::Created { path }
            | SyncOutcome::Updated { path }
            | SyncOutcome::Unchanged { path }
            | SyncOutcome::Deleted { path }
            | SyncOutcome::DirectoryDeleted { path }
            | SyncOutcome::Failed { path, .. } => path,
        }
    }

    /// `true` for outcomes that change the replica.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            SyncOutcome::Unchanged { .. } | SyncOutcome::Failed { .. }
        )
    }
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub dry_run: bool,
    pub outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Created { .. } | SyncOutcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Unchanged { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                SyncOutcome::Deleted { .. } | SyncOutcome::DirectoryDeleted { .. }
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Failed { .. }))
    }

    /// `true` when the pass changed nothing in the replica.
    pub fn is_noop(&self) -> bool {
        !self.outcomes.iter().any(SyncOutcome::is_change)
    }

    fn count(&self, pred: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
