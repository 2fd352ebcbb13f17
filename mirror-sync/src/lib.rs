//! # mirror-sync
//!
//! One-way directory mirroring engine.
//!
//! Build a [`TreeSynchronizer`] for a source/replica pair and call
//! [`TreeSynchronizer::run`] once per pass. Logging, content comparison and
//! filesystem access are injected capabilities ([`SyncLog`],
//! [`ContentComparator`], [`FileSystem`]).

pub mod comparator;
pub mod error;
pub mod fs;
pub mod log;
pub mod report;
pub mod retry;
pub mod synchronizer;

pub use comparator::{ContentComparator, FileFingerprint, Sha256Comparator};
pub use error::SyncError;
pub use fs::{DirListing, FileSystem, LocalFs};
pub use log::{SyncLog, TracingLog};
pub use report::{SyncOutcome, SyncReport};
pub use retry::RetryPolicy;
pub use synchronizer::{DirectoryPair, TreeSynchronizer};
