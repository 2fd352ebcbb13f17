//! One-way tree mirroring.
//!
//! ## Pass structure
//!
//! For each directory pair, starting at the roots:
//!
//! 1. Create the replica directory if missing.
//! 2. Copy every source file whose replica counterpart is missing or differs
//!    by content, then carry over the source's timestamps and permissions.
//!    A failed copy is logged and skipped; a copy whose metadata could not
//!    be applied is removed again. Replica symlinks are replaced, never
//!    written through.
//! 3. Recurse into every source subdirectory.
//! 4. Delete replica files and directories with no source counterpart,
//!    recursing into directories present on both sides.
//!
//! Anything failing outside the per-file copy step aborts the pass.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::comparator::{ContentComparator, Sha256Comparator};
use crate::error::{io_err, SyncError};
use crate::fs::{DirListing, FileSystem, LocalFs};
use crate::log::{messages, SyncLog};
use crate::report::{SyncOutcome, SyncReport};
use crate::retry::RetryPolicy;

const OP_RUN: &str = "run";
const OP_SYNC_DIRECTORIES: &str = "sync_directories";
const OP_COPY_FILE: &str = "copy_file";
const OP_DELETE_ORPHANS: &str = "delete_orphans";

/// Corresponding source and replica directories at one level of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPair {
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl DirectoryPair {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
        }
    }

    /// The pair one level down, joined by entry name on both sides.
    pub fn child(&self, name: &OsStr) -> Self {
        Self {
            source: self.source.join(name),
            replica: self.replica.join(name),
        }
    }
}

/// What step 2 must do for one source file.
enum CopyPlan {
    Create,
    Update,
    /// A directory sits where the file belongs.
    ReplaceDirectory,
    /// A symlink or other special entry sits where the file belongs.
    ReplaceSpecial,
    Skip,
}

/// Mirrors `source_root` onto `replica_root`.
pub struct TreeSynchronizer {
    source_root: PathBuf,
    replica_root: PathBuf,
    log: Arc<dyn SyncLog>,
    comparator: Arc<dyn ContentComparator>,
    fs: Arc<dyn FileSystem>,
    retry: RetryPolicy,
    dry_run: bool,
}

impl TreeSynchronizer {
    /// Build a synchronizer on the host filesystem with SHA-256 comparison
    /// and the default retry policy.
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        log: Arc<dyn SyncLog>,
    ) -> Result<Self, SyncError> {
        let source_root = source_root.into();
        let replica_root = replica_root.into();
        if source_root.as_os_str().is_empty() {
            return Err(SyncError::InvalidArgument(
                "source path must not be empty".to_string(),
            ));
        }
        if replica_root.as_os_str().is_empty() {
            return Err(SyncError::InvalidArgument(
                "replica path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            source_root,
            replica_root,
            log,
            comparator: Arc::new(Sha256Comparator),
            fs: Arc::new(LocalFs),
            retry: RetryPolicy::default(),
            dry_run: false,
        })
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn ContentComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log and report every action without touching the replica.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn replica_root(&self) -> &Path {
        &self.replica_root
    }

    /// Run one full pass.
    ///
    /// Errors are logged here before being returned; the caller decides
    /// whether to keep going.
    pub fn run(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.log.info(OP_RUN, messages::SYNC_STARTED);

        let mut outcomes = Vec::new();
        let root = DirectoryPair::new(&self.source_root, &self.replica_root);
        match self.sync_directories(&root, &mut outcomes) {
            Ok(()) => {
                let elapsed = clock.elapsed();
                self.log.info(OP_RUN, &messages::sync_complete(elapsed));
                Ok(SyncReport {
                    started_at,
                    elapsed,
                    dry_run: self.dry_run,
                    outcomes,
                })
            }
            Err(err) => {
                self.log.error(
                    OP_SYNC_DIRECTORIES,
                    &messages::fatal_sync_error(&err),
                    Some(&err),
                );
                self.log.error(
                    OP_RUN,
                    &messages::sync_failed(&self.source_root, &err),
                    Some(&err),
                );
                Err(err)
            }
        }
    }

    /// Steps 1–4 for one pair, recursing depth-first.
    fn sync_directories(
        &self,
        pair: &DirectoryPair,
        out: &mut Vec<SyncOutcome>,
    ) -> Result<(), SyncError> {
        self.ensure_replica_dir(pair, out)?;

        let source = self.list(&pair.source)?;
        for name in &source.files {
            self.sync_file(pair, name, out);
        }
        for name in &source.dirs {
            self.sync_directories(&pair.child(name), out)?;
        }

        self.delete_orphans(pair, out)
    }

    fn ensure_replica_dir(
        &self,
        pair: &DirectoryPair,
        out: &mut Vec<SyncOutcome>,
    ) -> Result<(), SyncError> {
        if self.fs.is_dir(&pair.replica) {
            return Ok(());
        }
        if self.fs.exists(&pair.replica) {
            // A file where the directory belongs.
            self.delete_file(&pair.replica, OP_SYNC_DIRECTORIES, out)?;
        }
        if !self.dry_run {
            self.fs
                .create_dir_all(&pair.replica)
                .map_err(|e| io_err(&pair.replica, e))?;
        }
        let path = self.relative(&pair.replica);
        self.info(OP_SYNC_DIRECTORIES, &messages::dir_created(&path));
        out.push(SyncOutcome::DirectoryCreated { path });
        Ok(())
    }

    /// Step 2 for one file. Never fails the pass.
    fn sync_file(&self, pair: &DirectoryPair, name: &OsStr, out: &mut Vec<SyncOutcome>) {
        let source = pair.source.join(name);
        let replica = pair.replica.join(name);
        let path = self.relative(&replica);

        let plan = self.plan_copy(&source, &replica);
        if let CopyPlan::Skip = plan {
            tracing::debug!("unchanged: {}", path.display());
            out.push(SyncOutcome::Unchanged { path });
            return;
        }

        match plan {
            CopyPlan::ReplaceDirectory => {
                if let Err(err) = self.remove_dir_all(&replica) {
                    self.copy_failed(path, err, out);
                    return;
                }
                self.info(OP_COPY_FILE, &messages::dir_deleted(&path));
                out.push(SyncOutcome::DirectoryDeleted { path: path.clone() });
            }
            CopyPlan::ReplaceSpecial => {
                // Removes the link itself; the copy must never write through it.
                if let Err(err) = self.remove_entry(&replica) {
                    self.copy_failed(path, err, out);
                    return;
                }
                self.info(OP_COPY_FILE, &messages::file_deleted(&path));
                out.push(SyncOutcome::Deleted { path: path.clone() });
            }
            _ => {}
        }

        if let Err(err) = self.copy_with_metadata(&source, &replica) {
            self.copy_failed(path, err, out);
            return;
        }

        self.info(OP_COPY_FILE, &messages::file_copied(&path));
        out.push(match plan {
            CopyPlan::Update => SyncOutcome::Updated { path },
            _ => SyncOutcome::Created { path },
        });
    }

    fn plan_copy(&self, source: &Path, replica: &Path) -> CopyPlan {
        if !self.fs.exists(replica) {
            return CopyPlan::Create;
        }
        if self.fs.is_dir(replica) {
            return CopyPlan::ReplaceDirectory;
        }
        if !self.fs.is_file(replica) {
            return CopyPlan::ReplaceSpecial;
        }
        match self.comparator.are_equal(self.fs.as_ref(), source, replica) {
            Ok(true) => CopyPlan::Skip,
            Ok(false) => CopyPlan::Update,
            Err(err) => {
                // Unreadable either side: let the copy decide.
                tracing::debug!("compare failed for {}: {err}", replica.display());
                CopyPlan::Update
            }
        }
    }

    fn copy_with_metadata(&self, source: &Path, replica: &Path) -> io::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        self.fs.copy_file(source, replica)?;
        if let Err(err) = self.fs.copy_metadata(source, replica) {
            // A copy without its metadata would compare equal on the next
            // pass and never be fixed.
            if let Err(cleanup) = self.fs.remove_file(replica) {
                tracing::warn!(
                    "could not remove {} after metadata failure: {cleanup}",
                    replica.display()
                );
            }
            return Err(err);
        }
        Ok(())
    }

    fn copy_failed(&self, path: PathBuf, err: io::Error, out: &mut Vec<SyncOutcome>) {
        self.log.error(
            OP_COPY_FILE,
            &messages::file_copy_failed(&path, &err),
            Some(&err),
        );
        out.push(SyncOutcome::Failed {
            path,
            error: err.to_string(),
        });
    }

    /// Remove replica entries with no source counterpart, bottom-up through
    /// every directory present on both sides.
    fn delete_orphans(
        &self,
        pair: &DirectoryPair,
        out: &mut Vec<SyncOutcome>,
    ) -> Result<(), SyncError> {
        // Only reachable in dry-run, where the replica directory was never created.
        if !self.fs.is_dir(&pair.replica) {
            return Ok(());
        }

        let source = self.list(&pair.source)?;
        let replica = self.list(&pair.replica)?;
        let source_files: HashSet<&OsString> = source.files.iter().collect();
        let source_dirs: HashSet<&OsString> = source.dirs.iter().collect();

        // Names present in the source with the other kind belong to the
        // forward pass.
        for name in &replica.files {
            if !source_files.contains(name) && !source_dirs.contains(name) {
                self.delete_file(&pair.replica.join(name), OP_DELETE_ORPHANS, out)?;
            }
        }

        let mut shared = Vec::new();
        for name in &replica.dirs {
            if source_dirs.contains(name) {
                shared.push(name);
                continue;
            }
            if source_files.contains(name) {
                continue;
            }
            let dir = pair.replica.join(name);
            self.remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
            let path = self.relative(&dir);
            self.info(OP_DELETE_ORPHANS, &messages::dir_deleted(&path));
            out.push(SyncOutcome::DirectoryDeleted { path });
        }

        for name in shared {
            self.delete_orphans(&pair.child(name), out)?;
        }
        Ok(())
    }

    /// Delete one replica file under the retry policy.
    ///
    /// A file that is already gone counts as deleted.
    fn delete_file(
        &self,
        file: &Path,
        op: &str,
        out: &mut Vec<SyncOutcome>,
    ) -> Result<(), SyncError> {
        if !self.dry_run {
            self.retry
                .retry(|_| match self.fs.remove_file(file) {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                })
                .map_err(|attempts| SyncError::RetryExhausted {
                    path: file.to_path_buf(),
                    attempts,
                })?;
        }
        let path = self.relative(file);
        self.info(op, &messages::file_deleted(&path));
        out.push(SyncOutcome::Deleted { path });
        Ok(())
    }

    fn remove_entry(&self, path: &Path) -> io::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        self.fs.remove_file(path)
    }

    fn remove_dir_all(&self, dir: &Path) -> io::Result<()> {
        if self.dry_run {
            return Ok(());
        }
        self.fs.remove_dir_all(dir)
    }

    fn list(&self, dir: &Path) -> Result<DirListing, SyncError> {
        self.fs.list_dir(dir).map_err(|e| io_err(dir, e))
    }

    fn info(&self, op: &str, message: &str) {
        if self.dry_run {
            self.log.info(op, &messages::dry_run(message));
        } else {
            self.log.info(op, message);
        }
    }

    /// `path` relative to the replica root; the root itself stays absolute.
    fn relative(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.replica_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => path.to_path_buf(),
        }
    }
}
