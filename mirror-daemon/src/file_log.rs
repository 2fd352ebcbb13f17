//! Operation log written to the configured log file.
//!
//! Line format:
//!
//! ```text
//! [2024-05-01 12:00:00] [INFO] [copy_file] Copied: docs/readme.md
//! [2024-05-01 12:00:01] [ERROR] [run] Synchronization failed for /data: ...
//! Cause: I/O error at /data: permission denied
//! ```
//!
//! Each event is also emitted through `tracing` for the console. A failed
//! file write is reported on stderr and otherwise ignored.

use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use mirror_sync::SyncLog;

use crate::error::{io_err, DaemonError};

pub struct FileLog {
    path: PathBuf,
    // Serializes appends; the file is reopened per line so rotation is safe.
    write_lock: Mutex<()>,
}

impl FileLog {
    /// Create the log's directory and file if they do not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(
        &self,
        level: &str,
        op: &str,
        message: &str,
        cause: Option<&(dyn Error + 'static)>,
    ) {
        let mut entry = format!(
            "[{}] [{level}] [{op}] {message}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(cause) = cause {
            entry.push_str(&format!("\nCause: {}", cause_chain(cause)));
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(err) = self.append(&entry) {
            eprintln!("!! FAILED TO LOG: {err} !!");
        }
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{entry}")
    }
}

impl SyncLog for FileLog {
    fn info(&self, op: &str, message: &str) {
        tracing::info!(op, "{message}");
        self.write_entry("INFO", op, message, None);
    }

    fn error(&self, op: &str, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(op, cause = %cause, "{message}"),
            None => tracing::error!(op, "{message}"),
        }
        self.write_entry("ERROR", op, message, cause);
    }
}

/// `outer: inner: innermost`
fn cause_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_creates_parent_directories_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("nested").join("sync.log");
        FileLog::new(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn info_line_has_timestamp_level_and_operation() {
        let dir = TempDir::new().unwrap();
        let log = FileLog::new(dir.path().join("sync.log")).unwrap();
        log.info("copy_file", "Copied: a.txt");

        let contents = fs::read_to_string(log.path()).unwrap();
        let line = contents.lines().next().unwrap();
        assert!(line.starts_with('['), "got: {line}");
        // "[YYYY-MM-DD HH:MM:SS] " is 22 characters.
        assert_eq!(&line[22..], "[INFO] [copy_file] Copied: a.txt");
    }

    #[test]
    fn error_line_carries_cause() {
        let dir = TempDir::new().unwrap();
        let log = FileLog::new(dir.path().join("sync.log")).unwrap();
        let cause = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        log.error("copy_file", "Failed to copy b.txt: access denied", Some(&cause));

        let contents = fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("[ERROR] [copy_file] Failed to copy b.txt"));
        assert!(contents.contains("Cause: access denied"));
    }

    #[test]
    fn lines_are_appended_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");
        FileLog::new(&path).unwrap().info("run", "first");
        FileLog::new(&path).unwrap().info("run", "second");

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn write_failure_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");
        let log = FileLog::new(&path).unwrap();
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        log.info("run", "goes to stderr instead");
    }
}
