//! Size-based rotation of the operation log.
//!
//! Checked before every pass. An oversized `sync.log` becomes `sync.log.1`,
//! older copies shift up by one, and copies past `max_files` are dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_ROTATED_FILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotation {
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for LogRotation {
    fn default() -> Self {
        Self {
            max_bytes: MAX_LOG_BYTES,
            max_files: MAX_ROTATED_FILES,
        }
    }
}

impl LogRotation {
    /// Rotate `log_path` once it reaches `max_bytes`.
    ///
    /// Returns `Ok(false)` when the file is small enough or missing. The live
    /// path is recreated empty after a rotation.
    pub fn rotate_if_needed(&self, log_path: &Path) -> io::Result<bool> {
        let len = match fs::metadata(log_path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };
        if len < self.max_bytes {
            return Ok(false);
        }

        let oldest = backup_path(log_path, self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = backup_path(log_path, n);
            if from.exists() {
                fs::rename(&from, backup_path(log_path, n + 1))?;
            }
        }
        fs::rename(log_path, backup_path(log_path, 1))?;
        fs::File::create(log_path)?;
        Ok(true)
    }

    /// Rotate, reporting problems through `tracing` instead of failing.
    pub fn rotate_quietly(&self, log_path: &Path) {
        match self.rotate_if_needed(log_path) {
            Ok(true) => tracing::info!(path = %log_path.display(), "log file rotated"),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(path = %log_path.display(), error = %err, "log rotation failed")
            }
        }
    }
}

/// `sync.log` + 2 → `sync.log.2`
pub fn backup_path(base: &Path, n: usize) -> PathBuf {
    let mut name = base
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "sync.log".into());
    name.push(format!(".{n}"));
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small() -> LogRotation {
        LogRotation {
            max_bytes: 16,
            max_files: 3,
        }
    }

    #[test]
    fn backup_names_append_index() {
        assert_eq!(
            backup_path(Path::new("/logs/sync.log"), 2),
            PathBuf::from("/logs/sync.log.2")
        );
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("sync.log");
        fs::write(&log, "short").unwrap();

        assert!(!small().rotate_if_needed(&log).unwrap());
        assert!(!backup_path(&log, 1).exists());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!small().rotate_if_needed(&dir.path().join("none.log")).unwrap());
    }

    #[test]
    fn oversized_log_moves_to_first_backup() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("sync.log");
        fs::write(&log, "0123456789abcdefXYZ").unwrap();

        assert!(small().rotate_if_needed(&log).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert_eq!(
            fs::read_to_string(backup_path(&log, 1)).unwrap(),
            "0123456789abcdefXYZ"
        );
    }

    #[test]
    fn backups_shift_and_are_capped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("sync.log");
        let rotation = small();

        for round in 1..=5 {
            fs::write(&log, format!("round {round} padding padding")).unwrap();
            rotation.rotate_if_needed(&log).unwrap();
        }

        assert!(fs::read_to_string(backup_path(&log, 1)).unwrap().starts_with("round 5"));
        assert!(fs::read_to_string(backup_path(&log, 3)).unwrap().starts_with("round 3"));
        assert!(!backup_path(&log, 4).exists(), "at most max_files backups");
    }
}
