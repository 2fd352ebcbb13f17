//! Content equality — SHA-256 fingerprints over full file contents.
//!
//! Sizes and timestamps are never consulted: two files are equal exactly when
//! their digests match.

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::fs::FileSystem;

const READ_CHUNK: usize = 64 * 1024;

/// Hex-encoded SHA-256 digest of a file's bytes. Computed on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFingerprint(pub String);

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Decides whether two existing files hold the same bytes.
pub trait ContentComparator: Send + Sync {
    /// Fails with the underlying I/O error when either file cannot be read.
    fn are_equal(&self, fs: &dyn FileSystem, a: &Path, b: &Path) -> io::Result<bool>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Comparator;

impl Sha256Comparator {
    pub fn fingerprint(&self, fs: &dyn FileSystem, path: &Path) -> io::Result<FileFingerprint> {
        let reader = fs.open_read(path)?;
        fingerprint_reader(reader)
    }
}

impl ContentComparator for Sha256Comparator {
    fn are_equal(&self, fs: &dyn FileSystem, a: &Path, b: &Path) -> io::Result<bool> {
        let left = self.fingerprint(fs, a)?;
        let right = self.fingerprint(fs, b)?;
        Ok(left == right)
    }
}

/// Stream `reader` to the end through SHA-256.
pub fn fingerprint_reader(mut reader: impl Read) -> io::Result<FileFingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(FileFingerprint(hex::encode(hasher.finalize())))
}
