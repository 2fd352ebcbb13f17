//! Filesystem capability consumed by the synchronizer.
//!
//! [`LocalFs`] is the real implementation on `std::fs` + `filetime`. Tests
//! wrap it to inject failures on chosen paths.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use filetime::FileTime;

/// Immediate children of a directory, split by kind and sorted by name.
///
/// Symlinks and other special entries are left out of both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub files: Vec<OsString>,
    pub dirs: Vec<OsString>,
}

/// Every filesystem operation a sync pass performs.
pub trait FileSystem: Send + Sync {
    /// `true` for any entry at `path`, without following symlinks.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// `true` only for a regular file; symlinks are not followed.
    fn is_file(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn list_dir(&self, path: &Path) -> io::Result<DirListing>;

    /// Copy `from` over `to`, replacing any existing file.
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Apply `from`'s timestamps and permission bits to `to`.
    fn copy_metadata(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<DirListing> {
        let mut listing = DirListing::default();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                listing.dirs.push(entry.file_name());
            } else if file_type.is_file() {
                listing.files.push(entry.file_name());
            } else {
                tracing::debug!("skipping special entry: {}", entry.path().display());
            }
        }
        listing.files.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        // A read-only replica (mirrored from a read-only source) must be
        // writable again before it can be overwritten.
        if let Ok(meta) = fs::metadata(to) {
            if meta.permissions().readonly() {
                fs::set_permissions(to, writable(meta.permissions()))?;
            }
        }
        fs::copy(from, to).map(|_| ())
    }

    fn copy_metadata(&self, from: &Path, to: &Path) -> io::Result<()> {
        let meta = fs::metadata(from)?;
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        filetime::set_file_times(to, atime, mtime)?;
        set_created(to, &meta)?;
        // Permissions last: a read-only copy rejects the time updates on Windows.
        fs::set_permissions(to, meta.permissions())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
}

#[cfg(unix)]
fn writable(perms: fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::Permissions::from_mode(perms.mode() | 0o200)
}

#[cfg(not(unix))]
fn writable(mut perms: fs::Permissions) -> fs::Permissions {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    perms
}

#[cfg(windows)]
fn set_created(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    use std::os::windows::fs::FileTimesExt;

    let created = meta.created()?;
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_times(fs::FileTimes::new().set_created(created))
}

// Creation time cannot be set on this platform.
#[cfg(not(windows))]
fn set_created(_path: &Path, _meta: &fs::Metadata) -> io::Result<()> {
    Ok(())
}
