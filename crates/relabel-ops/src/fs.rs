//! Filesystem access used by the rename engine.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use relabel_core::FsError;

/// The filesystem primitives a rename needs.
///
/// Paths are storage paths as seen by the host; implementations map them
/// onto whatever backs the storage.
pub trait Filesystem: Send + Sync {
    /// Check whether anything (including a dangling symlink) exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Check whether `path` may be written.
    fn is_writable(&self, path: &str) -> bool;

    /// Set the permission mode of `path`. Returns whether it succeeded.
    fn chmod(&self, path: &str, mode: u32) -> bool;

    /// Move a file, failing with [`FsError::AlreadyExists`] instead of
    /// replacing an existing destination.
    fn move_no_overwrite(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Rename a directory, failing with [`FsError::AlreadyExists`] if the
    /// destination exists, even as an empty directory.
    fn rename_directory(&self, from: &str, to: &str) -> Result<(), FsError>;
}

/// The local disk, optionally with storage paths rooted at a base directory.
#[derive(Debug, Clone, Default)]
pub struct LocalFilesystem {
    root: Option<PathBuf>,
}

impl LocalFilesystem {
    /// Use storage paths as native paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve storage paths below `root`, so `/docs/a.txt` maps to
    /// `<root>/docs/a.txt`.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The native path for a storage path.
    pub fn locate(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(path),
        }
    }
}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &str) -> bool {
        fs::symlink_metadata(self.locate(path)).is_ok()
    }

    // Judged from the permission bits rather than by probing, so the answer
    // does not depend on the effective user.
    fn is_writable(&self, path: &str) -> bool {
        fs::metadata(self.locate(path))
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn chmod(&self, path: &str, mode: u32) -> bool {
        let native = self.locate(path);
        let result = set_mode(&native, mode);
        if let Err(e) = &result {
            debug!(path = %native.display(), error = %e, "chmod failed");
        }
        result.is_ok()
    }

    fn move_no_overwrite(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = self.locate(from);
        let to = self.locate(to);

        // A hard link fails atomically when the destination exists.
        match fs::hard_link(&from, &to) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(FsError::io(&to, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(FsError::io(&from, e)),
            Err(e) => {
                debug!(error = %e, "hard link unavailable, copying instead");
                copy_no_overwrite(&from, &to)?;
            }
        }

        if let Err(e) = fs::remove_file(&from) {
            let _ = fs::remove_file(&to);
            return Err(FsError::io(&from, e));
        }
        Ok(())
    }

    fn rename_directory(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = self.locate(from);
        let to = self.locate(to);

        rename_no_replace(&from, &to).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => FsError::io(&to, e),
            _ => FsError::io(&from, e),
        })
    }
}

/// `rename(2)` replaces an empty destination directory, so the kernel is
/// asked for `RENAME_NOREPLACE` where it supports it.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = |p: &Path| {
        CString::new(p.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))
    };
    let from_c = c_path(from)?;
    let to_c = c_path(to)?;

    // SAFETY: both pointers come from live CStrings and AT_FDCWD is a valid dirfd.
    let res = unsafe {
        libc::renameat2(
            libc::AT_FDCWD,
            from_c.as_ptr(),
            libc::AT_FDCWD,
            to_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };
    if res == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Kernel or filesystem without the flag.
        Some(libc::EINVAL) | Some(libc::ENOSYS) => {
            debug!(error = %err, "RENAME_NOREPLACE unsupported, checking destination instead");
            checked_rename(from, to)
        }
        _ => Err(err),
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    checked_rename(from, to)
}

/// Check-then-rename. Another process can still create `to` in between;
/// callers in this process are serialized by the engine's path locks.
fn checked_rename(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    fs::rename(from, to)
}

/// Copy a file to a destination that must not exist yet.
fn copy_no_overwrite(from: &Path, to: &Path) -> Result<(), FsError> {
    let mut source = File::open(from).map_err(|e| FsError::io(from, e))?;
    let mut dest = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(|e| FsError::io(to, e))?;

    if let Err(e) = io::copy(&mut source, &mut dest) {
        drop(dest);
        let _ = fs::remove_file(to);
        return Err(FsError::io(to, e));
    }

    if let Ok(metadata) = source.metadata() {
        let _ = fs::set_permissions(to, metadata.permissions());
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn set_mode(path: &Path, _mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
