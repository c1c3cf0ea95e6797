//! core::lock
//!
//! Exclusive repository lock for mutating operations.
//!
//! Only one `av` process may mutate a repository at a time. Sync, restack,
//! reparent, and adopt acquire this lock for their whole run; read-only
//! commands do not. Acquisition is non-blocking: if another process holds
//! the lock we fail fast rather than queue behind an operation of unknown
//! duration.
//!
//! The lock is an OS-level exclusive file lock on `.git/av/lock` and is
//! released on drop, so a panic cannot leave the repository locked.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;

use super::paths::AvPaths;

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("another av operation is in progress in this repository")]
    AlreadyLocked,

    /// Failed to create the lock file or its directory.
    #[error("failed to create lock file: {0}")]
    CreateFailed(String),

    /// I/O error during lock operations.
    #[error("lock i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// RAII guard over the repository lock.
///
/// The lock is held as long as this value is alive and released on drop.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    file: Option<File>,
}

impl RepoLock {
    /// Attempt to acquire the repository lock (non-blocking).
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    pub fn acquire(paths: &AvPaths) -> Result<Self, LockError> {
        paths
            .ensure_dir()
            .map_err(|e| LockError::CreateFailed(e.to_string()))?;

        let path = paths.lock_file();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(format!("{}: {}", path.display(), e)))?;

        file.try_lock_exclusive()
            .map_err(|_| LockError::AlreadyLocked)?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Whether this guard currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_paths(dir: &std::path::Path) -> AvPaths {
        AvPaths::new(dir.join(".git"))
    }

    #[test]
    fn acquire_and_release() {
        let dir = tempdir().unwrap();
        let paths = test_paths(dir.path());

        let lock = RepoLock::acquire(&paths).unwrap();
        assert!(lock.is_held());
        assert!(paths.lock_file().exists());

        drop(lock);
        assert!(!paths.lock_file().exists());
    }

    #[test]
    fn second_acquisition_fails() {
        let dir = tempdir().unwrap();
        let paths = test_paths(dir.path());

        let _held = RepoLock::acquire(&paths).unwrap();
        let second = RepoLock::acquire(&paths);
        assert!(matches!(second, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn reacquire_after_release() {
        let dir = tempdir().unwrap();
        let paths = test_paths(dir.path());

        {
            let _lock = RepoLock::acquire(&paths).unwrap();
        }
        assert!(RepoLock::acquire(&paths).is_ok());
    }
}
