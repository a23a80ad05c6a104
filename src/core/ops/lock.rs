//! core::ops::lock
//!
//! Exclusive writer lock for the working file.
//!
//! # Architecture
//!
//! Only one aio process may mutate the working file at a time. The lock turns
//! that assumption into an enforced invariant: a transaction or revert
//! acquires it before touching the file, and a successful transaction hands
//! the guard to its background commit job so the lock covers the merge back
//! into trunk as well.
//!
//! # Storage
//!
//! - `<home>/.git/aio/lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//! - The guard is `Send`, so it can move into a commit job thread
//!
//! # Example
//!
//! ```ignore
//! use aio::core::ops::lock::DataLock;
//!
//! let lock = DataLock::acquire(&paths)?;
//! // mutate the working file while holding the lock
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::AppPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("data file is locked by another aio process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on the working file.
///
/// Released when dropped, even if the holder panics.
#[derive(Debug)]
pub struct DataLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    file: Option<File>,
}

impl DataLock {
    /// Attempt to acquire the writer lock.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    /// Non-blocking: if another process holds the lock this returns
    /// [`LockError::AlreadyLocked`] immediately.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &AppPaths) -> Result<Self, LockError> {
        Self::acquire_at(&paths.lock_path())
    }

    /// Attempt to acquire a lock at an explicit file path.
    pub fn acquire_at(path: &Path) -> Result<Self, LockError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "writer lock acquired");
                Ok(Self {
                    path: path.to_path_buf(),
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::AlreadyLocked)
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire the lock, returning None if already held.
    pub fn try_acquire(paths: &AppPaths) -> Result<Option<Self>, LockError> {
        match Self::acquire(paths) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// Called automatically on drop; calling it twice is harmless.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
            tracing::debug!(path = %self.path.display(), "writer lock released");
        }
        Ok(())
    }
}

impl Drop for DataLock {
    fn drop(&mut self) {
        // Best-effort release on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(dir: &Path) -> AppPaths {
        AppPaths::new(dir.to_path_buf(), "data.db")
    }

    #[test]
    fn lock_acquire_creates_state_dir() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        assert!(!paths.state_dir().exists());

        let lock = DataLock::acquire(&paths).expect("acquire lock");
        assert!(lock.is_held());
        assert!(paths.state_dir().exists());
        assert_eq!(lock.path(), paths.lock_path());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let _lock = DataLock::acquire(&paths).expect("first acquire");
        let result = DataLock::acquire(&paths);
        assert!(matches!(result, Err(LockError::AlreadyLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        {
            let _lock = DataLock::acquire(&paths).expect("first acquire");
        }

        let lock = DataLock::acquire(&paths).expect("second acquire");
        assert!(lock.is_held());
    }

    #[test]
    fn release_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let mut lock = DataLock::acquire(&paths).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release");
        assert!(!lock.is_held());

        let again = DataLock::try_acquire(&paths).expect("try_acquire");
        assert!(again.is_some());
    }

    #[test]
    fn try_acquire_returns_none_when_locked() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let _held = DataLock::acquire(&paths).expect("acquire");
        assert!(DataLock::try_acquire(&paths).expect("try").is_none());
    }

    #[test]
    fn guard_moves_across_threads() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let lock = DataLock::acquire(&paths).expect("acquire");
        std::thread::spawn(move || drop(lock)).join().unwrap();

        assert!(DataLock::acquire(&paths).is_ok());
    }
}
