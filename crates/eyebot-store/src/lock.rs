//! Cross-process advisory file lock (fs2 flock).
//!
//! Serializes load-mutate-save cycles on a store file so that two bot
//! processes sharing a state directory do not lose each other's updates.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, StorageError};

/// Advisory lock on a sibling `<file>.lock` next to a store file.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

/// RAII guard that releases the lock on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileLock {
    /// Creates a lock for the given store file.
    pub fn for_file(target: &Path) -> Self {
        let mut name = target.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        Self {
            path: target.with_file_name(name),
        }
    }

    /// Path of the lock file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocking acquire. Waits until no other holder remains.
    pub fn acquire(&self) -> Result<FileLockGuard> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let lock_err = |source: std::io::Error| StorageError::Lock {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;
        Ok(FileLockGuard { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_is_sibling() {
        let lock = FileLock::for_file(Path::new("/tmp/state/pairings.json"));
        assert_eq!(lock.path(), Path::new("/tmp/state/pairings.json.lock"));
    }

    #[test]
    fn acquire_and_release() {
        let tmp = tempfile::tempdir().unwrap();
        let lock = FileLock::for_file(&tmp.path().join("data.json"));

        let guard = lock.acquire().unwrap();
        drop(guard);

        let _again = lock.acquire().unwrap();
    }

    #[test]
    fn acquire_creates_missing_state_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("fresh").join("state").join("activity.json");
        let lock = FileLock::for_file(&target);

        let guard = lock.acquire().unwrap();
        assert!(lock.path().exists());
        drop(guard);
    }

    #[test]
    fn second_holder_waits_for_release() {
        let tmp = tempfile::tempdir().unwrap();
        let lock = FileLock::for_file(&tmp.path().join("data.json"));
        let held = lock.acquire().unwrap();

        let other = lock.clone();
        let waiter = std::thread::spawn(move || {
            let _guard = other.acquire().unwrap();
            std::time::Instant::now()
        });

        std::thread::sleep(std::time::Duration::from_millis(100));
        let released_at = std::time::Instant::now();
        drop(held);

        assert!(waiter.join().unwrap() >= released_at);
    }
}
