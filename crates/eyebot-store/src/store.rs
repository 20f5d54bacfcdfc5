//! The `Store<T>` seam every persisted structure goes through.
//!
//! Each operation loads the whole structure fresh, mutates it and writes the
//! whole structure back. Nothing is cached in process between calls.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::Result;
use crate::lock::FileLock;

/// Whole-structure persistence for a value of type `T`.
///
/// A store that has never been written loads as `T::default()`.
pub trait Store<T> {
    /// Loads the current value.
    fn load(&self) -> Result<T>;

    /// Replaces the persisted value.
    fn save(&self, value: &T) -> Result<()>;

    /// Runs one load-mutate-save cycle and returns what `f` returned.
    ///
    /// If saving fails the persisted value is left as it was before the call.
    fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut value = self.load()?;
        let out = f(&mut value);
        self.save(&value)?;
        Ok(out)
    }
}

/// A JSON file on local disk.
///
/// With locking enabled every `save` and `update` holds an exclusive
/// advisory lock on `<file>.lock` so concurrent processes serialize their
/// cycles. Without it, two writers racing on the same file is
/// last-write-wins.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    lock: Option<FileLock>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    /// Creates an unlocked store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: None,
            _marker: PhantomData,
        }
    }

    /// Enables or disables the cross-process lock.
    pub fn with_locking(mut self, enabled: bool) -> Self {
        self.lock = enabled.then(|| FileLock::for_file(&self.path));
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether cycles are guarded by the file lock.
    pub fn is_locking(&self) -> bool {
        self.lock.is_some()
    }
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn read(&self) -> Result<T> {
        Ok(read_json_optional(&self.path)?.unwrap_or_default())
    }

    fn write(&self, value: &T) -> Result<()> {
        atomic_write_json(&self.path, value)?;
        trace!(path = %self.path.display(), "Store written");
        Ok(())
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T> {
        self.read()
    }

    fn save(&self, value: &T) -> Result<()> {
        let _guard = self.lock.as_ref().map(FileLock::acquire).transpose()?;
        self.write(value)
    }

    fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.lock.as_ref().map(FileLock::acquire).transpose()?;
        let mut value = self.read()?;
        let out = f(&mut value);
        self.write(&value)?;
        Ok(out)
    }
}

/// An in-process store, for tests and callers that do not want disk.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    value: Mutex<T>,
}

impl<T> MemoryStore<T> {
    /// Creates a store holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }
}

impl<T: Clone> Store<T> for MemoryStore<T> {
    fn load(&self) -> Result<T> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, value: &T) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = value.clone();
        Ok(())
    }

    fn update<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        let mut value = guard.clone();
        let out = f(&mut value);
        *guard = value;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    type Counters = BTreeMap<String, u32>;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempdir().unwrap();
        let store: JsonFileStore<Counters> = JsonFileStore::new(dir.path().join("none.json"));

        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_update_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store: JsonFileStore<Counters> = JsonFileStore::new(&path);

        let n = store
            .update(|c| {
                *c.entry("a".to_string()).or_default() += 2;
                c.len()
            })
            .unwrap();
        assert_eq!(n, 1);

        let reopened: JsonFileStore<Counters> = JsonFileStore::new(&path);
        assert_eq!(reopened.load().unwrap().get("a"), Some(&2));
    }

    #[test]
    fn test_corrupt_file_is_not_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");
        fs::write(&path, "[1, 2").unwrap();
        let store: JsonFileStore<Counters> = JsonFileStore::new(&path);

        assert!(matches!(store.load(), Err(StorageError::Corrupt { .. })));
        assert!(matches!(
            store.update(|c| c.clear()),
            Err(StorageError::Corrupt { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2");
    }

    #[test]
    fn test_locked_update_creates_lock_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let store: JsonFileStore<Counters> = JsonFileStore::new(&path).with_locking(true);
        assert!(store.is_locking());

        store.update(|c| c.insert("x".to_string(), 1)).unwrap();
        store.save(&Counters::new()).unwrap();

        assert!(dir.path().join("counters.json.lock").exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_locked_updates_from_threads_do_not_lose_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counters.json");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let store: JsonFileStore<Counters> =
                        JsonFileStore::new(path).with_locking(true);
                    for _ in 0..10 {
                        store
                            .update(|c| *c.entry("hits".to_string()).or_default() += 1)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store: JsonFileStore<Counters> = JsonFileStore::new(&path);
        assert_eq!(store.load().unwrap().get("hits"), Some(&40));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new(Counters::new());
        store.update(|c| c.insert("m".to_string(), 7)).unwrap();
        assert_eq!(store.load().unwrap().get("m"), Some(&7));
    }
}
