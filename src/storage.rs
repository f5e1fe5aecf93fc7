// Key-value backing stores

use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Capability interface over a persistent key-value medium
///
/// Values are serialized JSON documents. Implementations report every
/// failure as `StoreError::StorageUnavailable`.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage, used as a fake in tests and for ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
    unavailable: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing availability
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        self
    }

    /// Make every subsequent operation fail, as a disabled or full store would
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Peek at a raw value, bypassing availability
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.get() {
            return Err(StoreError::StorageUnavailable("memory storage disabled".to_string()));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Directory-backed storage: one `{key}.json` file per key
///
/// Writers serialize on an exclusive lock over a `{key}.lock` sidecar and
/// publish each document by renaming a fully synced temp file over the
/// target, so readers see the old or the new document and never a partial
/// one. A failed write leaves the previous document in place.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open or create a storage directory at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| unavailable("create directory", &base_path, e))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    /// Take the per-key writer lock; released when the returned file drops
    fn lock(&self, key: &str) -> Result<File> {
        let lock_path = self.base_path.join(format!("{}.lock", key));
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| unavailable("open", &lock_path, e))?;
        lock.lock_exclusive().map_err(|e| unavailable("lock", &lock_path, e))?;
        Ok(lock)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable("read", &path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));
        let _lock = self.lock(key)?;

        if let Err(err) = write_synced(&tmp_path, value) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        fs::rename(&tmp_path, &path).map_err(|e| unavailable("replace", &path, e))?;

        debug!(key, bytes = value.len(), "Wrote storage file");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _lock = self.lock(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable("remove", &path, e)),
        }
    }
}

fn write_synced(path: &Path, value: &str) -> Result<()> {
    let mut file = File::create(path).map_err(|e| unavailable("create", path, e))?;
    file.write_all(value.as_bytes())
        .map_err(|e| unavailable("write", path, e))?;
    file.sync_all().map_err(|e| unavailable("sync", path, e))
}

fn unavailable(action: &str, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("failed to {} {}: {}", action, path.display(), err))
}

/// Keys double as file names, so keep them to a safe alphabet
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::StorageUnavailable("storage key cannot be empty".to_string()));
    }
    if key.len() > 64 {
        return Err(StoreError::StorageUnavailable(format!(
            "storage key too long: {} (max 64 chars)",
            key
        )));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(StoreError::StorageUnavailable(format!(
            "invalid storage key: {} (must be alphanumeric with _/-)",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("todos").unwrap(), None);

        storage.set("todos", "[]").unwrap();
        assert_eq!(storage.get("todos").unwrap().as_deref(), Some("[]"));

        storage.remove("todos").unwrap();
        assert_eq!(storage.get("todos").unwrap(), None);
    }

    #[test]
    fn test_memory_storage_unavailable() {
        let storage = MemoryStorage::new().with_entry("todos", "[]");
        storage.set_unavailable(true);

        assert!(matches!(storage.get("todos"), Err(StoreError::StorageUnavailable(_))));
        assert!(matches!(storage.set("todos", "[1]"), Err(StoreError::StorageUnavailable(_))));
        assert_eq!(storage.raw("todos").as_deref(), Some("[]"));

        storage.set_unavailable(false);
        assert!(storage.get("todos").is_ok());
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store");

        let storage = FileStorage::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(storage.base_path(), path.as_path());
    }

    #[test]
    fn test_file_storage_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();

        assert_eq!(storage.get("glassmorphism_todos").unwrap(), None);

        storage.set("glassmorphism_todos", r#"[{"id":"a"}]"#).unwrap();
        assert!(temp.path().join("glassmorphism_todos.json").exists());

        // Shorter value must fully replace the longer one
        storage.set("glassmorphism_todos", "[]").unwrap();
        assert_eq!(storage.get("glassmorphism_todos").unwrap().as_deref(), Some("[]"));

        storage.remove("glassmorphism_todos").unwrap();
        assert_eq!(storage.get("glassmorphism_todos").unwrap(), None);

        // Removing a missing key is a no-op
        storage.remove("glassmorphism_todos").unwrap();
    }

    #[test]
    fn test_file_storage_readers_never_see_partial_documents() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();

        let short = "[]".to_string();
        let long = format!("[{}]", vec![r#""buy milk""#; 20_000].join(","));
        storage.set("glassmorphism_todos", &short).unwrap();

        let writer = {
            let storage = storage.clone();
            let (short, long) = (short.clone(), long.clone());
            std::thread::spawn(move || {
                for i in 0..200 {
                    let value = if i % 2 == 0 { &long } else { &short };
                    storage.set("glassmorphism_todos", value).unwrap();
                }
            })
        };

        for _ in 0..2000 {
            let read = storage.get("glassmorphism_todos").unwrap().unwrap();
            assert!(read == short || read == long, "read a partial document of {} bytes", read.len());
        }
        writer.join().unwrap();

        assert!(!temp.path().join("glassmorphism_todos.json.tmp").exists());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("glassmorphism_todos").is_ok());
        assert!(validate_key("todo-app").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
