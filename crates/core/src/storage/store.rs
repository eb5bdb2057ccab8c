use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::errors::CoreError;

/// Raw key/value persistence. One JSON document per key, whole-blob
/// reads and writes (no partial updates).
pub trait StoreBackend: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// File-backed store: `<dir>/<key>.json` per key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StoreBackend for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError> {
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StoreBackend for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// Typed facade over a backend.
///
/// Reads are tolerant: a missing or unreadable blob falls back to the
/// caller's default. Writes are best-effort: a failing backend (quota,
/// permissions, …) is logged and swallowed so the application keeps
/// operating on in-memory state for that key.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// File-backed store rooted at `dir` (created if missing).
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Ok(Self::new(FileStore::open(dir)?))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Load and decode the blob under `key`; `Ok(None)` when absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CoreError> {
        match self.backend.get_raw(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CoreError::Deserialization(format!("stored blob '{key}': {e}"))),
        }
    }

    /// Load with fallback: absent, unreadable or corrupted blobs all
    /// degrade to `T::default()` (corruption is logged).
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable stored blob");
                T::default()
            }
        }
    }

    /// Serialize and persist `value` under `key`, best-effort.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize state for storage");
                return;
            }
        };
        if let Err(e) = self.backend.set_raw(key, &raw) {
            warn!(key, error = %e, "storage write failed; keeping in-memory state only");
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.backend.remove(key)
    }
}
