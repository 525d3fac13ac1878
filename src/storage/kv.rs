//! String key-value store with optional JSON-file persistence.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable string storage, the equivalent of a browser's local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` and persist it before returning.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// A thread-safe map, written through to a JSON file when a path is set.
#[derive(Clone, Default)]
pub struct LocalStore {
    inner: Arc<DashMap<String, String>>,
    persistence_path: Option<PathBuf>,
}

impl LocalStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = Self {
            inner: Arc::new(DashMap::new()),
            persistence_path: Some(path.to_path_buf()),
        };
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                store.inner.insert(k, v);
            }
            tracing::info!(path = %path.display(), entries = store.inner.len(), "Loaded local store");
        }
        Ok(store)
    }

    /// Flush the whole map to disk. No-op for in-memory stores.
    pub fn save(&self) -> Result<(), StorageError> {
        if let Some(path) = &self.persistence_path {
            let map: HashMap<_, _> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &map)?;
            tracing::debug!(path = %path.display(), entries = map.len(), "Saved local store");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let store = LocalStore::in_memory();
        assert!(store.get("transactionCount").is_none());

        store.set("transactionCount", "7").unwrap();
        assert_eq!(store.get("transactionCount").as_deref(), Some("7"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = LocalStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.set("transactionCount", "12").unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get("transactionCount").as_deref(), Some("12"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(LocalStore::open(&path), Err(StorageError::Serde(_))));
    }
}
