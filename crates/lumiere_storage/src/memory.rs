//! In-memory artifact storage.

use crate::{ArtifactKey, ArtifactStore};
use lumiere_error::{StorageError, StorageErrorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Volatile store used to drive the pipeline without touching disk.
///
/// Clones share contents. Write counts are tracked so callers can assert
/// that a resumed run wrote nothing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    entries: Arc<Mutex<HashMap<ArtifactKey, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of every stored key.
    pub fn keys(&self) -> Vec<ArtifactKey> {
        let mut keys: Vec<_> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        Ok(self.entries.lock().contains_key(key))
    }

    async fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError> {
        self.entries
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(key.to_string())))
    }

    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(key.clone(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_if_absent(&self, key: &ArtifactKey, data: &[u8]) -> Result<bool, StorageError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.clone(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
