//! Artifact store trait and typed helpers.

use crate::ArtifactKey;
use lumiere_error::{StorageError, StorageErrorKind};
use serde::{Serialize, de::DeserializeOwned};

/// Durable, idempotent cache of pipeline outputs.
///
/// Presence of a key is the resumability signal: a stage whose output key
/// exists is skipped on the next run.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check whether an artifact exists.
    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError>;

    /// Read an artifact.
    ///
    /// # Errors
    ///
    /// Returns `StorageErrorKind::NotFound` if the artifact is absent.
    async fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError>;

    /// Write an artifact, replacing any previous contents atomically.
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), StorageError>;

    /// Write an artifact only if it does not exist yet.
    ///
    /// Returns `true` if this call created the artifact.
    async fn create_if_absent(&self, key: &ArtifactKey, data: &[u8]) -> Result<bool, StorageError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Read an artifact if present.
pub async fn read_optional(
    store: &dyn ArtifactStore,
    key: &ArtifactKey,
) -> Result<Option<Vec<u8>>, StorageError> {
    match store.read(key).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and deserialize a JSON artifact if present.
///
/// # Errors
///
/// Returns `StorageErrorKind::Corrupt` if the stored bytes are not valid JSON
/// for `T`.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn ArtifactStore,
    key: &ArtifactKey,
) -> Result<Option<T>, StorageError> {
    let Some(data) = read_optional(store, key).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", key, e))))
}

/// Serialize and write a JSON artifact.
pub async fn write_json<T: Serialize + Sync>(
    store: &dyn ArtifactStore,
    key: &ArtifactKey,
    value: &T,
) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(format!("{}: {}", key, e))))?;
    store.write(key, &data).await
}

/// Read a UTF-8 text artifact if present.
pub async fn read_text(
    store: &dyn ArtifactStore,
    key: &ArtifactKey,
) -> Result<Option<String>, StorageError> {
    let Some(data) = read_optional(store, key).await? else {
        return Ok(None);
    };
    String::from_utf8(data)
        .map(Some)
        .map_err(|e| StorageError::new(StorageErrorKind::Corrupt(format!("{}: {}", key, e))))
}
