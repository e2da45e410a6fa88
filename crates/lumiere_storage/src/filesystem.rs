//! Filesystem-based artifact storage.
//!
//! One directory per topic under the store root, holding the planning
//! documents, one source file and one rendered video per section, and the
//! merged lecture.

use crate::{ArtifactKey, ArtifactStore};
use lumiere_error::{StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem storage backend.
///
/// # Example Structure
///
/// ```text
/// output/
/// └── 0-binary_search/
///     ├── outline.json
///     ├── storyboard.json
///     ├── section_1.py
///     ├── section_2.py
///     ├── videos/
///     │   ├── section_1.mp4
///     │   └── section_1.stamp
///     └── binary_search.mp4
/// ```
///
/// Writes go to a uniquely named temp file which is then renamed over the
/// target, so readers never observe a partial artifact.
#[derive(Debug, Clone)]
pub struct FileSystemArtifactStore {
    base_path: PathBuf,
}

impl FileSystemArtifactStore {
    /// Create a new filesystem store rooted at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created artifact store");
        Ok(Self { base_path })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute path of an artifact.
    pub fn path_of(&self, key: &ArtifactKey) -> PathBuf {
        self.base_path.join(key.relative_path())
    }

    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
        Ok(())
    }

    async fn write_temp(path: &Path, data: &[u8]) -> Result<PathBuf, StorageError> {
        Self::ensure_parent(path).await?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        Ok(temp_path)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FileSystemArtifactStore {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
        let path = self.path_of(key);
        tokio::fs::try_exists(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", path.display(), e)))
        })
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn read(&self, key: &ArtifactKey) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(key);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(key.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;
        tracing::debug!(path = %path.display(), size = data.len(), "Read artifact");
        Ok(data)
    }

    #[tracing::instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn write(&self, key: &ArtifactKey, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_of(key);
        let temp_path = Self::write_temp(&path, data).await?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %path.display(), "Wrote artifact");
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(key = %key, size = data.len()))]
    async fn create_if_absent(&self, key: &ArtifactKey, data: &[u8]) -> Result<bool, StorageError> {
        let path = self.path_of(key);
        let temp_path = Self::write_temp(&path, data).await?;

        // hard_link fails when the target exists, giving atomic create-if-absent.
        let linked = tokio::fs::hard_link(&temp_path, &path).await;
        let _ = tokio::fs::remove_file(&temp_path).await;

        match linked {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Created artifact");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "Artifact already present");
                Ok(false)
            }
            Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "link {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
