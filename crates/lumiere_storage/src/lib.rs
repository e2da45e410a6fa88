//! Resumable artifact storage for Lumiere.
//!
//! Every pipeline output (outline, storyboard, per-section source, per-section
//! video and render stamp, merged lecture) is addressed by a deterministic
//! [`ArtifactKey`]. Stages consult the store before doing any work, which is
//! what makes a partially failed run safely re-runnable.
//!
//! # Example
//!
//! ```rust
//! use lumiere_core::Topic;
//! use lumiere_storage::{ArtifactKey, ArtifactStore, InMemoryArtifactStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryArtifactStore::new();
//! let topic = Topic::new(0, "binary search");
//! let key = ArtifactKey::code(&topic, "section_1");
//!
//! assert!(store.create_if_absent(&key, b"class A: pass").await?);
//! assert!(!store.create_if_absent(&key, b"other").await?);
//! assert_eq!(store.read(&key).await?, b"class A: pass");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod key;
mod memory;
mod store;

pub use filesystem::FileSystemArtifactStore;
pub use key::{ArtifactKey, ArtifactKind};
pub use lumiere_error::{StorageError, StorageErrorKind};
pub use memory::InMemoryArtifactStore;
pub use store::{ArtifactStore, read_json, read_optional, read_text, write_json};
