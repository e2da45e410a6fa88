//! Section artifact persistence: code, video and the render stamp tying them together.

use lumiere_core::{CodeArtifact, Topic, VideoArtifact};
use lumiere_error::StorageError;
use lumiere_storage::{ArtifactKey, ArtifactStore, read_optional, read_text};
use tracing::{debug, warn};

/// Persisted video for `code`, if its stamp matches the code fingerprint.
///
/// Storage failures are logged and treated as "not rendered".
pub(crate) async fn load_valid_video(
    store: &dyn ArtifactStore,
    topic: &Topic,
    section_id: &str,
    code: &CodeArtifact,
) -> Option<VideoArtifact> {
    let stamp = match read_text(store, &ArtifactKey::stamp(topic, section_id)).await {
        Ok(Some(stamp)) => stamp,
        Ok(None) => return None,
        Err(e) => {
            warn!(section = section_id, error = %e, "Unreadable render stamp, ignoring video");
            return None;
        }
    };

    if stamp.trim() != code.fingerprint() {
        debug!(section = section_id, "Render stamp is stale");
        return None;
    }

    match read_optional(store, &ArtifactKey::video(topic, section_id)).await {
        Ok(Some(bytes)) => Some(VideoArtifact::from_parts(bytes, stamp.trim())),
        Ok(None) => None,
        Err(e) => {
            warn!(section = section_id, error = %e, "Unreadable video, will re-render");
            None
        }
    }
}

/// Write code, video and stamp for a section.
///
/// The stamp goes last, so an interrupted commit reads back as a stale video.
pub(crate) async fn commit_section(
    store: &dyn ArtifactStore,
    topic: &Topic,
    section_id: &str,
    code: &CodeArtifact,
    video: &VideoArtifact,
) -> Result<(), StorageError> {
    store
        .write(&ArtifactKey::code(topic, section_id), code.source().as_bytes())
        .await?;
    store
        .write(&ArtifactKey::video(topic, section_id), video.bytes())
        .await?;
    store
        .write(
            &ArtifactKey::stamp(topic, section_id),
            video.code_fingerprint().as_bytes(),
        )
        .await?;
    debug!(section = section_id, "Committed section artifacts");
    Ok(())
}
