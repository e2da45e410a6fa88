//! Deterministic artifact identities.

use lumiere_core::{Topic, path_component};
use std::path::PathBuf;

/// Which pipeline output an artifact key refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Outline document
    Outline,
    /// Storyboard document
    Storyboard,
    /// Source file of one section
    SectionCode(String),
    /// Rendered video of one section
    SectionVideo(String),
    /// Fingerprint of the code a section video was rendered from
    RenderStamp(String),
    /// Final merged video, stored under the given file name
    Merged(String),
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Outline => write!(f, "outline"),
            ArtifactKind::Storyboard => write!(f, "storyboard"),
            ArtifactKind::SectionCode(id) => write!(f, "code[{}]", id),
            ArtifactKind::SectionVideo(id) => write!(f, "video[{}]", id),
            ArtifactKind::RenderStamp(id) => write!(f, "stamp[{}]", id),
            ArtifactKind::Merged(_) => write!(f, "merged"),
        }
    }
}

/// Identity of one persisted artifact: owning topic plus stage (plus section).
///
/// Each key is written by exactly one stage or section worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{}/{}", topic_dir, kind)]
pub struct ArtifactKey {
    topic_dir: String,
    kind: ArtifactKind,
}

impl ArtifactKey {
    /// Key for an arbitrary artifact kind of a topic.
    pub fn new(topic: &Topic, kind: ArtifactKind) -> Self {
        Self {
            topic_dir: topic.dir_name(),
            kind,
        }
    }

    /// Outline of a topic.
    pub fn outline(topic: &Topic) -> Self {
        Self::new(topic, ArtifactKind::Outline)
    }

    /// Storyboard of a topic.
    pub fn storyboard(topic: &Topic) -> Self {
        Self::new(topic, ArtifactKind::Storyboard)
    }

    /// Source of one section.
    pub fn code(topic: &Topic, section_id: &str) -> Self {
        Self::new(topic, ArtifactKind::SectionCode(section_id.to_string()))
    }

    /// Video of one section.
    pub fn video(topic: &Topic, section_id: &str) -> Self {
        Self::new(topic, ArtifactKind::SectionVideo(section_id.to_string()))
    }

    /// Render stamp of one section.
    pub fn stamp(topic: &Topic, section_id: &str) -> Self {
        Self::new(topic, ArtifactKind::RenderStamp(section_id.to_string()))
    }

    /// Merged video of a topic.
    pub fn merged(topic: &Topic) -> Self {
        Self::new(topic, ArtifactKind::Merged(topic.merged_file_name()))
    }

    /// Directory name of the owning topic.
    pub fn topic_dir(&self) -> &str {
        &self.topic_dir
    }

    /// Artifact kind.
    pub fn kind(&self) -> &ArtifactKind {
        &self.kind
    }

    /// Path of the artifact relative to the store root.
    ///
    /// ```text
    /// {topic_dir}/outline.json
    /// {topic_dir}/storyboard.json
    /// {topic_dir}/{section}.py
    /// {topic_dir}/videos/{section}.mp4
    /// {topic_dir}/videos/{section}.stamp
    /// {topic_dir}/{safe_name}.mp4
    /// ```
    pub fn relative_path(&self) -> PathBuf {
        let dir = PathBuf::from(path_component(&self.topic_dir));
        match &self.kind {
            ArtifactKind::Outline => dir.join("outline.json"),
            ArtifactKind::Storyboard => dir.join("storyboard.json"),
            ArtifactKind::SectionCode(id) => dir.join(format!("{}.py", path_component(id))),
            ArtifactKind::SectionVideo(id) => dir.join("videos").join(format!("{}.mp4", path_component(id))),
            ArtifactKind::RenderStamp(id) => {
                dir.join("videos").join(format!("{}.stamp", path_component(id)))
            }
            ArtifactKind::Merged(name) => dir.join(path_component(name)),
        }
    }
}
