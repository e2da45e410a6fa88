//! Shared collaborators and the immutable per-section task descriptor.

use derive_getters::Getters;
use lumiere_core::{CodeArtifact, RunConfig, Section, SectionState, Topic, UsageAccumulator, VideoArtifact};
use lumiere_interface::{Concatenator, CritiqueService, Renderer, TextGenerator};
use lumiere_storage::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for one generation or critique call.
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(600);

/// The external services a pipeline talks to.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct Collaborators {
    /// Text generation service
    pub generator: Arc<dyn TextGenerator>,
    /// Multimodal critique service
    pub critic: Arc<dyn CritiqueService>,
    /// Rendering engine
    pub renderer: Arc<dyn Renderer>,
    /// Video concatenation utility
    pub concatenator: Arc<dyn Concatenator>,
    /// Artifact store
    pub store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("generator", &self.generator.model_name())
            .field("critic", &self.critic.model_name())
            .field("store", &self.store.backend_name())
            .finish()
    }
}

/// What a section worker may touch: collaborators plus the topic's usage counter.
#[derive(Debug, Clone)]
pub struct SectionServices {
    collaborators: Collaborators,
    usage: UsageAccumulator,
    call_deadline: Duration,
    reference_image: Option<Arc<Vec<u8>>>,
}

impl SectionServices {
    /// Bundle collaborators with the usage counter of one topic run.
    pub fn new(collaborators: Collaborators, usage: UsageAccumulator) -> Self {
        Self {
            collaborators,
            usage,
            call_deadline: DEFAULT_CALL_DEADLINE,
            reference_image: None,
        }
    }

    /// Override the per-call deadline.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// Attach the reference image sent with critique requests.
    pub fn with_reference_image(mut self, image: Option<Arc<Vec<u8>>>) -> Self {
        self.reference_image = image;
        self
    }

    pub(crate) fn generator(&self) -> &dyn TextGenerator {
        self.collaborators.generator.as_ref()
    }

    pub(crate) fn critic(&self) -> &dyn CritiqueService {
        self.collaborators.critic.as_ref()
    }

    pub(crate) fn renderer(&self) -> &dyn Renderer {
        self.collaborators.renderer.as_ref()
    }

    pub(crate) fn store(&self) -> &dyn ArtifactStore {
        self.collaborators.store.as_ref()
    }

    pub(crate) fn usage(&self) -> &UsageAccumulator {
        &self.usage
    }

    pub(crate) fn call_deadline(&self) -> Duration {
        self.call_deadline
    }

    pub(crate) fn reference_image(&self) -> Option<&[u8]> {
        self.reference_image.as_deref().map(Vec::as_slice)
    }
}

/// Everything a section worker needs to know, fixed at dispatch.
#[derive(Debug, Clone, Getters)]
pub struct SectionTask {
    /// Topic the section belongs to
    topic: Topic,
    /// The section itself
    section: Section,
    /// Current source, absent when initial generation failed
    code: Option<CodeArtifact>,
    /// Budgets and switches for this run
    config: RunConfig,
}

impl SectionTask {
    /// Create a task descriptor.
    pub fn new(topic: Topic, section: Section, code: Option<CodeArtifact>, config: RunConfig) -> Self {
        Self {
            topic,
            section,
            code,
            config,
        }
    }

    /// Section identifier.
    pub fn section_id(&self) -> &str {
        &self.section.id
    }
}

/// Critique-rollback activity for one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CritiqueSummary {
    /// Critique rounds requested
    pub rounds: u32,
    /// Revisions committed
    pub revisions: u32,
    /// Whether a round ended in rollback
    pub rolled_back: bool,
}

/// What a section worker reports back.
#[derive(Debug, Clone, Getters)]
pub struct SectionOutcome {
    /// Section identifier
    section_id: String,
    /// Terminal state
    state: SectionState,
    /// Final video, present unless the section failed
    video: Option<VideoArtifact>,
    /// True when a persisted, valid video was reused without any calls
    resumed: bool,
    /// Render attempts made
    renders: u32,
    /// Critique loop summary
    critique: CritiqueSummary,
}

impl SectionOutcome {
    pub(crate) fn finalized(
        section_id: impl Into<String>,
        video: VideoArtifact,
        renders: u32,
        critique: CritiqueSummary,
    ) -> Self {
        Self {
            section_id: section_id.into(),
            state: SectionState::Finalized,
            video: Some(video),
            resumed: false,
            renders,
            critique,
        }
    }

    pub(crate) fn reused(section_id: impl Into<String>, video: VideoArtifact) -> Self {
        Self {
            section_id: section_id.into(),
            state: SectionState::Finalized,
            video: Some(video),
            resumed: true,
            renders: 0,
            critique: CritiqueSummary::default(),
        }
    }

    pub(crate) fn failed(section_id: impl Into<String>, renders: u32) -> Self {
        Self {
            section_id: section_id.into(),
            state: SectionState::Failed,
            video: None,
            resumed: false,
            renders,
            critique: CritiqueSummary::default(),
        }
    }
}
