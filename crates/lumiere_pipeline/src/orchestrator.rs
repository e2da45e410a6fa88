//! Topic orchestration: stages, section fan-out and the ordered merge.

use crate::context::{Collaborators, DEFAULT_CALL_DEADLINE, SectionOutcome, SectionServices, SectionTask};
use crate::stages::{code_stage, outline_stage, storyboard_stage};
use crate::worker::run_section;
use derive_getters::Getters;
use lumiere_core::{
    CodeArtifact, RunConfig, Section, SectionState, Storyboard, Topic, Usage, UsageAccumulator,
};
use lumiere_error::{LumiereResult, PipelineError, PipelineErrorKind};
use lumiere_storage::{ArtifactKey, read_optional};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Per-section line of a topic report.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SectionReport {
    /// Section identifier
    id: String,
    /// Terminal state
    state: SectionState,
    /// Render attempts made
    renders: u32,
    /// Revisions committed by the critique loop
    revisions: u32,
    /// Whether the critique loop rolled back
    rolled_back: bool,
    /// Whether a persisted video was reused
    resumed: bool,
}

impl From<&SectionOutcome> for SectionReport {
    fn from(outcome: &SectionOutcome) -> Self {
        Self {
            id: outcome.section_id().clone(),
            state: *outcome.state(),
            renders: *outcome.renders(),
            revisions: outcome.critique().revisions,
            rolled_back: outcome.critique().rolled_back,
            resumed: *outcome.resumed(),
        }
    }
}

/// Result of one topic run.
#[derive(Debug, Clone, Getters)]
pub struct TopicReport {
    /// The topic
    topic: Topic,
    /// Key of the merged video
    merged: ArtifactKey,
    /// Size of the merged video in bytes
    merged_bytes: usize,
    /// Section ids in merge order
    merged_sections: Vec<String>,
    /// Every section in storyboard order (empty when the merged video was reused)
    sections: Vec<SectionReport>,
    /// Usage accumulated by this run
    usage: Usage,
    /// Wall-clock time
    duration: Duration,
    /// True when the merged video already existed
    resumed: bool,
}

impl TopicReport {
    /// Sections excluded from the merge.
    pub fn failed_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| !s.state.has_video())
            .map(|s| s.id.as_str())
            .collect()
    }
}

/// Turns one topic into a merged lecture video.
///
/// # Examples
///
/// ```rust,ignore
/// use lumiere_pipeline::{Collaborators, TopicPipeline};
///
/// let pipeline = TopicPipeline::new(collaborators, run_config);
/// let report = pipeline.run_topic(&Topic::new(0, "Binary search")).await?;
/// println!("{} sections merged", report.merged_sections().len());
/// ```
#[derive(Debug, Clone)]
pub struct TopicPipeline {
    collaborators: Collaborators,
    config: RunConfig,
    call_deadline: Duration,
}

impl TopicPipeline {
    /// Create a pipeline over the given collaborators.
    pub fn new(collaborators: Collaborators, config: RunConfig) -> Self {
        Self {
            collaborators,
            config,
            call_deadline: DEFAULT_CALL_DEADLINE,
        }
    }

    /// Override the deadline applied to each generation and critique call.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every stage for `topic`, reusing whatever the store already holds.
    ///
    /// # Errors
    ///
    /// Fails when outline or storyboard generation is exhausted, when no
    /// section produces a video, or when concatenation fails.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn run_topic(&self, topic: &Topic) -> LumiereResult<TopicReport> {
        let started = Instant::now();
        let store = self.collaborators.store.as_ref();
        let merged_key = ArtifactKey::merged(topic);

        if let Some(existing) = read_optional(store, &merged_key).await? {
            info!(bytes = existing.len(), "Merged video already exists");
            return Ok(TopicReport {
                topic: topic.clone(),
                merged: merged_key,
                merged_bytes: existing.len(),
                merged_sections: Vec::new(),
                sections: Vec::new(),
                usage: Usage::default(),
                duration: started.elapsed(),
                resumed: true,
            });
        }

        let usage = UsageAccumulator::new();
        let services = SectionServices::new(self.collaborators.clone(), usage.clone())
            .with_call_deadline(self.call_deadline)
            .with_reference_image(self.load_reference_image().await);

        let outline = outline_stage(&services, &self.config, topic).await?;
        let storyboard = storyboard_stage(&services, &self.config, topic, &outline).await?;
        let codes = code_stage(&services, &self.config, topic, &storyboard).await;

        let outcomes = self.run_sections(&services, topic, codes).await;
        let sections: Vec<SectionReport> = storyboard
            .sections
            .iter()
            .map(|s| match outcomes.get(&s.id) {
                Some(outcome) => SectionReport::from(outcome),
                None => SectionReport {
                    id: s.id.clone(),
                    state: SectionState::Failed,
                    renders: 0,
                    revisions: 0,
                    rolled_back: false,
                    resumed: false,
                },
            })
            .collect();

        let (merged, merged_sections) = self.merge(topic, &storyboard, &outcomes).await?;
        store.write(&merged_key, &merged).await?;

        let report = TopicReport {
            topic: topic.clone(),
            merged: merged_key,
            merged_bytes: merged.len(),
            merged_sections,
            sections,
            usage: usage.snapshot(),
            duration: started.elapsed(),
            resumed: false,
        };
        info!(
            merged = report.merged_sections.len(),
            failed = report.failed_sections().len(),
            total_units = report.usage.total,
            secs = report.duration.as_secs_f64(),
            "Topic complete"
        );
        Ok(report)
    }

    async fn load_reference_image(&self) -> Option<Arc<Vec<u8>>> {
        let path = self.config.reference_image().as_ref()?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(Arc::new(bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Reference image unreadable, critiquing without it");
                None
            }
        }
    }

    /// Fan sections out to isolated workers, at most `section_workers` at once.
    async fn run_sections(
        &self,
        services: &SectionServices,
        topic: &Topic,
        codes: Vec<(Section, Option<CodeArtifact>)>,
    ) -> HashMap<String, SectionOutcome> {
        let permits = Arc::new(Semaphore::new((*self.config.section_workers()).max(1)));
        let mut workers = JoinSet::new();

        for (section, code) in codes {
            let task = SectionTask::new(topic.clone(), section, code, self.config.clone());
            let services = services.clone();
            let permits = Arc::clone(&permits);
            workers.spawn(async move {
                let _permit = permits.acquire_owned().await;
                run_section(services, task).await
            });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    debug!(section = %outcome.section_id(), state = %outcome.state(), "Section worker finished");
                    outcomes.insert(outcome.section_id().clone(), outcome);
                }
                Err(e) => {
                    let err = PipelineError::new(PipelineErrorKind::Worker(e.to_string()));
                    warn!(error = %err, "Section worker did not return");
                }
            }
        }
        outcomes
    }

    /// Concatenate successful sections in storyboard order.
    async fn merge(
        &self,
        topic: &Topic,
        storyboard: &Storyboard,
        outcomes: &HashMap<String, SectionOutcome>,
    ) -> LumiereResult<(Vec<u8>, Vec<String>)> {
        let mut segments = Vec::new();
        let mut ids = Vec::new();

        for section in &storyboard.sections {
            match outcomes.get(&section.id).and_then(|o| o.video().as_ref()) {
                Some(video) => {
                    segments.push(video.bytes().to_vec());
                    ids.push(section.id.clone());
                }
                None => warn!(section = %section.id, "No valid video, skipping in merge"),
            }
        }

        if segments.is_empty() {
            error!("No section produced a video");
            return Err(PipelineError::new(PipelineErrorKind::NoSuccessfulSections(
                topic.description().clone(),
            ))
            .into());
        }

        info!(segments = segments.len(), order = ?ids, "Merging sections");
        let merged = self.collaborators.concatenator.concat(&segments).await?;
        Ok((merged, ids))
    }
}
