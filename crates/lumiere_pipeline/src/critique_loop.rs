//! Critique, revise, re-render; restore the last good pair when a round fails.

use crate::artifacts::commit_section;
use crate::build_fix::{BuildBudget, BuildOutcome, build_fix, generate_code};
use crate::context::{CritiqueSummary, SectionServices, SectionTask};
use crate::critique::parse_critique;
use crate::generation::retry_policy;
use crate::prompts::{critique_prompt, revision_prompt};
use crate::source::{extract_placements, placement_table, targeted_patch};
use lumiere_core::{CodeArtifact, Critique, CritiqueRequest, GenerateRequest, SectionState, VideoArtifact};
use lumiere_error::{CritiqueError, CritiqueErrorKind};
use tracing::{debug, info, instrument, warn};

/// The last code and video known to belong together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) code: CodeArtifact,
    pub(crate) video: VideoArtifact,
}

/// Run up to `feedback_rounds` critique rounds on a rendered section.
///
/// Returns the pair the section ends with. A round that cannot produce a
/// rendering revision leaves the section exactly as the round found it and
/// ends the loop.
#[instrument(skip_all, fields(topic = %task.topic(), section = task.section_id()))]
pub(crate) async fn critique_rollback(
    services: &SectionServices,
    task: &SectionTask,
    start: Snapshot,
) -> (Snapshot, CritiqueSummary) {
    let config = task.config();
    let rounds = *config.feedback_rounds();
    let mut summary = CritiqueSummary::default();
    let mut current = start;

    for round in 1..=rounds {
        summary.rounds = round;
        debug!(state = %SectionState::CritiquePending, round, rounds, "Requesting critique");

        let critique = request_critique(services, task, &current).await;
        if !critique.needs_revision() {
            info!(round, "Critique reports no issues");
            break;
        }
        info!(round, issues = critique.improvements.len(), "Critique reports issues");

        let snapshot = current.clone();
        match revise(services, task, &snapshot, &critique).await {
            Some(revised) => {
                if let Err(e) = commit_section(
                    services.store(),
                    task.topic(),
                    task.section_id(),
                    &revised.code,
                    &revised.video,
                )
                .await
                {
                    warn!(round, error = %e, "Could not persist revision, rolling back");
                    restore(services, task, Some(&snapshot)).await;
                    current = snapshot;
                    summary.rolled_back = true;
                    break;
                }
                summary.revisions += 1;
                info!(round, "Revision committed");
                current = revised;
            }
            None => {
                warn!(round, state = %SectionState::RolledBack, "Revision failed, rolling back");
                restore(services, task, Some(&snapshot)).await;
                current = snapshot;
                summary.rolled_back = true;
                break;
            }
        }
    }

    (current, summary)
}

/// Critique of the current pair.
///
/// Transport failures and timeouts are retried within
/// `max_generation_attempts`. Only when that budget is spent, or the service
/// fails permanently, does the round read as "no issues".
async fn request_critique(services: &SectionServices, task: &SectionTask, current: &Snapshot) -> Critique {
    let table = placement_table(&extract_placements(current.code.source()));
    let request = CritiqueRequest {
        prompt: critique_prompt(task.section(), &table),
        video: current.video.bytes().to_vec(),
        reference_image: services.reference_image().map(<[u8]>::to_vec),
    };

    let deadline = services.call_deadline();
    let request = &request;
    let reply = retry_policy(task.config())
        .run("critique", |attempt| async move {
            debug!(attempt, "Requesting critique");
            let response = tokio::time::timeout(deadline, services.critic().critique(request))
                .await
                .map_err(|_| CritiqueError::new(CritiqueErrorKind::Timeout(deadline.as_secs())))??;
            services.usage().record(response.usage);
            Ok::<_, CritiqueError>(response.text)
        })
        .await;

    match reply {
        Ok(text) => parse_critique(&text),
        Err(failure) => {
            warn!(
                attempts = failure.attempts,
                error = %failure.error.kind,
                "Critique unavailable, keeping current version"
            );
            Critique::clean()
        }
    }
}

/// Up to `max_feedback_gen_code_tries` attempts, each starting from the snapshot.
///
/// The first attempt uses the targeted placement patch when it applies;
/// later attempts, and any attempt where it does not, regenerate with the
/// critique as instructions.
async fn revise(
    services: &SectionServices,
    task: &SectionTask,
    snapshot: &Snapshot,
    critique: &Critique,
) -> Option<Snapshot> {
    let config = task.config();
    let attempts = *config.max_feedback_gen_code_tries();
    let budget = BuildBudget::revision(config);

    for attempt in 1..=attempts {
        debug!(state = %SectionState::Revising, attempt, attempts, "Revising");

        let patched = (attempt == 1)
            .then(|| targeted_patch(snapshot.code.source(), critique))
            .flatten()
            .filter(|patched| patched != snapshot.code.source());

        let candidate = match patched {
            Some(source) => {
                debug!(attempt, "Using targeted placement patch");
                Some(CodeArtifact::new(source))
            }
            None => {
                let request = GenerateRequest::new(
                    revision_prompt(snapshot.code.source(), critique),
                    *config.max_code_tokens(),
                );
                generate_code(services, config, &request).await
            }
        };

        let Some(candidate) = candidate else {
            continue;
        };

        match build_fix(services, task, Some(candidate), budget).await {
            BuildOutcome::Rendered { code, video, .. } => return Some(Snapshot { code, video }),
            BuildOutcome::Exhausted { .. } => {
                warn!(attempt, "Revised code did not render");
            }
        }
    }

    None
}

/// Rewrite the snapshot to the store so code, video and stamp match it again.
///
/// Without a snapshot there is nothing to restore and the call is a no-op.
pub(crate) async fn restore(
    services: &SectionServices,
    task: &SectionTask,
    snapshot: Option<&Snapshot>,
) -> bool {
    let Some(snapshot) = snapshot else {
        debug!(section = task.section_id(), "No snapshot to restore");
        return false;
    };
    if let Err(e) = commit_section(
        services.store(),
        task.topic(),
        task.section_id(),
        &snapshot.code,
        &snapshot.video,
    )
    .await
    {
        warn!(error = %e, "Could not rewrite snapshot to store");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Collaborators;
    use async_trait::async_trait;
    use lumiere_core::{
        CritiqueResponse, GenerateResponse, RenderJob, RunConfig, Section, Topic, UsageAccumulator,
    };
    use lumiere_error::{CritiqueError, GenerationError, MergeError, RenderError};
    use lumiere_interface::{Concatenator, CritiqueService, Renderer, TextGenerator};
    use lumiere_storage::InMemoryArtifactStore;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl TextGenerator for Unreachable {
        async fn generate(&self, _req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
            panic!("generator must not be called")
        }
        fn model_name(&self) -> &str {
            "unreachable"
        }
    }

    #[async_trait]
    impl CritiqueService for Unreachable {
        async fn critique(&self, _req: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError> {
            panic!("critic must not be called")
        }
        fn model_name(&self) -> &str {
            "unreachable"
        }
    }

    #[async_trait]
    impl Renderer for Unreachable {
        async fn render(&self, _job: &RenderJob) -> Result<Vec<u8>, RenderError> {
            panic!("renderer must not be called")
        }
    }

    #[async_trait]
    impl Concatenator for Unreachable {
        async fn concat(&self, _segments: &[Vec<u8>]) -> Result<Vec<u8>, MergeError> {
            panic!("concatenator must not be called")
        }
    }

    fn fixture() -> (SectionServices, SectionTask, InMemoryArtifactStore) {
        let store = InMemoryArtifactStore::new();
        let collaborators = Collaborators {
            generator: Arc::new(Unreachable),
            critic: Arc::new(Unreachable),
            renderer: Arc::new(Unreachable),
            concatenator: Arc::new(Unreachable),
            store: Arc::new(store.clone()),
        };
        let services = SectionServices::new(collaborators, UsageAccumulator::new());
        let section = Section {
            id: "section_1".into(),
            title: "Intro".into(),
            lecture_lines: vec![],
            animations: vec![],
        };
        let config = RunConfig::default().with_feedback_rounds(0);
        let task = SectionTask::new(Topic::new(0, "binary search"), section, None, config);
        (services, task, store)
    }

    #[tokio::test]
    async fn test_restore_without_snapshot_is_noop() {
        let (services, task, store) = fixture();
        assert!(!restore(&services, &task, None).await);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_rewrites_snapshot() {
        let (services, task, store) = fixture();
        let code = CodeArtifact::new("class S(TeachingScene): pass");
        let snapshot = Snapshot {
            video: VideoArtifact::rendered_from(&code, vec![7, 7]),
            code,
        };
        assert!(restore(&services, &task, Some(&snapshot)).await);
        assert_eq!(store.write_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_rounds_keeps_start() {
        let (services, task, _store) = fixture();
        let code = CodeArtifact::new("v1");
        let start = Snapshot {
            video: VideoArtifact::rendered_from(&code, vec![1]),
            code,
        };
        let (end, summary) = critique_rollback(&services, &task, start.clone()).await;
        assert_eq!(end, start);
        assert_eq!(summary, CritiqueSummary::default());
    }
}
