//! One section's full lifecycle: resume check, build-fix, critique-rollback.

use crate::artifacts::{commit_section, load_valid_video};
use crate::build_fix::{BuildBudget, BuildOutcome, build_fix};
use crate::context::{CritiqueSummary, SectionOutcome, SectionServices, SectionTask};
use crate::critique_loop::{Snapshot, critique_rollback};
use tracing::{info, instrument, warn};

/// Process one section to a terminal state.
///
/// A section whose persisted video matches its current code is finalized
/// without any calls. Otherwise the build-fix loop runs to completion
/// before the critique loop starts. Failures stay local to the section.
#[instrument(skip_all, fields(topic = %task.topic(), section = task.section_id()))]
pub async fn run_section(services: SectionServices, task: SectionTask) -> SectionOutcome {
    let section_id = task.section_id().to_string();

    if let Some(code) = task.code()
        && let Some(video) = load_valid_video(services.store(), task.topic(), &section_id, code).await
    {
        info!("Section already rendered, skipping");
        return SectionOutcome::reused(section_id, video);
    }

    let (code, video, renders) = match build_fix(
        &services,
        &task,
        task.code().clone(),
        BuildBudget::initial(task.config()),
    )
    .await
    {
        BuildOutcome::Rendered {
            code,
            video,
            renders,
        } => (code, video, renders),
        BuildOutcome::Exhausted { renders } => {
            warn!(renders, "Section failed every build budget, excluding from merge");
            return SectionOutcome::failed(section_id, renders);
        }
    };

    if let Err(e) = commit_section(services.store(), task.topic(), &section_id, &code, &video).await {
        warn!(error = %e, "Could not persist rendered section");
    }

    let config = task.config();
    let (last_good, critique) = if *config.use_feedback() && *config.feedback_rounds() > 0 {
        critique_rollback(&services, &task, Snapshot { code, video }).await
    } else {
        (Snapshot { code, video }, CritiqueSummary::default())
    };

    info!(
        renders,
        revisions = critique.revisions,
        rolled_back = critique.rolled_back,
        "Section finalized"
    );
    SectionOutcome::finalized(section_id, last_good.video, renders, critique)
}
