//! Outline, storyboard and per-section code stages.
//!
//! Each stage first looks for its artifact in the store and only calls the
//! generator when it is missing.

use crate::build_fix::generate_code;
use crate::context::SectionServices;
use crate::generation::{generate_structured, parse_json_document, retry_policy};
use crate::prompts::{code_prompt, outline_prompt, storyboard_prompt};
use futures::StreamExt;
use lumiere_core::{CodeArtifact, GenerateRequest, Outline, RunConfig, Section, Storyboard, Topic};
use lumiere_error::{GenerationError, GenerationErrorKind, PipelineError, PipelineErrorKind};
use lumiere_rate_limit::RetryFailure;
use lumiere_storage::{ArtifactKey, ArtifactStore, read_json, read_text, write_json};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

/// Output size for planning documents.
const PLAN_MAX_TOKENS: u32 = 8192;

/// Persisted document under `key`, or `None` when absent or unreadable.
async fn cached_document<T: DeserializeOwned>(store: &dyn ArtifactStore, key: &ArtifactKey) -> Option<T> {
    match read_json(store, key).await {
        Ok(found) => found,
        Err(e) => {
            warn!(key = %key, error = %e, "Ignoring unreadable artifact");
            None
        }
    }
}

async fn persist_document<T: Serialize + Sync>(store: &dyn ArtifactStore, key: &ArtifactKey, value: &T) {
    if let Err(e) = write_json(store, key, value).await {
        warn!(key = %key, error = %e, "Could not persist artifact");
    }
}

fn exhausted(failure: RetryFailure<GenerationError>) -> GenerationError {
    GenerationError::new(GenerationErrorKind::Exhausted {
        attempts: failure.attempts,
        last_error: failure.error.kind.to_string(),
    })
}

/// Produce the topic's outline.
///
/// # Errors
///
/// Returns `OutlineExhausted` when every generation attempt fails.
#[instrument(skip_all, fields(topic = %topic))]
pub(crate) async fn outline_stage(
    services: &SectionServices,
    config: &RunConfig,
    topic: &Topic,
) -> Result<Outline, PipelineError> {
    let key = ArtifactKey::outline(topic);
    if let Some(outline) = cached_document::<Outline>(services.store(), &key).await {
        info!(sections = outline.sections.len(), "Reusing persisted outline");
        return Ok(outline);
    }

    let request = GenerateRequest::new(outline_prompt(topic), PLAN_MAX_TOKENS);
    let outline: Outline = generate_structured(
        services.generator(),
        services.usage(),
        retry_policy(config),
        services.call_deadline(),
        "outline",
        &request,
        parse_outline,
    )
    .await
    .map_err(|failure| {
        tracing::error!(attempts = failure.attempts, error = %failure.error, "Outline generation exhausted");
        PipelineError::new(PipelineErrorKind::OutlineExhausted(exhausted(failure).kind.to_string()))
    })?;

    info!(sections = outline.sections.len(), "Outline generated");
    persist_document(services.store(), &key, &outline).await;
    Ok(outline)
}

fn parse_outline(text: &str) -> Result<Outline, GenerationError> {
    let outline: Outline = parse_json_document(text)?;
    if outline.sections.is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::Malformed(
            "outline has no sections".to_string(),
        )));
    }
    Ok(outline)
}

/// Produce the topic's storyboard from its outline.
///
/// # Errors
///
/// Returns `StoryboardExhausted` when every attempt fails, and
/// `InvalidStoryboard` when a persisted storyboard is unusable.
#[instrument(skip_all, fields(topic = %topic))]
pub(crate) async fn storyboard_stage(
    services: &SectionServices,
    config: &RunConfig,
    topic: &Topic,
    outline: &Outline,
) -> Result<Storyboard, PipelineError> {
    let key = ArtifactKey::storyboard(topic);
    if let Some(storyboard) = cached_document::<Storyboard>(services.store(), &key).await {
        storyboard
            .validate()
            .map_err(|reason| PipelineError::new(PipelineErrorKind::InvalidStoryboard(reason)))?;
        info!(sections = storyboard.sections.len(), "Reusing persisted storyboard");
        return Ok(storyboard);
    }

    let request = GenerateRequest::new(storyboard_prompt(outline), PLAN_MAX_TOKENS);
    let storyboard: Storyboard = generate_structured(
        services.generator(),
        services.usage(),
        retry_policy(config),
        services.call_deadline(),
        "storyboard",
        &request,
        parse_storyboard,
    )
    .await
    .map_err(|failure| {
        tracing::error!(attempts = failure.attempts, error = %failure.error, "Storyboard generation exhausted");
        PipelineError::new(PipelineErrorKind::StoryboardExhausted(exhausted(failure).kind.to_string()))
    })?;

    info!(sections = storyboard.sections.len(), "Storyboard generated");
    persist_document(services.store(), &key, &storyboard).await;
    Ok(storyboard)
}

fn parse_storyboard(text: &str) -> Result<Storyboard, GenerationError> {
    let storyboard: Storyboard = parse_json_document(text)?;
    storyboard
        .validate()
        .map_err(|reason| GenerationError::new(GenerationErrorKind::Malformed(reason)))?;
    Ok(storyboard)
}

/// Current code for every section, in storyboard order.
///
/// Missing code is requested concurrently, at most `code_concurrency` at a
/// time. A section whose request fails gets `None` and starts its build
/// with a fresh generation.
#[instrument(skip_all, fields(topic = %topic, sections = storyboard.sections.len()))]
pub(crate) async fn code_stage(
    services: &SectionServices,
    config: &RunConfig,
    topic: &Topic,
    storyboard: &Storyboard,
) -> Vec<(Section, Option<CodeArtifact>)> {
    let limit = (*config.code_concurrency()).max(1);
    let max_tokens = *config.max_code_tokens();

    futures::stream::iter(storyboard.sections.iter().cloned())
        .map(|section| async move {
            let code = section_code(services, config, topic, &section, max_tokens).await;
            (section, code)
        })
        .buffered(limit)
        .collect()
        .await
}

async fn section_code(
    services: &SectionServices,
    config: &RunConfig,
    topic: &Topic,
    section: &Section,
    max_tokens: u32,
) -> Option<CodeArtifact> {
    let key = ArtifactKey::code(topic, &section.id);
    let unusable = match read_text(services.store(), &key).await {
        Ok(Some(source)) if !source.trim().is_empty() => {
            debug!(section = %section.id, "Reusing persisted code");
            return Some(CodeArtifact::new(source));
        }
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            warn!(section = %section.id, error = %e, "Ignoring unreadable code");
            true
        }
    };

    let request = GenerateRequest::new(code_prompt(section, ""), max_tokens);
    let code = generate_code(services, config, &request).await?;
    let bytes = code.source().as_bytes();

    if unusable {
        if let Err(e) = services.store().write(&key, bytes).await {
            warn!(section = %section.id, error = %e, "Could not persist code");
        }
        info!(section = %section.id, "Code regenerated over unusable artifact");
        return Some(code);
    }

    match services.store().create_if_absent(&key, bytes).await {
        Ok(true) => info!(section = %section.id, "Code generated"),
        Ok(false) => {
            // Another run persisted code for this section first.
            if let Ok(Some(source)) = read_text(services.store(), &key).await
                && !source.trim().is_empty()
            {
                info!(section = %section.id, "Adopting code persisted concurrently");
                return Some(CodeArtifact::new(source));
            }
        }
        Err(e) => warn!(section = %section.id, error = %e, "Could not persist code"),
    }
    Some(code)
}
