//! Production collaborators built from configuration.

use lumiere_error::LumiereResult;
use lumiere_models::{OpenAiCritiqueClient, OpenAiTextGenerator, RateLimited};
use lumiere_pipeline::{Collaborators, VideoEvaluator};
use lumiere_rate_limit::{LumiereConfig, RateLimiter};
use lumiere_render::{FfmpegConcatenator, ManimRenderer};
use lumiere_storage::FileSystemArtifactStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Deadline for a single generation or critique call.
pub fn call_deadline(config: &LumiereConfig) -> Duration {
    let secs = config
        .generation
        .timeout_secs
        .max(config.critique.service.timeout_secs);
    Duration::from_secs(secs.max(1))
}

/// Rate-limited model clients, the rendering adapters and a filesystem store rooted at `output_dir`.
///
/// # Errors
///
/// Fails when an API key variable is unset or the output directory cannot be created.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn collaborators(config: &LumiereConfig, output_dir: &Path) -> LumiereResult<Collaborators> {
    let generator = RateLimited::new(
        OpenAiTextGenerator::from_config(&config.generation)?,
        RateLimiter::from_service(&config.generation),
    );
    let critic = RateLimited::new(
        OpenAiCritiqueClient::from_config(&config.critique.service)?,
        RateLimiter::from_service(&config.critique.service),
    );
    let store = FileSystemArtifactStore::new(output_dir)?;

    info!(
        generator = %config.generation.model,
        critic = %config.critique.service.model,
        renderer = %config.render.program,
        "Collaborators ready"
    );
    Ok(Collaborators {
        generator: Arc::new(generator),
        critic: Arc::new(critic),
        renderer: Arc::new(ManimRenderer::from_config(&config.render)),
        concatenator: Arc::new(FfmpegConcatenator::from_config(&config.merge)),
        store: Arc::new(store),
    })
}

/// Evaluator reading merged videos from `output_dir`.
///
/// # Errors
///
/// Fails when the critique API key is unset or the directory cannot be opened.
pub fn evaluator(config: &LumiereConfig, output_dir: &Path) -> LumiereResult<VideoEvaluator> {
    let critic = RateLimited::new(
        OpenAiCritiqueClient::from_config(&config.critique.service)?,
        RateLimiter::from_service(&config.critique.service),
    );
    let store = FileSystemArtifactStore::new(output_dir)?;
    Ok(VideoEvaluator::new(
        Arc::new(critic),
        Arc::new(store),
        call_deadline(config),
    ))
}
