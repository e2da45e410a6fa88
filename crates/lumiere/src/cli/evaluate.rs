//! `lumiere evaluate` handler.

use super::commands::EvaluateArgs;
use lumiere::{
    ConfigError, LumiereConfig, LumiereResult, StorageError, StorageErrorKind, evaluation_report, evaluator,
    numbered_topics,
};
use tracing::{info, instrument};

/// Score the merged video of every requested topic and produce the markdown report.
#[instrument(skip_all)]
pub async fn evaluate_videos(config: &LumiereConfig, args: EvaluateArgs) -> LumiereResult<String> {
    let topics = numbered_topics(args.topics.descriptions()?, args.topics.max_topics);
    if topics.is_empty() {
        return Err(ConfigError::new("No topics to evaluate").into());
    }

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.pipeline.output_dir.clone());
    let max_workers = args.max_workers.unwrap_or(config.evaluation.max_workers);
    info!(topics = topics.len(), max_workers, output_dir = %output_dir.display(), "Evaluating videos");

    let results = evaluator(config, &output_dir)?
        .evaluate_all(&topics, max_workers)
        .await;
    let report = evaluation_report(&results);

    if let Some(path) = &args.report {
        tokio::fs::write(path, &report).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!("{}: {}", path.display(), e)))
        })?;
        info!(path = %path.display(), "Evaluation report written");
    }
    Ok(report)
}
