//! `lumiere run` handler.

use super::commands::RunArgs;
use lumiere::{
    BatchScheduler, ConfigError, LumiereConfig, LumiereResult, RunSummary, SchedulerConfig, TopicPipeline,
    call_deadline, collaborators, numbered_topics,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Scheduler settings after command-line overrides.
///
/// Without `--parallel` every topic runs one after another in a single batch.
pub fn scheduler_config(base: SchedulerConfig, args: &RunArgs, topic_count: usize) -> SchedulerConfig {
    let mut config = base;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size.max(1);
    }
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers.max(1);
    }
    if !args.parallel {
        config.batch_size = topic_count.max(1);
        config.max_workers = 1;
    }
    config
}

/// Generate every requested topic and summarise the run.
#[instrument(skip_all)]
pub async fn run_topics(config: &LumiereConfig, args: RunArgs) -> LumiereResult<RunSummary> {
    let topics = numbered_topics(args.topics.descriptions()?, args.topics.max_topics);
    if topics.is_empty() {
        return Err(ConfigError::new("No topics to run").into());
    }

    let mut run_config = args.budgets.apply(config.run_config());
    if args.no_feedback {
        run_config = run_config.with_use_feedback(false);
    }
    run_config.validate().map_err(ConfigError::new)?;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.pipeline.output_dir.clone());
    let scheduling = scheduler_config(config.scheduler, &args, topics.len());
    info!(
        topics = topics.len(),
        output_dir = %output_dir.display(),
        use_feedback = *run_config.use_feedback(),
        batch_size = scheduling.batch_size,
        max_workers = scheduling.max_workers,
        "Starting run"
    );

    let pipeline = TopicPipeline::new(collaborators(config, &output_dir)?, run_config)
        .with_call_deadline(call_deadline(config));
    let summary = BatchScheduler::new(Arc::new(pipeline), scheduling)
        .run(topics)
        .await;
    Ok(summary)
}
