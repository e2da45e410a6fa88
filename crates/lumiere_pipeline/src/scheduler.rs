//! Topic-level scheduling: parallel batches, sequential topics within a batch.

use crate::orchestrator::{TopicPipeline, TopicReport};
use lumiere_core::Topic;
use lumiere_rate_limit::SchedulerConfig;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

/// Outcome of one topic within a run.
#[derive(Debug, Clone)]
pub struct TopicResult {
    /// The topic
    pub topic: Topic,
    /// Report on success, failure reason otherwise
    pub outcome: Result<TopicReport, String>,
}

/// Aggregate view over every topic in a run.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::RunSummary;
///
/// let summary = RunSummary::new(Vec::new());
/// assert_eq!(summary.total(), 0);
/// assert_eq!(summary.success_rate(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct RunSummary {
    results: Vec<TopicResult>,
}

impl RunSummary {
    /// Summarise results, ordered by topic index.
    pub fn new(mut results: Vec<TopicResult>) -> Self {
        results.sort_by_key(|r| *r.topic.index());
        Self { results }
    }

    /// Every result, in topic order.
    pub fn results(&self) -> &[TopicResult] {
        &self.results
    }

    /// Topics attempted.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Topics that produced a merged video.
    pub fn succeeded(&self) -> usize {
        self.successes().count()
    }

    /// Fraction of topics that succeeded, 0.0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.total() as f64
    }

    /// Mean wall-clock time of successful topics.
    pub fn average_duration(&self) -> Option<Duration> {
        let n = u32::try_from(self.succeeded()).ok().filter(|n| *n > 0)?;
        let sum: Duration = self.successes().map(|r| *r.duration()).sum();
        Some(sum / n)
    }

    /// Mean total units consumed by successful topics.
    pub fn average_total_units(&self) -> Option<f64> {
        let n = self.succeeded();
        if n == 0 {
            return None;
        }
        let sum: u64 = self.successes().map(|r| r.usage().total).sum();
        Some(sum as f64 / n as f64)
    }

    fn successes(&self) -> impl Iterator<Item = &TopicReport> {
        self.results.iter().filter_map(|r| r.outcome.as_ref().ok())
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Topics: {}", self.total())?;
        writeln!(
            f,
            "Succeeded: {} ({:.1}%)",
            self.succeeded(),
            self.success_rate() * 100.0
        )?;
        match self.average_duration() {
            Some(avg) => writeln!(f, "Average duration: {:.2} min", avg.as_secs_f64() / 60.0)?,
            None => writeln!(f, "Average duration: n/a")?,
        }
        match self.average_total_units() {
            Some(avg) => writeln!(f, "Average usage: {:.0} units", avg)?,
            None => writeln!(f, "Average usage: n/a")?,
        }
        for result in &self.results {
            match &result.outcome {
                Ok(report) => writeln!(
                    f,
                    "  {} ok ({} sections, {} failed)",
                    result.topic,
                    report.merged_sections().len(),
                    report.failed_sections().len()
                )?,
                Err(reason) => writeln!(f, "  {} FAILED: {}", result.topic, reason)?,
            }
        }
        Ok(())
    }
}

/// Runs many topics through one pipeline.
///
/// Topics are cut into batches of `batch_size`; up to `max_workers` batches
/// run at once. Inside a batch topics run one after another with a random
/// pause between them. A failed topic never affects its neighbours.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    pipeline: Arc<TopicPipeline>,
    config: SchedulerConfig,
}

impl BatchScheduler {
    /// Create a scheduler.
    pub fn new(pipeline: Arc<TopicPipeline>, config: SchedulerConfig) -> Self {
        Self { pipeline, config }
    }

    /// Process every topic and summarise.
    #[instrument(skip_all, fields(topics = topics.len(), batch_size = self.config.batch_size, max_workers = self.config.max_workers))]
    pub async fn run(&self, topics: Vec<Topic>) -> RunSummary {
        let batch_size = self.config.batch_size.max(1);
        let permits = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut batches = JoinSet::new();

        for (batch_index, batch) in topics.chunks(batch_size).enumerate() {
            let batch = batch.to_vec();
            let pipeline = Arc::clone(&self.pipeline);
            let permits = Arc::clone(&permits);
            let config = self.config;
            batches.spawn(async move {
                let _permit = permits.acquire_owned().await;
                info!(batch = batch_index, topics = batch.len(), "Batch started");
                run_batch(&pipeline, &config, batch).await
            });
        }

        let mut results = Vec::with_capacity(topics.len());
        while let Some(joined) = batches.join_next().await {
            match joined {
                Ok(batch_results) => results.extend(batch_results),
                Err(e) => error!(error = %e, "Batch task did not return"),
            }
        }

        let summary = RunSummary::new(results);
        info!(
            total = summary.total(),
            succeeded = summary.succeeded(),
            "Run complete"
        );
        summary
    }
}

async fn run_batch(pipeline: &TopicPipeline, config: &SchedulerConfig, batch: Vec<Topic>) -> Vec<TopicResult> {
    let mut results = Vec::with_capacity(batch.len());
    for (i, topic) in batch.into_iter().enumerate() {
        if i > 0 {
            let delay = inter_topic_delay(config);
            info!(delay_ms = delay.as_millis() as u64, "Pausing before next topic");
            tokio::time::sleep(delay).await;
        }
        let outcome = match pipeline.run_topic(&topic).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(topic = %topic, error = %e, "Topic failed");
                Err(e.to_string())
            }
        };
        results.push(TopicResult { topic, outcome });
    }
    results
}

/// Random pause within the configured bounds.
pub fn inter_topic_delay(config: &SchedulerConfig) -> Duration {
    let low = config.inter_topic_delay_min_ms;
    let high = config.inter_topic_delay_max_ms.max(low);
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}
