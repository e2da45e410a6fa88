//! Batch scheduling and evaluation over several topics.

mod test_utils;

use async_trait::async_trait;
use lumiere_core::{CritiqueRequest, CritiqueResponse, Topic, Usage};
use lumiere_error::CritiqueError;
use lumiere_interface::CritiqueService;
use lumiere_pipeline::{BatchScheduler, VideoEvaluator, evaluation_report};
use lumiere_rate_limit::SchedulerConfig;
use lumiere_storage::{ArtifactKey, ArtifactStore, InMemoryArtifactStore};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{CriticMode, GeneratorScript, Harness, MarkerRenderer, fast_config};

fn topics() -> Vec<Topic> {
    vec![
        Topic::new(0, "Binary search"),
        Topic::new(1, "Doomed topic"),
        Topic::new(2, "Insertion sort"),
    ]
}

fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        batch_size: 2,
        max_workers: 2,
        inter_topic_delay_min_ms: 0,
        inter_topic_delay_max_ms: 0,
    }
}

fn harness(store: InMemoryArtifactStore) -> Harness {
    let script = GeneratorScript {
        sections: 2,
        doomed_topics: vec!["Doomed topic".to_string()],
        ..Default::default()
    };
    Harness::new(
        script,
        CriticMode::Clean,
        MarkerRenderer::new(),
        store,
        fast_config(),
    )
}

#[tokio::test]
async fn test_failed_topic_does_not_affect_others() -> anyhow::Result<()> {
    let store = InMemoryArtifactStore::new();
    let h = harness(store.clone());
    let scheduler = BatchScheduler::new(Arc::new(h.pipeline), scheduler_config());

    let summary = scheduler.run(topics()).await;

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded(), 2);
    let indices: Vec<usize> = summary.results().iter().map(|r| *r.topic.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    let failed = &summary.results()[1];
    assert!(failed.outcome.as_ref().is_err_and(|e| e.contains("Outline generation failed")));
    assert!(summary.results()[0].outcome.is_ok());
    assert!(summary.results()[2].outcome.is_ok());

    assert!(store.exists(&ArtifactKey::merged(&Topic::new(0, "Binary search"))).await?);
    assert!(!store.exists(&ArtifactKey::merged(&Topic::new(1, "Doomed topic"))).await?);
    assert!(summary.to_string().contains("Succeeded: 2 (66.7%)"));
    Ok(())
}

#[tokio::test]
async fn test_empty_run() {
    let h = harness(InMemoryArtifactStore::new());
    let scheduler = BatchScheduler::new(Arc::new(h.pipeline), scheduler_config());

    let summary = scheduler.run(Vec::new()).await;

    assert_eq!(summary.total(), 0);
    assert!(summary.average_total_units().is_none());
}

/// Critic that scores every video the same.
struct FixedScorer;

#[async_trait]
impl CritiqueService for FixedScorer {
    async fn critique(&self, request: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError> {
        assert!(request.reference_image.is_none());
        Ok(CritiqueResponse {
            text: "Element Layout: 16/20\nAttractiveness: 14\nLogic Flow: 18\nAccuracy and Depth: 17\nVisual Consistency: 15"
                .to_string(),
            usage: Usage::new(1, 1),
        })
    }

    fn model_name(&self) -> &str {
        "fixed-scorer"
    }
}

#[tokio::test]
async fn test_evaluation_preserves_topic_order() -> anyhow::Result<()> {
    let store = InMemoryArtifactStore::new();
    let h = harness(store.clone());
    BatchScheduler::new(Arc::new(h.pipeline), scheduler_config())
        .run(topics())
        .await;

    let evaluator = VideoEvaluator::new(Arc::new(FixedScorer), Arc::new(store), Duration::from_secs(5));
    let results = evaluator.evaluate_all(&topics(), 2).await;

    let indices: Vec<usize> = results.iter().map(|r| *r.topic.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let (scores, _) = results[0].outcome.as_ref().map_err(|e| anyhow::anyhow!(e.clone()))?;
    assert_eq!(scores.overall, 80.0);
    assert!(results[1].outcome.as_ref().is_err_and(|e| e.contains("no merged video")));

    let report = evaluation_report(&results);
    assert!(report.contains("Scored: 2"));
    assert!(report.contains("Average overall: 80.00/100"));
    Ok(())
}
