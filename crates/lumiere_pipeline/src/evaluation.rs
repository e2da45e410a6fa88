//! Aesthetic scoring of finished lecture videos.

use crate::extraction::extract_json;
use crate::prompts::evaluation_prompt;
use futures::StreamExt;
use lumiere_core::{CritiqueRequest, Topic};
use lumiere_interface::CritiqueService;
use lumiere_storage::{ArtifactKey, ArtifactStore, read_optional};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Highest score on a single axis.
pub const AXIS_MAX: f64 = 20.0;

const AXES: [(&str, &str); 5] = [
    ("element_layout", r"(?is)element[ _]layout.*?(\d+(?:\.\d+)?)"),
    ("attractiveness", r"(?is)attractiveness.*?(\d+(?:\.\d+)?)"),
    ("logic_flow", r"(?is)logic[ _]flow.*?(\d+(?:\.\d+)?)"),
    ("accuracy_depth", r"(?is)accuracy.*?depth.*?(\d+(?:\.\d+)?)"),
    ("visual_consistency", r"(?is)visual[ _]consistency.*?(\d+(?:\.\d+)?)"),
];

static AXIS_PATTERNS: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    AXES.iter()
        .map(|(_, pattern)| regex::Regex::new(pattern).expect("Valid axis score regex"))
        .collect()
});

/// Scores on the five axes; `overall` is their sum out of 100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationScores {
    /// Spacing, alignment, no overlap
    pub element_layout: f64,
    /// Visual appeal
    pub attractiveness: f64,
    /// Step-to-step coherence
    pub logic_flow: f64,
    /// Correctness and depth
    pub accuracy_depth: f64,
    /// Consistent style
    pub visual_consistency: f64,
    /// Sum of the axes
    pub overall: f64,
}

impl EvaluationScores {
    fn from_axes(axes: [f64; 5]) -> Self {
        let [element_layout, attractiveness, logic_flow, accuracy_depth, visual_consistency] =
            axes.map(|v| v.clamp(0.0, AXIS_MAX));
        Self {
            element_layout,
            attractiveness,
            logic_flow,
            accuracy_depth,
            visual_consistency,
            overall: element_layout + attractiveness + logic_flow + accuracy_depth + visual_consistency,
        }
    }
}

/// Structured scores and feedback, or `None` when nothing score-like is present.
///
/// JSON of the form `{"element_layout": {"score": 17, "feedback": "..."}, ...}`
/// is preferred; otherwise the first number after each axis name is used.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::parse_evaluation;
///
/// let (scores, _) = parse_evaluation("Element Layout: 15\nAttractiveness: 16\nLogic Flow: 18\nAccuracy & Depth: 17\nVisual Consistency: 14").unwrap();
/// assert_eq!(scores.overall, 80.0);
/// ```
pub fn parse_evaluation(text: &str) -> Option<(EvaluationScores, String)> {
    if let Some(parsed) = parse_structured(text) {
        return Some(parsed);
    }

    let mut found = false;
    let mut axes = [0.0; 5];
    for (slot, pattern) in axes.iter_mut().zip(AXIS_PATTERNS.iter()) {
        if let Some(value) = pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            *slot = value;
            found = true;
        }
    }
    found.then(|| (EvaluationScores::from_axes(axes), text.trim().to_string()))
}

fn parse_structured(text: &str) -> Option<(EvaluationScores, String)> {
    let json = extract_json(text).ok()?;
    let value: JsonValue = serde_json::from_str(&json).ok()?;
    if !AXES.iter().any(|(axis, _)| value.get(axis).is_some()) {
        return None;
    }

    let score_of = |axis: &str| -> f64 {
        match value.get(axis) {
            Some(JsonValue::Object(obj)) => obj.get("score").and_then(number).unwrap_or(0.0),
            Some(other) => number(other).unwrap_or(0.0),
            None => 0.0,
        }
    };
    let axes = AXES.map(|(axis, _)| score_of(axis));

    let mut feedback: Vec<String> = AXES
        .iter()
        .filter_map(|(axis, _)| {
            let text = value.get(axis)?.get("feedback")?.as_str()?;
            Some(format!("**{}** ({}): {}", axis, score_of(axis), text))
        })
        .collect();
    if let Some(summary) = value.get("summary").and_then(JsonValue::as_str) {
        feedback.push(format!("**summary**: {}", summary));
    }

    Some((EvaluationScores::from_axes(axes), feedback.join("\n\n")))
}

fn number(value: &JsonValue) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().parse().ok())
}

/// Evaluation of one topic's merged video.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// The topic
    pub topic: Topic,
    /// Scores and feedback, or why evaluation failed
    pub outcome: Result<(EvaluationScores, String), String>,
}

/// Scores merged videos with the critique service.
#[derive(Clone)]
pub struct VideoEvaluator {
    critic: Arc<dyn CritiqueService>,
    store: Arc<dyn ArtifactStore>,
    deadline: Duration,
}

impl VideoEvaluator {
    /// Create an evaluator reading merged videos from `store`.
    pub fn new(critic: Arc<dyn CritiqueService>, store: Arc<dyn ArtifactStore>, deadline: Duration) -> Self {
        Self {
            critic,
            store,
            deadline,
        }
    }

    /// Evaluate one topic. Failures become an error result.
    #[instrument(skip(self), fields(topic = %topic))]
    pub async fn evaluate(&self, topic: &Topic) -> EvaluationResult {
        let outcome = self.try_evaluate(topic).await;
        match &outcome {
            Ok((scores, _)) => info!(overall = scores.overall, "Video evaluated"),
            Err(reason) => warn!(reason = %reason, "Evaluation failed"),
        }
        EvaluationResult {
            topic: topic.clone(),
            outcome,
        }
    }

    async fn try_evaluate(&self, topic: &Topic) -> Result<(EvaluationScores, String), String> {
        let key = ArtifactKey::merged(topic);
        let video = read_optional(self.store.as_ref(), &key)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no merged video at {}", key))?;

        let request = CritiqueRequest {
            prompt: evaluation_prompt(topic),
            video,
            reference_image: None,
        };
        let response = tokio::time::timeout(self.deadline, self.critic.critique(&request))
            .await
            .map_err(|_| format!("evaluation timed out after {}s", self.deadline.as_secs()))?
            .map_err(|e| e.kind.to_string())?;

        parse_evaluation(&response.text).ok_or_else(|| "reply contained no scores".to_string())
    }

    /// Evaluate many topics, at most `max_workers` at once, preserving input order.
    pub async fn evaluate_all(&self, topics: &[Topic], max_workers: usize) -> Vec<EvaluationResult> {
        futures::stream::iter(topics)
            .map(|topic| self.evaluate(topic))
            .buffered(max_workers.max(1))
            .collect()
            .await
    }
}

/// Markdown report over a set of evaluations.
pub fn evaluation_report(results: &[EvaluationResult]) -> String {
    if results.is_empty() {
        return "# Lecture video evaluation\n\nNo videos were evaluated.\n".to_string();
    }

    let mut report = String::from("# Lecture video evaluation\n\n## Videos\n\n");
    let mut scored: Vec<EvaluationScores> = Vec::new();

    for result in results {
        report.push_str(&format!("### {}\n\n", result.topic));
        match &result.outcome {
            Ok((scores, feedback)) => {
                scored.push(*scores);
                report.push_str(&format!(
                    "- Overall: {:.1}/100\n- Element layout: {:.1}\n- Attractiveness: {:.1}\n- Logic flow: {:.1}\n- Accuracy & depth: {:.1}\n- Visual consistency: {:.1}\n\n",
                    scores.overall,
                    scores.element_layout,
                    scores.attractiveness,
                    scores.logic_flow,
                    scores.accuracy_depth,
                    scores.visual_consistency
                ));
                if !feedback.is_empty() {
                    report.push_str(feedback);
                    report.push_str("\n\n");
                }
            }
            Err(reason) => report.push_str(&format!("Evaluation failed: {}\n\n", reason)),
        }
    }

    report.push_str(&format!(
        "## Summary\n\n- Videos: {}\n- Scored: {}\n",
        results.len(),
        scored.len()
    ));
    if !scored.is_empty() {
        let n = scored.len() as f64;
        let mean = |f: fn(&EvaluationScores) -> f64| scored.iter().map(f).sum::<f64>() / n;
        report.push_str(&format!(
            "- Average overall: {:.2}/100\n- Element layout: {:.1}%\n- Attractiveness: {:.1}%\n- Logic flow: {:.1}%\n- Accuracy & depth: {:.1}%\n- Visual consistency: {:.1}%\n",
            mean(|s| s.overall),
            mean(|s| s.element_layout) / AXIS_MAX * 100.0,
            mean(|s| s.attractiveness) / AXIS_MAX * 100.0,
            mean(|s| s.logic_flow) / AXIS_MAX * 100.0,
            mean(|s| s.accuracy_depth) / AXIS_MAX * 100.0,
            mean(|s| s.visual_consistency) / AXIS_MAX * 100.0,
        ));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_scores_and_feedback() {
        let reply = r#"```json
{"element_layout": {"score": 18, "feedback": "clean"},
 "attractiveness": {"score": "16"},
 "logic_flow": {"score": 17},
 "accuracy_depth": {"score": 19},
 "visual_consistency": {"score": 15},
 "summary": "solid"}
```"#;
        let (scores, feedback) = parse_evaluation(reply).unwrap();
        assert_eq!(scores.attractiveness, 16.0);
        assert_eq!(scores.overall, 85.0);
        assert!(feedback.contains("clean"));
        assert!(feedback.contains("solid"));
    }

    #[test]
    fn test_scores_clamped_to_axis_range() {
        let (scores, _) = parse_evaluation(r#"{"element_layout": {"score": 45}}"#).unwrap();
        assert_eq!(scores.element_layout, AXIS_MAX);
        assert_eq!(scores.overall, AXIS_MAX);
    }

    #[test]
    fn test_no_scores() {
        assert!(parse_evaluation("I could not watch the video").is_none());
    }

    #[test]
    fn test_report_handles_failures() {
        let results = vec![
            EvaluationResult {
                topic: Topic::new(0, "Binary search"),
                outcome: Ok((EvaluationScores::from_axes([10.0; 5]), String::new())),
            },
            EvaluationResult {
                topic: Topic::new(1, "Heap sort"),
                outcome: Err("no merged video".into()),
            },
        ];
        let report = evaluation_report(&results);
        assert!(report.contains("Evaluation failed: no merged video"));
        assert!(report.contains("Average overall: 50.00/100"));
        assert!(report.contains("Scored: 1"));
    }
}
