//! Best-effort reduction of critique replies to a [`Critique`].

use crate::extraction::extract_json;
use lumiere_core::{Critique, Improvement};
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

static PROBLEM_SOLUTION: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)Problem:\s*(.*?);\s*Solution:\s*(.*?)(?:\n|$)")
        .expect("Valid problem/solution regex")
});

static BARE_SOLUTION: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?i)Solution\s*:\s*(.+)").expect("Valid solution regex"));

/// Parse a critique reply.
///
/// The structured form is `{"layout": {"has_issues", "improvements": [...]}}`.
/// When no JSON document can be read, `Problem: ...; Solution: ...` lines are
/// collected instead, then bare `Solution: ...` lines. Free-text findings count
/// as issues.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::parse_critique;
///
/// let reply = r#"{"layout": {"has_issues": true, "improvements": [
///     {"problem": "label overlaps", "solution": "move label to D4", "object_affected": "label"}
/// ]}}"#;
/// let critique = parse_critique(reply);
/// assert!(critique.needs_revision());
/// assert_eq!(critique.improvements[0].object_affected.as_deref(), Some("label"));
/// ```
pub fn parse_critique(text: &str) -> Critique {
    if let Some(critique) = parse_structured(text) {
        return critique;
    }

    tracing::debug!("Critique reply is not JSON, falling back to line extraction");

    let mut improvements: Vec<Improvement> = PROBLEM_SOLUTION
        .captures_iter(text)
        .filter_map(|caps| {
            let problem = caps.get(1)?.as_str().trim();
            let solution = caps.get(2)?.as_str().trim();
            (!problem.is_empty() || !solution.is_empty()).then(|| Improvement::new(problem, solution))
        })
        .collect();

    if improvements.is_empty() {
        improvements = BARE_SOLUTION
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(|s| Improvement::new("", s))
            .collect();
    }

    Critique::with_improvements(improvements)
}

fn parse_structured(text: &str) -> Option<Critique> {
    let json = extract_json(text).ok()?;
    let value: JsonValue = serde_json::from_str(&json).ok()?;
    let layout = value.get("layout")?;

    let has_issues = layout
        .get("has_issues")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);

    let improvements = layout
        .get("improvements")
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().filter_map(improvement_from).collect())
        .unwrap_or_default();

    Some(Critique {
        has_issues,
        improvements,
    })
}

fn improvement_from(item: &JsonValue) -> Option<Improvement> {
    let text_of = |key: &str| {
        item.get(key)
            .map(|v| match v {
                JsonValue::String(s) => s.trim().to_string(),
                JsonValue::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };

    let problem = text_of("problem");
    let solution = text_of("solution");
    if problem.is_empty() && solution.is_empty() {
        return None;
    }

    let line_number = item
        .get("line_number")
        .and_then(|v| v.as_u64().or_else(|| v.as_str()?.trim().parse().ok()))
        .and_then(|n| u32::try_from(n).ok());
    let object_affected = Some(text_of("object_affected")).filter(|s| !s.is_empty());

    Some(Improvement {
        problem,
        solution,
        line_number,
        object_affected,
    })
}
