//! Critique feedback for a rendered section.

use serde::{Deserialize, Serialize};

/// One proposed layout improvement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Improvement {
    /// What looks wrong
    pub problem: String,
    /// How to fix it
    pub solution: String,
    /// Source line the problem relates to, when known
    #[serde(default)]
    pub line_number: Option<u32>,
    /// Element the fix applies to, when named
    #[serde(default)]
    pub object_affected: Option<String>,
}

impl Improvement {
    /// Creates an improvement from a problem and its fix.
    pub fn new(problem: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            solution: solution.into(),
            line_number: None,
            object_affected: None,
        }
    }
}

/// Structured critique of one rendered section.
///
/// Consumed by a single revision attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Critique {
    /// Whether the critique found anything worth fixing
    pub has_issues: bool,
    /// Ordered improvements
    #[serde(default)]
    pub improvements: Vec<Improvement>,
}

impl Critique {
    /// A critique with nothing to fix.
    pub fn clean() -> Self {
        Self::default()
    }

    /// A critique listing the given improvements.
    pub fn with_improvements(improvements: Vec<Improvement>) -> Self {
        Self {
            has_issues: !improvements.is_empty(),
            improvements,
        }
    }

    /// Whether a revision should be attempted.
    pub fn needs_revision(&self) -> bool {
        self.has_issues && !self.improvements.is_empty()
    }

    /// Renders the improvements as numbered instructions.
    pub fn as_instructions(&self) -> String {
        self.improvements
            .iter()
            .enumerate()
            .map(|(i, imp)| format!("{}. Problem: {}\n   Solution: {}", i + 1, imp.problem, imp.solution))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
