//! Immutable per-run configuration handed to section workers.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Budgets and switches for one pipeline run.
///
/// Built once from the loaded configuration plus CLI overrides, then cloned
/// into every worker. Nothing mutates it after construction.
///
/// # Examples
///
/// ```
/// use lumiere_core::RunConfig;
///
/// let config = RunConfig::builder()
///     .feedback_rounds(1u32)
///     .use_feedback(false)
///     .build()
///     .unwrap();
/// assert_eq!(*config.max_regenerate_tries(), 10);
/// assert!(!config.use_feedback());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct RunConfig {
    /// Attempts per structured generation call (outline, storyboard).
    #[serde(default = "default_generation_attempts")]
    #[builder(default = "default_generation_attempts()")]
    max_generation_attempts: u32,

    /// Delay between generation attempts before jitter.
    #[serde(default = "default_retry_delay_ms")]
    #[builder(default = "default_retry_delay_ms()")]
    retry_delay_ms: u64,

    /// Fresh regenerations allowed in the initial build-fix loop.
    #[serde(default = "default_regenerate_tries")]
    #[builder(default = "default_regenerate_tries()")]
    max_regenerate_tries: u32,

    /// Diagnostic-guided repairs per regeneration in the initial loop.
    #[serde(default = "default_fix_bug_tries")]
    #[builder(default = "default_fix_bug_tries()")]
    max_fix_bug_tries: u32,

    /// Revision attempts per critique round.
    #[serde(default = "default_feedback_gen_code_tries")]
    #[builder(default = "default_feedback_gen_code_tries()")]
    max_feedback_gen_code_tries: u32,

    /// Diagnostic-guided repairs per revision attempt.
    #[serde(default = "default_mllm_fix_bugs_tries")]
    #[builder(default = "default_mllm_fix_bugs_tries()")]
    max_mllm_fix_bugs_tries: u32,

    /// Critique rounds per section.
    #[serde(default = "default_feedback_rounds")]
    #[builder(default = "default_feedback_rounds()")]
    feedback_rounds: u32,

    /// Whether the critique-rollback loop runs at all.
    #[serde(default = "default_true")]
    #[builder(default = "true")]
    use_feedback: bool,

    /// Output size limit for code generation requests.
    #[serde(default = "default_max_code_tokens")]
    #[builder(default = "default_max_code_tokens()")]
    max_code_tokens: u32,

    /// Concurrent code generation requests within a topic.
    #[serde(default = "default_code_concurrency")]
    #[builder(default = "default_code_concurrency()")]
    code_concurrency: usize,

    /// Concurrent section workers within a topic.
    #[serde(default = "default_section_workers")]
    #[builder(default = "default_section_workers()")]
    section_workers: usize,

    /// Reference image sent with critique requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    reference_image: Option<PathBuf>,
}

fn default_generation_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_regenerate_tries() -> u32 {
    10
}

fn default_fix_bug_tries() -> u32 {
    10
}

fn default_feedback_gen_code_tries() -> u32 {
    3
}

fn default_mllm_fix_bugs_tries() -> u32 {
    3
}

fn default_feedback_rounds() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_max_code_tokens() -> u32 {
    10_000
}

fn default_code_concurrency() -> usize {
    6
}

fn default_section_workers() -> usize {
    6
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: default_generation_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_regenerate_tries: default_regenerate_tries(),
            max_fix_bug_tries: default_fix_bug_tries(),
            max_feedback_gen_code_tries: default_feedback_gen_code_tries(),
            max_mllm_fix_bugs_tries: default_mllm_fix_bugs_tries(),
            feedback_rounds: default_feedback_rounds(),
            use_feedback: true,
            max_code_tokens: default_max_code_tokens(),
            code_concurrency: default_code_concurrency(),
            section_workers: default_section_workers(),
            reference_image: None,
        }
    }
}

impl RunConfig {
    /// Creates a new builder.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Checks that every budget allows at least one attempt.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first zero budget.
    pub fn validate(&self) -> Result<(), String> {
        let budgets = [
            ("max_generation_attempts", self.max_generation_attempts),
            ("max_regenerate_tries", self.max_regenerate_tries),
            ("max_feedback_gen_code_tries", self.max_feedback_gen_code_tries),
        ];
        for (name, value) in budgets {
            if value == 0 {
                return Err(format!("{} must be at least 1", name));
            }
        }
        if self.code_concurrency == 0 || self.section_workers == 0 {
            return Err("concurrency limits must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(*config.feedback_rounds(), 2);
        assert_eq!(*config.max_fix_bug_tries(), 10);
        assert_eq!(*config.max_code_tokens(), 10_000);
        assert!(*config.use_feedback());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_setters_override() {
        let config = RunConfig::default()
            .with_feedback_rounds(0)
            .with_use_feedback(false);
        assert_eq!(*config.feedback_rounds(), 0);
        assert!(!config.use_feedback());
    }

    #[test]
    fn test_zero_regenerate_budget_rejected() {
        let config = RunConfig::default().with_max_regenerate_tries(0);
        assert!(config.validate().unwrap_err().contains("max_regenerate_tries"));
    }
}
