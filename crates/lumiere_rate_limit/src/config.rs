//! Layered configuration for Lumiere.

use config::{Config, Environment, File, FileFormat};
use lumiere_core::RunConfig;
use lumiere_error::{ConfigError, LumiereError, LumiereResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Connection and throttling settings for one HTTP model service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Default output size limit
    pub max_output_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Requests per minute (unlimited if absent)
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    /// Concurrent requests (unlimited if absent)
    #[serde(default)]
    pub max_concurrent: Option<u32>,
}

/// Critique service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CritiqueConfig {
    /// Connection settings
    #[serde(flatten)]
    pub service: ServiceConfig,
    /// Reference layout image attached to every critique request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<PathBuf>,
}

/// Rendering engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Executable name or path
    pub program: String,
    /// Quality flag passed to the engine
    pub quality: String,
    /// Per-render timeout in seconds
    pub timeout_secs: u64,
}

/// Video concatenation invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeConfig {
    /// Executable name or path
    pub program: String,
    /// Timeout in seconds
    pub timeout_secs: u64,
}

/// Pipeline budgets plus the output location.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Root directory for per-topic outputs
    pub output_dir: PathBuf,
    /// Budgets and concurrency limits
    #[serde(flatten)]
    pub run: RunConfig,
}

/// Topic-level batch scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Topics per batch
    pub batch_size: usize,
    /// Batches running at once
    pub max_workers: usize,
    /// Lower bound of the pause between topics in a batch
    pub inter_topic_delay_min_ms: u64,
    /// Upper bound of the pause between topics in a batch
    pub inter_topic_delay_max_ms: u64,
}

/// Video evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvaluationConfig {
    /// Videos evaluated at once
    pub max_workers: usize,
}

/// Top-level Lumiere configuration.
///
/// Loaded with a precedence system (later sources override earlier):
/// 1. Bundled defaults (include_str! from lumiere.toml)
/// 2. User config in home directory (~/.config/lumiere/lumiere.toml)
/// 3. User config in current directory (./lumiere.toml)
/// 4. Environment variables prefixed `LUMIERE__`, e.g. `LUMIERE__RENDER__TIMEOUT_SECS`
///
/// # Example
///
/// ```no_run
/// use lumiere_rate_limit::LumiereConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LumiereConfig::load()?;
/// println!("Rendering with {}", config.render.program);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LumiereConfig {
    /// Text generation service
    pub generation: ServiceConfig,
    /// Multimodal critique service
    pub critique: CritiqueConfig,
    /// Rendering engine
    pub render: RenderConfig,
    /// Concatenation utility
    pub merge: MergeConfig,
    /// Pipeline budgets
    pub pipeline: PipelineConfig,
    /// Batch scheduling
    pub scheduler: SchedulerConfig,
    /// Video evaluation
    pub evaluation: EvaluationConfig,
}

/// Bundled default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../../../lumiere.toml");

impl LumiereConfig {
    /// Load configuration with the full precedence chain.
    ///
    /// User config files are optional and skipped if not found.
    #[instrument]
    pub fn load() -> LumiereResult<Self> {
        debug!("Loading configuration: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/lumiere/lumiere.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("lumiere").required(false))
            .add_source(
                Environment::with_prefix("LUMIERE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder.build())
    }

    /// Load bundled defaults overlaid with one specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> LumiereResult<Self> {
        debug!("Loading configuration from file");

        let built = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build();
        Self::finish(built)
    }

    /// Bundled defaults only.
    pub fn bundled() -> LumiereResult<Self> {
        Self::finish(
            Config::builder()
                .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
                .build(),
        )
    }

    fn finish(built: Result<Config, config::ConfigError>) -> LumiereResult<Self> {
        let config: Self = built
            .map_err(|e| {
                LumiereError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                LumiereError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the deserializer cannot express.
    pub fn validate(&self) -> LumiereResult<()> {
        self.pipeline
            .run
            .validate()
            .map_err(|e| LumiereError::from(ConfigError::new(e)))?;
        if self.scheduler.batch_size == 0 || self.scheduler.max_workers == 0 {
            return Err(ConfigError::new("scheduler batch_size and max_workers must be at least 1").into());
        }
        if self.scheduler.inter_topic_delay_min_ms > self.scheduler.inter_topic_delay_max_ms {
            return Err(ConfigError::new("inter_topic_delay_min_ms exceeds inter_topic_delay_max_ms").into());
        }
        if self.evaluation.max_workers == 0 {
            return Err(ConfigError::new("evaluation max_workers must be at least 1").into());
        }
        Ok(())
    }

    /// The immutable run descriptor handed to workers.
    pub fn run_config(&self) -> RunConfig {
        self.pipeline
            .run
            .clone()
            .with_reference_image(self.critique.reference_image.clone())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> LumiereResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            LumiereError::from(ConfigError::new(format!(
                "Failed to serialize configuration: {}",
                e
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults() {
        let config = LumiereConfig::bundled().unwrap();
        assert_eq!(config.render.program, "manim");
        assert_eq!(config.render.quality, "-ql");
        assert_eq!(config.merge.program, "ffmpeg");
        assert_eq!(*config.pipeline.run.feedback_rounds(), 2);
        assert_eq!(*config.pipeline.run.max_regenerate_tries(), 10);
        assert_eq!(*config.pipeline.run.code_concurrency(), 6);
        assert_eq!(config.scheduler.batch_size, 3);
        assert_eq!(config.scheduler.max_workers, 8);
        assert_eq!(config.scheduler.inter_topic_delay_min_ms, 3000);
    }

    #[test]
    fn test_run_config_carries_reference_image() {
        let mut config = LumiereConfig::bundled().unwrap();
        config.critique.reference_image = Some(PathBuf::from("grid.png"));
        assert_eq!(
            config.run_config().reference_image(),
            &Some(PathBuf::from("grid.png"))
        );
    }

    #[test]
    fn test_toml_output() {
        let config = LumiereConfig::bundled().unwrap();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[pipeline]"));
        assert!(text.contains("feedback_rounds = 2"));
    }
}
