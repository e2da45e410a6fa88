//! Log output setup for the binary.

use lumiere_error::{ConfigError, LumiereResult};
use std::env;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How log lines are filtered and formatted.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. "info", "lumiere_pipeline=debug")
    pub log_level: String,
    /// Emit one JSON object per line
    pub json_logs: bool,
}

impl LoggingConfig {
    /// Info-level text logs.
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Raise the default level to debug.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.log_level = "debug".to_string();
        }
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// The filter directive in effect: `RUST_LOG` when set, otherwise `log_level`.
    pub fn directive(&self) -> String {
        env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.log_level.clone())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns a configuration error for an unparsable filter directive.
pub fn init_logging(config: &LoggingConfig) -> LumiereResult<()> {
    let directive = config.directive();
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| ConfigError::new(format!("Invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Logging already initialised: {}", e)))?;
    Ok(())
}
