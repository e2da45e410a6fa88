//! Text generation over an OpenAI-compatible API.

use crate::client::api_key_from_env;
use crate::{ChatFailure, ChatMessage, ChatRequest, OpenAiCompatibleClient};
use async_trait::async_trait;
use lumiere_core::{GenerateRequest, GenerateResponse};
use lumiere_error::{GenerationError, GenerationErrorKind};
use lumiere_interface::TextGenerator;
use lumiere_rate_limit::ServiceConfig;
use tracing::{debug, instrument};

/// Text generator backed by a chat completion endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTextGenerator {
    inner: OpenAiCompatibleClient,
}

impl OpenAiTextGenerator {
    /// Creates a generator from service settings, reading the API key from
    /// the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if the variable is unset or empty.
    #[instrument(skip_all, fields(model = %config.model))]
    pub fn from_config(config: &ServiceConfig) -> Result<Self, GenerationError> {
        let api_key = api_key_from_env(&config.api_key_env).ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::MissingApiKey(config.api_key_env.clone()))
        })?;
        Self::with_api_key(api_key, config)
    }

    /// Creates a generator with an explicit API key.
    pub fn with_api_key(
        api_key: impl Into<String>,
        config: &ServiceConfig,
    ) -> Result<Self, GenerationError> {
        let inner = OpenAiCompatibleClient::new(
            api_key,
            config.model.clone(),
            &config.base_url,
            config.timeout_secs,
        )
        .map_err(convert_failure)?;
        Ok(Self { inner })
    }
}

/// Maps a transport-level failure to a generation error.
pub(crate) fn convert_failure(failure: ChatFailure) -> GenerationError {
    let kind = match failure {
        ChatFailure::Transport(msg) => GenerationErrorKind::Transport(msg),
        ChatFailure::Timeout(secs) => GenerationErrorKind::Timeout(secs),
        ChatFailure::Http { status, message } => GenerationErrorKind::Http {
            status_code: status,
            message,
        },
        ChatFailure::Malformed(msg) => GenerationErrorKind::Malformed(msg),
    };
    GenerationError::new(kind)
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    #[instrument(skip(self, req), fields(model = %self.inner.model_name(), prompt_len = req.prompt.len()))]
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let request = ChatRequest::builder()
            .model(self.inner.model_name())
            .messages(vec![ChatMessage::user_text(req.prompt.clone())])
            .max_tokens(req.max_tokens)
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::Transport(e.to_string())))?;

        let response = self.inner.send(&request).await.map_err(convert_failure)?;
        let usage = response.usage();
        let text = response
            .first_text()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))?
            .to_string();

        debug!(chars = text.len(), total_units = usage.total, "Generated text");
        Ok(GenerateResponse { text, usage })
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiere_error::RetryableError;

    #[test]
    fn test_failure_classification() {
        assert!(convert_failure(ChatFailure::Timeout(30)).is_retryable());
        assert!(convert_failure(ChatFailure::Http { status: 503, message: String::new() }).is_retryable());
        assert!(!convert_failure(ChatFailure::Http { status: 401, message: String::new() }).is_retryable());
        assert!(convert_failure(ChatFailure::Malformed("eof".into())).kind.is_malformed());
    }
}
