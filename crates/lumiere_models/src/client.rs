//! Shared OpenAI-compatible HTTP client.

use crate::{ChatRequest, ChatResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Failure of a single chat completion call, before mapping to a domain error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFailure {
    /// Request never completed
    Transport(String),
    /// Deadline elapsed
    Timeout(u64),
    /// Service returned a non-success status
    Http {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Body could not be decoded
    Malformed(String),
}

/// Thin client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, ChatFailure> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChatFailure::Transport(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        debug!(endpoint = %endpoint, "Creating OpenAI-compatible client");
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint,
            timeout_secs,
        })
    }

    /// Model identifier.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Timeout applied to each request.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Sends one chat completion request.
    #[instrument(skip(self, request), fields(model = %self.model))]
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatFailure::Timeout(self.timeout_secs)
                } else {
                    error!(error = ?e, "Failed to send chat request");
                    ChatFailure::Transport(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Service returned error");
            return Err(ChatFailure::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            if e.is_timeout() {
                ChatFailure::Timeout(self.timeout_secs)
            } else {
                error!(error = ?e, "Failed to parse chat response");
                ChatFailure::Malformed(format!("Failed to parse response: {}", e))
            }
        })
    }
}

/// Read an API key from the named environment variable.
pub(crate) fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}
