//! Wire types for OpenAI-compatible chat completion APIs.

use derive_getters::Getters;
use lumiere_core::Usage;
use serde::{Deserialize, Serialize};

/// Chat completion request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model identifier
    model: String,
    /// Conversation messages
    messages: Vec<ChatMessage>,
    /// Output size limit
    max_tokens: u32,
    /// Sampling temperature
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatRequest {
    /// Creates a new builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker role
    pub role: String,
    /// Message body
    pub content: MessageContent,
}

impl ChatMessage {
    /// A plain-text user message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// A multimodal user message.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

/// Plain or multimodal message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Ordered multimodal parts
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part
    Text {
        /// The text
        text: String,
    },
    /// Image passed as a URL or data URL
    ImageUrl {
        /// Location of the image
        image_url: MediaUrl,
    },
    /// Video passed as a URL or data URL
    VideoUrl {
        /// Location of the video
        video_url: MediaUrl,
    },
}

/// URL wrapper used by media parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrl {
    /// URL or `data:` URL
    pub url: String,
}

/// Chat completion response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Completion choices
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Usage reported by the service
    #[serde(default)]
    pub usage: Option<UsageDto>,
}

impl ChatResponse {
    /// Text of the first choice, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    /// Usage converted to pipeline counters, zero if unreported.
    pub fn usage(&self) -> Usage {
        self.usage
            .as_ref()
            .map(|u| Usage {
                requested: u.prompt_tokens,
                produced: u.completion_tokens,
                total: u.total_tokens.unwrap_or(u.prompt_tokens + u.completion_tokens),
            })
            .unwrap_or_default()
    }
}

/// One completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: ResponseMessage,
}

/// Message in a completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

/// Usage counters as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDto {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: Option<u64>,
}
