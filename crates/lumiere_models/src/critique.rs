//! Multimodal critique over an OpenAI-compatible API.

use crate::client::api_key_from_env;
use crate::{ChatFailure, ChatMessage, ChatRequest, ContentPart, MediaUrl, OpenAiCompatibleClient};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lumiere_core::{CritiqueRequest, CritiqueResponse};
use lumiere_error::{CritiqueError, CritiqueErrorKind};
use lumiere_interface::CritiqueService;
use lumiere_rate_limit::ServiceConfig;
use tracing::{debug, instrument};

/// Critique service that sends the video (and optional reference image)
/// inline as base64 data URLs.
#[derive(Debug, Clone)]
pub struct OpenAiCritiqueClient {
    inner: OpenAiCompatibleClient,
    max_output_tokens: u32,
}

impl OpenAiCritiqueClient {
    /// Creates a client from service settings.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if the configured variable is unset.
    #[instrument(skip_all, fields(model = %config.model))]
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CritiqueError> {
        let api_key = api_key_from_env(&config.api_key_env).ok_or_else(|| {
            CritiqueError::new(CritiqueErrorKind::MissingApiKey(config.api_key_env.clone()))
        })?;
        let inner = OpenAiCompatibleClient::new(
            api_key,
            config.model.clone(),
            &config.base_url,
            config.timeout_secs,
        )
        .map_err(convert_failure)?;
        Ok(Self {
            inner,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

/// Maps a transport-level failure to a critique error.
pub(crate) fn convert_failure(failure: ChatFailure) -> CritiqueError {
    let kind = match failure {
        ChatFailure::Transport(msg) => CritiqueErrorKind::Transport(msg),
        ChatFailure::Timeout(secs) => CritiqueErrorKind::Timeout(secs),
        ChatFailure::Http { status, message } => CritiqueErrorKind::Http {
            status_code: status,
            message,
        },
        ChatFailure::Malformed(msg) => CritiqueErrorKind::Malformed(msg),
    };
    CritiqueError::new(kind)
}

/// Encodes bytes as a `data:` URL.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Guesses an image MIME type from magic bytes.
pub fn image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl CritiqueService for OpenAiCritiqueClient {
    #[instrument(skip(self, req), fields(model = %self.inner.model_name(), video_bytes = req.video.len()))]
    async fn critique(&self, req: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError> {
        if req.video.is_empty() {
            return Err(CritiqueError::new(CritiqueErrorKind::Attachment(
                "video is empty".to_string(),
            )));
        }

        let mut parts = vec![ContentPart::VideoUrl {
            video_url: MediaUrl {
                url: data_url("video/mp4", &req.video),
            },
        }];
        if let Some(image) = &req.reference_image {
            parts.push(ContentPart::ImageUrl {
                image_url: MediaUrl {
                    url: data_url(image_mime(image), image),
                },
            });
        }
        parts.push(ContentPart::Text {
            text: req.prompt.clone(),
        });

        let request = ChatRequest::builder()
            .model(self.inner.model_name())
            .messages(vec![ChatMessage::user_parts(parts)])
            .max_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| CritiqueError::new(CritiqueErrorKind::Transport(e.to_string())))?;

        let response = self.inner.send(&request).await.map_err(convert_failure)?;
        let usage = response.usage();
        let text = response
            .first_text()
            .ok_or_else(|| {
                CritiqueError::new(CritiqueErrorKind::Malformed("empty critique".to_string()))
            })?
            .to_string();

        debug!(chars = text.len(), "Received critique");
        Ok(CritiqueResponse { text, usage })
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
        assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
        assert_eq!(image_mime(b"GIF89a"), "application/octet-stream");
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("video/mp4", b"abc"), "data:video/mp4;base64,YWJj");
    }
}
