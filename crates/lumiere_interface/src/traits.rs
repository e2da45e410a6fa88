//! Trait definitions for the external collaborators.

use async_trait::async_trait;
use lumiere_core::{CritiqueRequest, CritiqueResponse, GenerateRequest, GenerateResponse, RenderJob};
use lumiere_error::{CritiqueError, GenerationError, MergeError, RenderError};

/// Text generation backend.
///
/// Implementations perform exactly one service call per invocation. Retry,
/// timeouts around retries and output parsing belong to the caller.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate raw text for a prompt.
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError>;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Multimodal critique backend.
#[async_trait]
pub trait CritiqueService: Send + Sync {
    /// Critique a rendered video, returning structured or free-form text.
    async fn critique(&self, req: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError>;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Rendering engine.
///
/// A successful render returns the encoded video bytes. A failed render
/// carries the engine's diagnostic text in the error.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render one section's source.
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError>;
}

/// Video concatenation utility.
#[async_trait]
pub trait Concatenator: Send + Sync {
    /// Concatenate segments in the given order into one video.
    async fn concat(&self, segments: &[Vec<u8>]) -> Result<Vec<u8>, MergeError>;
}
