//! Request and response types for the external collaborators.

use crate::Usage;
use serde::{Deserialize, Serialize};

/// Text generation request.
///
/// # Examples
///
/// ```
/// use lumiere_core::GenerateRequest;
///
/// let request = GenerateRequest::new("Outline a lecture on heaps", 4096);
/// assert_eq!(request.max_tokens, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Prompt text
    pub prompt: String,
    /// Maximum output size
    pub max_tokens: u32,
}

impl GenerateRequest {
    /// Creates a request.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Raw text returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Free-form response text, possibly fenced
    pub text: String,
    /// Units consumed by the call
    pub usage: Usage,
}

/// Multimodal critique request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CritiqueRequest {
    /// Prompt text
    pub prompt: String,
    /// Encoded video to critique
    pub video: Vec<u8>,
    /// Optional reference image for layout comparison
    pub reference_image: Option<Vec<u8>>,
}

/// Raw critique service output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueResponse {
    /// Structured or free-form response text
    pub text: String,
    /// Units consumed by the call
    pub usage: Usage,
}

/// A single invocation of the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderJob {
    /// Section being rendered, used to name the source file
    pub section_id: String,
    /// Source text to render
    pub source: String,
    /// Scene class to render
    pub entry_point: String,
}
