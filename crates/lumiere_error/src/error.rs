//! Top-level error wrapper types.

use crate::{
    ConfigError, CritiqueError, GenerationError, JsonError, MergeError, PipelineError,
    RenderError, StorageError,
};

/// Every error produced inside the Lumiere workspace.
///
/// # Examples
///
/// ```
/// use lumiere_error::{LumiereError, ConfigError};
///
/// let err: LumiereError = ConfigError::new("missing [generation] table").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum LumiereErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Artifact storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Text generation error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Critique service error
    #[from(CritiqueError)]
    Critique(CritiqueError),
    /// Rendering engine error
    #[from(RenderError)]
    Render(RenderError),
    /// Concatenation error
    #[from(MergeError)]
    Merge(MergeError),
    /// Topic-fatal pipeline error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Lumiere error with kind discrimination.
///
/// # Examples
///
/// ```
/// use lumiere_error::{LumiereResult, StorageError, StorageErrorKind};
///
/// fn load() -> LumiereResult<Vec<u8>> {
///     Err(StorageError::new(StorageErrorKind::NotFound("outline.json".into())))?
/// }
///
/// assert!(load().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Lumiere Error: {}", _0)]
pub struct LumiereError(Box<LumiereErrorKind>);

impl LumiereError {
    /// Create a new error from a kind.
    pub fn new(kind: LumiereErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LumiereErrorKind {
        &self.0
    }

    /// True when the error is a missing-artifact storage error.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), LumiereErrorKind::Storage(e) if e.is_not_found())
    }
}

// Generic From implementation for any type that converts to LumiereErrorKind
impl<T> From<T> for LumiereError
where
    T: Into<LumiereErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Lumiere operations.
pub type LumiereResult<T> = std::result::Result<T, LumiereError>;
