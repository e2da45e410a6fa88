//! Rendering engine and concatenation error types.

/// Rendering failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RenderErrorKind {
    /// The engine process could not be started
    #[display("Failed to spawn renderer: {}", _0)]
    Spawn(String),
    /// Workspace for the render could not be prepared
    #[display("Render workspace error: {}", _0)]
    Workspace(String),
    /// The engine ran past its deadline and was killed
    #[display("Render timed out after {}s", _0)]
    Timeout(u64),
    /// Non-zero exit; carries the engine's error stream
    #[display("Render failed (exit {}): {}", exit_code, diagnostic)]
    Failed {
        /// Process exit code, -1 when killed by signal
        exit_code: i32,
        /// Diagnostic text from the error stream
        diagnostic: String,
    },
    /// Exit code 0 but no output file could be discovered
    #[display("Render produced no output for scene {}", _0)]
    OutputMissing(String),
}

impl RenderErrorKind {
    /// Diagnostic text suitable for a repair request.
    pub fn diagnostic(&self) -> String {
        match self {
            RenderErrorKind::Failed { diagnostic, .. } => diagnostic.clone(),
            other => other.to_string(),
        }
    }
}

/// Render error with source location tracking.
///
/// # Examples
///
/// ```
/// use lumiere_error::{RenderError, RenderErrorKind};
///
/// let err = RenderError::new(RenderErrorKind::Failed {
///     exit_code: 1,
///     diagnostic: "NameError: name 'Sqaure' is not defined".to_string(),
/// });
/// assert!(err.kind.diagnostic().contains("NameError"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Render Error: {} at line {} in {}", kind, line, file)]
pub struct RenderError {
    /// The kind of error that occurred
    pub kind: RenderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RenderError {
    /// Create a new RenderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RenderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl crate::RetryableError for RenderError {
    /// Resource failures may clear on their own; engine failures need a code change.
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RenderErrorKind::Spawn(_) | RenderErrorKind::Workspace(_) | RenderErrorKind::Timeout(_)
        )
    }
}

/// Video concatenation failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum MergeErrorKind {
    /// Nothing to concatenate
    #[display("No segments to merge")]
    NoSegments,
    /// The utility could not be started
    #[display("Failed to spawn concatenation utility: {}", _0)]
    Spawn(String),
    /// Segment or manifest files could not be written
    #[display("Merge workspace error: {}", _0)]
    Workspace(String),
    /// The utility ran past its deadline
    #[display("Merge timed out after {}s", _0)]
    Timeout(u64),
    /// Non-zero exit
    #[display("Concatenation failed: {}", _0)]
    Failed(String),
}

/// Merge error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Merge Error: {} at line {} in {}", kind, line, file)]
pub struct MergeError {
    /// The kind of error that occurred
    pub kind: MergeErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl MergeError {
    /// Create a new MergeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: MergeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
