//! Text generation error types and retry classification.

/// Text-generation failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// API key environment variable not set
    #[display("{} environment variable not set", _0)]
    MissingApiKey(String),
    /// Request could not be delivered or the connection dropped
    #[display("Generation request failed: {}", _0)]
    Transport(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The call did not complete within its deadline
    #[display("Generation request timed out after {}s", _0)]
    Timeout(u64),
    /// The response arrived but no structured document could be reduced from it
    #[display("Malformed generation output: {}", _0)]
    Malformed(String),
    /// The response contained no text
    #[display("Generation response was empty")]
    EmptyResponse,
    /// All attempts were consumed
    #[display("Generation failed after {} attempts: {}", attempts, last_error)]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Display form of the final failure
        last_error: String,
    },
}

impl GenerationErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Transport failures, timeouts and malformed output share one budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            GenerationErrorKind::Transport(_)
            | GenerationErrorKind::Timeout(_)
            | GenerationErrorKind::Malformed(_)
            | GenerationErrorKind::EmptyResponse => true,
            GenerationErrorKind::MissingApiKey(_) | GenerationErrorKind::Exhausted { .. } => false,
        }
    }

    /// True for failures that happened after the service answered.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            GenerationErrorKind::Malformed(_) | GenerationErrorKind::EmptyResponse
        )
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use lumiere_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::Http {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = GenerationError::new(GenerationErrorKind::MissingApiKey("LUMIERE_API_KEY".into()));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Lets the retry loop decide whether a failure consumes an attempt and
/// tries again, or aborts immediately.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
