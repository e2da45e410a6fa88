//! Critique service error types.

/// Multimodal critique failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CritiqueErrorKind {
    /// API key environment variable not set
    #[display("{} environment variable not set", _0)]
    MissingApiKey(String),
    /// The video or reference image could not be prepared for upload
    #[display("Failed to read critique attachment: {}", _0)]
    Attachment(String),
    /// Request could not be delivered
    #[display("Critique request failed: {}", _0)]
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
    #[display("Critique request timed out after {}s", _0)]
    Timeout(u64),
    /// Nothing usable could be extracted from the reply
    #[display("Malformed critique: {}", _0)]
    Malformed(String),
}

impl CritiqueErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            CritiqueErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            CritiqueErrorKind::Transport(_) | CritiqueErrorKind::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Critique error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Critique Error: {} at line {} in {}", kind, line, file)]
pub struct CritiqueError {
    /// The kind of error that occurred
    pub kind: CritiqueErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CritiqueError {
    /// Create a new CritiqueError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CritiqueErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl crate::RetryableError for CritiqueError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
