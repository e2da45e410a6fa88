//! Pipeline orchestration error types.

/// Topic-level pipeline failure conditions.
///
/// Only these conditions abort a topic; everything else degrades to
/// skipping a section or keeping its last good version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// Outline generation exhausted its attempts
    #[display("Outline generation failed: {}", _0)]
    OutlineExhausted(String),
    /// Storyboard generation exhausted its attempts
    #[display("Storyboard generation failed: {}", _0)]
    StoryboardExhausted(String),
    /// Persisted storyboard is unusable (no sections, duplicate ids)
    #[display("Invalid storyboard: {}", _0)]
    InvalidStoryboard(String),
    /// Zero sections produced a valid video
    #[display("No section of '{}' produced a video", _0)]
    NoSuccessfulSections(String),
    /// A section worker panicked or was cancelled
    #[display("Section worker failed: {}", _0)]
    Worker(String),
}

/// Pipeline error with source location tracking.
///
/// # Examples
///
/// ```
/// use lumiere_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::NoSuccessfulSections("binary search".into()));
/// assert!(format!("{}", err).contains("binary search"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
