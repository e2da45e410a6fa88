//! Error types for the Lumiere pipeline.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! The taxonomy mirrors how the orchestrator reacts to failures:
//! [`GenerationError`] and [`CritiqueError`] are retryable within a budget,
//! [`RenderError`] drives the repair loop, and [`PipelineError`] is the only
//! kind that aborts a topic.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod critique;
mod error;
mod generation;
mod json;
mod pipeline;
mod render;
mod storage;

pub use config::ConfigError;
pub use critique::{CritiqueError, CritiqueErrorKind};
pub use error::{LumiereError, LumiereErrorKind, LumiereResult};
pub use generation::{GenerationError, GenerationErrorKind, RetryableError};
pub use json::JsonError;
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use render::{MergeError, MergeErrorKind, RenderError, RenderErrorKind};
pub use storage::{StorageError, StorageErrorKind};
