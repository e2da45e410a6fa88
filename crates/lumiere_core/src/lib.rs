//! Core data types for the Lumiere lecture video pipeline.
//!
//! This crate provides the data model shared by every other Lumiere crate:
//! topics, planning documents, per-section artifacts, critique feedback,
//! usage accounting and the per-run configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod config;
mod critique;
mod outline;
mod request;
mod state;
mod topic;
mod usage;

pub use artifact::{CodeArtifact, VideoArtifact};
pub use config::{RunConfig, RunConfigBuilder, RunConfigBuilderError};
pub use critique::{Critique, Improvement};
pub use outline::{Outline, Section, SectionSpec, Storyboard};
pub use request::{CritiqueRequest, CritiqueResponse, GenerateRequest, GenerateResponse, RenderJob};
pub use state::SectionState;
pub use topic::{Topic, path_component};
pub use usage::{Usage, UsageAccumulator};
