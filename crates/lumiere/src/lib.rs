//! Lumiere - topic-to-lecture-video generation.
//!
//! Lumiere turns a short topic description ("binary search") into a narrated
//! lecture video: a language model plans an outline and storyboard, writes
//! animation code per section, the rendering engine renders it, a
//! multimodal critic reviews the layout, and the rendered sections are
//! concatenated in storyboard order.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lumiere::{LumiereConfig, Topic, TopicPipeline, collaborators};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LumiereConfig::load()?;
//!     let collaborators = collaborators(&config, &config.pipeline.output_dir)?;
//!     let pipeline = TopicPipeline::new(collaborators, config.run_config());
//!
//!     let report = pipeline.run_topic(&Topic::new(0, "Binary search")).await?;
//!     println!("{} sections merged", report.merged_sections().len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `lumiere_core` - Data model (Topic, Storyboard, artifacts, usage)
//! - `lumiere_interface` - Collaborator traits
//! - `lumiere_error` - Error types
//! - `lumiere_rate_limit` - Configuration, rate limiting and retry
//! - `lumiere_storage` - Resumable artifact storage
//! - `lumiere_models` - OpenAI-compatible generation and critique clients
//! - `lumiere_render` - Rendering engine and concatenation adapters
//! - `lumiere_pipeline` - Stages, section loops, scheduling and evaluation
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;
mod topics;
mod wiring;

pub use lumiere_core::*;
pub use lumiere_error::*;
pub use lumiere_interface::*;
pub use lumiere_models::{OpenAiCritiqueClient, OpenAiTextGenerator, RateLimited};
pub use lumiere_pipeline::{
    BatchScheduler, Collaborators, EvaluationResult, EvaluationScores, RunSummary, SectionReport, TopicPipeline,
    TopicReport, TopicResult, VideoEvaluator, evaluation_report,
};
pub use lumiere_rate_limit::{
    CritiqueConfig, EvaluationConfig, LumiereConfig, MergeConfig, PipelineConfig, RateLimiter, RenderConfig,
    RetryPolicy, SchedulerConfig, ServiceConfig,
};
pub use lumiere_render::{FfmpegConcatenator, ManimRenderer};
pub use lumiere_storage::{ArtifactKey, ArtifactStore, FileSystemArtifactStore, InMemoryArtifactStore};

pub use observability::{LoggingConfig, init_logging};
pub use topics::{load_topic_list, numbered_topics};
pub use wiring::{call_deadline, collaborators, evaluator};
