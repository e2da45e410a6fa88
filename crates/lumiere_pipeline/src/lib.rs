//! Topic-to-video orchestration for Lumiere.
//!
//! A [`TopicPipeline`] turns one topic into a merged lecture video: outline,
//! storyboard, per-section code, then one isolated worker per section running
//! the build-fix loop followed by the critique-rollback loop. Successful
//! sections are concatenated in storyboard order. A [`BatchScheduler`] runs
//! many topics, and a [`VideoEvaluator`] scores finished videos.
//!
//! Every stage consults the artifact store first, so re-running a partially
//! failed topic only redoes the missing work.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifacts;
mod build_fix;
mod context;
mod critique;
mod critique_loop;
mod evaluation;
mod extraction;
mod generation;
mod orchestrator;
pub mod prompts;
mod scheduler;
mod source;
mod stages;
mod worker;

pub use build_fix::{BuildBudget, BuildEvent, BuildFixMachine, BuildStep};
pub use context::{
    Collaborators, CritiqueSummary, DEFAULT_CALL_DEADLINE, SectionOutcome, SectionServices, SectionTask,
};
pub use critique::parse_critique;
pub use evaluation::{
    AXIS_MAX, EvaluationResult, EvaluationScores, VideoEvaluator, evaluation_report, parse_evaluation,
};
pub use extraction::{extract_code, extract_json};
pub use generation::{generate_structured, generate_text, parse_code, parse_json_document};
pub use orchestrator::{SectionReport, TopicPipeline, TopicReport};
pub use scheduler::{BatchScheduler, RunSummary, TopicResult, inter_topic_delay};
pub use source::{
    GridAnchor, Placement, TEACHING_SCENE_BASE, deterministic_repair, discover_entry_point, extract_placements,
    grid_cells_in, inject_base_class, placement_table, targeted_patch,
};
pub use worker::run_section;
