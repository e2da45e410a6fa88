//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the lumiere binary.

mod commands;
mod evaluate;
mod run;

pub use commands::{Cli, Commands};
pub use evaluate::evaluate_videos;
pub use run::run_topics;
