//! Rendering engine and video concatenation process adapters for Lumiere.
//!
//! Both adapters run external programs in a scratch directory with a hard
//! deadline; a timed-out child is killed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ffmpeg;
mod manim;
mod process;

pub use ffmpeg::{FfmpegConcatenator, manifest};
pub use manim::{DIAGNOSTIC_TAIL_LINES, ManimRenderer, output_candidates};
pub use process::{RunFailure, run_with_timeout, tail_lines};
