//! Trait definitions for the external services used by Lumiere.
//!
//! The pipeline talks to four collaborators: a text generator, a multimodal
//! critique service, a rendering engine and a video concatenation utility.
//! Each is a trait here so orchestration can run against scripted mocks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{Concatenator, CritiqueService, Renderer, TextGenerator};
