//! Model service clients for Lumiere.
//!
//! Both the text generator and the critique service speak the
//! OpenAI-compatible chat completion protocol, so any provider exposing
//! that surface can be configured by base URL and model name.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod critique;
mod dto;
mod limited;
mod text;

pub use client::{ChatFailure, OpenAiCompatibleClient};
pub use critique::{OpenAiCritiqueClient, data_url, image_mime};
pub use dto::{
    ChatChoice, ChatMessage, ChatRequest, ChatRequestBuilder, ContentPart, MediaUrl,
    MessageContent, ResponseMessage, UsageDto, ChatResponse,
};
pub use limited::RateLimited;
pub use text::OpenAiTextGenerator;
