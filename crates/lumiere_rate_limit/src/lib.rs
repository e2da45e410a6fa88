//! Configuration, rate limiting and retry policy for Lumiere.
//!
//! Every external service call goes through a [`RateLimiter`] and, where the
//! caller wants bounded retry, a [`RetryPolicy`]. Both are configured from
//! [`LumiereConfig`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod limiter;
mod retry;

pub use config::{
    CritiqueConfig, DEFAULT_CONFIG, EvaluationConfig, LumiereConfig, MergeConfig, PipelineConfig,
    RenderConfig, SchedulerConfig, ServiceConfig,
};
pub use limiter::{RateLimiter, RateLimiterGuard};
pub use retry::{RetryFailure, RetryPolicy};
