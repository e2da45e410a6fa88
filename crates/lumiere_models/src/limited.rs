//! Rate-limited wrappers around service clients.

use async_trait::async_trait;
use lumiere_core::{CritiqueRequest, CritiqueResponse, GenerateRequest, GenerateResponse};
use lumiere_error::{CritiqueError, GenerationError};
use lumiere_interface::{CritiqueService, TextGenerator};
use lumiere_rate_limit::RateLimiter;

/// Wraps a client so every call first waits on a shared [`RateLimiter`].
///
/// Access to the wrapped client goes through `inner()`.
#[derive(Debug, Clone)]
pub struct RateLimited<T> {
    inner: T,
    limiter: RateLimiter,
}

impl<T> RateLimited<T> {
    /// Wraps `inner` with `limiter`.
    pub fn new(inner: T, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The shared limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[async_trait]
impl<T: TextGenerator> TextGenerator for RateLimited<T> {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let _guard = self.limiter.acquire().await;
        self.inner.generate(req).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[async_trait]
impl<T: CritiqueService> CritiqueService for RateLimited<T> {
    async fn critique(&self, req: &CritiqueRequest) -> Result<CritiqueResponse, CritiqueError> {
        let _guard = self.limiter.acquire().await;
        self.inner.critique(req).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
