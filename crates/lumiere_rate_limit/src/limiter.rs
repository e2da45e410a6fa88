//! Request throttling using governor and a Tokio semaphore.
//!
//! Requests per minute are enforced with governor's GCRA limiter, and
//! in-flight requests are capped with a semaphore.

use crate::ServiceConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter shared by every caller of one service.
///
/// Clones share quota state.
///
/// # Example
///
/// ```rust
/// use lumiere_rate_limit::RateLimiter;
///
/// # async fn example() {
/// let limiter = RateLimiter::new(Some(60), Some(2));
/// let guard = limiter.acquire().await;
/// // make the call...
/// drop(guard);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rpm_limiter: Option<Arc<DirectRateLimiter>>,
    concurrent_semaphore: Arc<Semaphore>,
}

impl RateLimiter {
    /// Create a limiter. `None` leaves a dimension unlimited.
    pub fn new(requests_per_minute: Option<u32>, max_concurrent: Option<u32>) -> Self {
        let rpm_limiter = requests_per_minute
            .and_then(NonZeroU32::new)
            .map(|n| Arc::new(GovernorRateLimiter::direct(Quota::per_minute(n))));

        let permits = max_concurrent
            .map(|n| n.max(1) as usize)
            .unwrap_or(Semaphore::MAX_PERMITS);

        Self {
            rpm_limiter,
            concurrent_semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Create a limiter from service settings.
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self::new(config.requests_per_minute, config.max_concurrent)
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    /// Wait until a request may start.
    ///
    /// The returned guard holds a concurrency slot until dropped.
    pub async fn acquire(&self) -> RateLimiterGuard {
        if let Some(limiter) = &self.rpm_limiter {
            limiter.until_ready().await;
        }

        // Acquired last so the slot is not held while waiting on quota.
        let permit = self.concurrent_semaphore.clone().acquire_owned().await.ok();
        RateLimiterGuard { _permit: permit }
    }

    /// Slots currently free.
    pub fn available_slots(&self) -> usize {
        self.concurrent_semaphore.available_permits()
    }
}

/// Holds a concurrency slot until dropped.
#[derive(Debug)]
pub struct RateLimiterGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_releases_slot() {
        let limiter = RateLimiter::new(None, Some(2));
        assert_eq!(limiter.available_slots(), 2);
        let guard = limiter.acquire().await;
        assert_eq!(limiter.available_slots(), 1);
        drop(guard);
        assert_eq!(limiter.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_treated_as_one() {
        let limiter = RateLimiter::new(Some(0), Some(0));
        let _guard = limiter.acquire().await;
        assert_eq!(limiter.available_slots(), 0);
    }
}
