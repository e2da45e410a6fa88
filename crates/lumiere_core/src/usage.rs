//! Resource usage counters.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use std::sync::Arc;

/// Units consumed by one or more service calls.
///
/// # Examples
///
/// ```
/// use lumiere_core::Usage;
///
/// let a = Usage::new(10, 5);
/// let b = Usage::new(3, 2);
/// assert_eq!((a + b).total, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Units sent to the service
    pub requested: u64,
    /// Units produced by the service
    pub produced: u64,
    /// Total units billed
    pub total: u64,
}

impl Usage {
    /// Usage where the total is the sum of requested and produced units.
    pub fn new(requested: u64, produced: u64) -> Self {
        Self {
            requested,
            produced,
            total: requested + produced,
        }
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            requested: self.requested + rhs.requested,
            produced: self.produced + rhs.produced,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

/// Shared, serialized accumulator of usage for one topic run.
///
/// Clones share the same counters. Every increment takes the lock, so
/// concurrent section workers never lose updates.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    inner: Arc<Mutex<Usage>>,
}

impl UsageAccumulator {
    /// Creates an accumulator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one call's usage.
    pub fn record(&self, usage: Usage) {
        let mut guard = self.inner.lock();
        *guard += usage;
        tracing::trace!(total = guard.total, "Usage recorded");
    }

    /// Current totals.
    pub fn snapshot(&self) -> Usage {
        *self.inner.lock()
    }
}
