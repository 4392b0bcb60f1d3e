//! Time provider abstraction for idle tracking
//!
//! Process queues measure idleness against a monotonic clock obtained through
//! [`TimeProvider`], so expiration can be tested without sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Source of monotonic time
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production time provider backed by [`Instant::now`]
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests
///
/// Clones share the same underlying instant, so a test can keep one handle
/// and give another to the component under test.
#[derive(Debug, Clone)]
pub struct MockTimeProvider {
    current_instant: Arc<Mutex<Instant>>,
}

impl Default for MockTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current_instant: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance_time(&self, duration: Duration) {
        let mut instant = self
            .current_instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *instant += duration;
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> Instant {
        *self
            .current_instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
