//! # Retry policy.
//!
//! [`RetryPolicy`] bounds how many attempts [`with_retry`](crate::with_retry)
//! makes and how long it waits between them.

use std::time::Duration;

use crate::policies::{BackoffPolicy, JitterPolicy};

/// Attempt budget plus backoff schedule.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (`0` is treated as `1`).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    /// Three attempts, 1s initial delay doubling up to 10s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Builds a policy from the classic `(maxRetries, initialDelay, maxDelay)` triple.
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffPolicy {
                first: initial_delay,
                max: max_delay,
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        }
    }

    /// Same policy with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt budget clamped to at least one attempt.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
