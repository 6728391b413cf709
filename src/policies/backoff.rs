//! # Backoff policy for retrying network work.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! The delay before retry `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base delay is derived purely from the retry index,
//! so jitter output never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use launchvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy::default();
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(1), Duration::from_secs(2));
//! assert_eq!(backoff.next(3), Duration::from_secs(8));
//! // 16s is capped at max=10s
//! assert_eq!(backoff.next(4), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to spread out synchronized retries.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a doubling policy:
    /// - `first = 1s`;
    /// - `max = 10s`;
    /// - `factor = 2.0`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1000),
            max: Duration::from_millis(10_000),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before retry number `retry` (0-indexed).
    ///
    /// Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, retry: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = retry.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
