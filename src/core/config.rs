//! # Task system configuration.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `grace = 0s` → shutdown does not wait for tasks

use std::time::Duration;

/// Configuration for a [`TaskSystem`](crate::TaskSystem).
#[derive(Clone, Debug)]
pub struct SystemConfig {
    /// Maximum time [`TaskSystem::shutdown`](crate::TaskSystem::shutdown) waits
    /// for cancelled tasks to finish.
    pub grace: Duration,

    /// Maximum number of task bodies running at once (`0` = unlimited).
    ///
    /// Tasks waiting for a permit stay `Preparing`.
    pub max_concurrent: usize,

    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
}

impl SystemConfig {
    /// Returns the concurrency limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SystemConfig {
    /// - `grace = 60s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            max_concurrent: 0,
            bus_capacity: 1024,
        }
    }
}
