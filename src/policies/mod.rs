//! Retry policies.
//!
//! ## Contents
//! - [`RetryPolicy`] attempt budget for `with_retry`
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 3 attempts.
//! - `BackoffPolicy::default()` → first=1s, factor=2.0, max=10s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
