//! # Retry with exponential backoff.
//!
//! [`with_retry`] runs a fallible async block up to [`RetryPolicy::attempts`]
//! times. Errors are classified through [`Retryable`]:
//!
//! ```text
//! attempt 1 ──Err(retryable)──► sleep(backoff.next(0)) ──► attempt 2 ──► ... ──► last error
//!     │
//!     ├──Err(fatal)─────► returned immediately
//!     ├──Err(canceled)──► returned immediately
//!     └──Ok(v)──────────► Ok(v)
//! ```
//!
//! The token is observed before each attempt, while an attempt runs and during
//! every backoff sleep. There is no sleep after the final attempt.

use std::fmt::Display;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::fetch::error::{FetchError, MirrorError};
use crate::policies::RetryPolicy;

/// Error classification used by [`with_retry`].
pub trait Retryable {
    /// `true` if another attempt may succeed.
    fn is_retryable(&self) -> bool;
    /// `true` if this error is the cancellation signal.
    fn is_canceled(&self) -> bool;
    /// The cancellation value of this error type.
    fn canceled() -> Self;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
    fn is_canceled(&self) -> bool {
        FetchError::is_canceled(self)
    }
    fn canceled() -> Self {
        FetchError::Canceled
    }
}

impl Retryable for MirrorError {
    fn is_retryable(&self) -> bool {
        MirrorError::is_retryable(self)
    }
    fn is_canceled(&self) -> bool {
        MirrorError::is_canceled(self)
    }
    fn canceled() -> Self {
        MirrorError::Canceled
    }
}

impl Retryable for TaskError {
    fn is_retryable(&self) -> bool {
        TaskError::is_retryable(self)
    }
    fn is_canceled(&self) -> bool {
        TaskError::is_canceled(self)
    }
    fn canceled() -> Self {
        TaskError::Canceled
    }
}

/// Runs `block` until it succeeds, fails fatally, is cancelled, or the
/// attempt budget of `policy` is spent.
///
/// Exhausting the budget returns the most recent retryable error.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use launchvisor::{RetryPolicy, with_retry};
/// use launchvisor::fetch::FetchError;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4));
/// let token = CancellationToken::new();
/// let mut calls = 0;
/// let res: Result<u32, FetchError> = with_retry("example", &policy, &token, || {
///     calls += 1;
///     let n = calls;
///     async move {
///         if n < 3 { Err(FetchError::Status { code: 503 }) } else { Ok(n) }
///     }
/// })
/// .await;
/// assert_eq!(res.unwrap(), 3);
/// # }
/// ```
pub async fn with_retry<T, E, F, Fut>(
    tag: &str,
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut block: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let attempts = policy.attempts();
    let mut attempt: u32 = 0;

    loop {
        if token.is_cancelled() {
            return Err(E::canceled());
        }
        attempt += 1;

        let res = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(E::canceled()),
            res = block() => res,
        };

        let err = match res {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        if err.is_canceled() {
            return Err(err);
        }
        if !err.is_retryable() {
            tracing::debug!(tag, attempt, error = %err, "attempt failed, not retryable");
            return Err(err);
        }
        if attempt >= attempts {
            tracing::debug!(tag, attempt, error = %err, "attempt failed, retries exhausted");
            return Err(err);
        }

        let delay = policy.backoff.next(attempt - 1);
        tracing::debug!(tag, attempt, ?delay, error = %err, "attempt failed, retrying");
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(E::canceled()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(100), Duration::from_millis(250))
    }

    fn counted(
        calls: &Arc<AtomicU32>,
        err: impl Fn() -> FetchError,
    ) -> impl FnMut() -> std::future::Ready<Result<(), FetchError>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(err()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_error_uses_whole_budget_with_doubling_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let res = with_retry(
            "t",
            &policy(4),
            &CancellationToken::new(),
            counted(&calls, || FetchError::Status { code: 503 }),
        )
        .await;

        assert!(matches!(res, Err(FetchError::Status { code: 503 })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 100 + 200 + 250 (capped); no sleep after the last attempt.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(550) && elapsed < Duration::from_millis(560));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_aborts_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let res = with_retry(
            "t",
            &policy(3),
            &CancellationToken::new(),
            counted(&calls, || FetchError::Status { code: 404 }),
        )
        .await;

        assert!(matches!(res, Err(FetchError::Status { code: 404 })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let res = with_retry(
            "t",
            &policy(3),
            &CancellationToken::new(),
            counted(&calls, || FetchError::Canceled),
        )
        .await;

        assert!(matches!(res, Err(FetchError::Canceled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let trip = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trip.cancel();
        });

        let res = with_retry(
            "t",
            &policy(5),
            &token,
            counted(&calls, || FetchError::Status { code: 500 }),
        )
        .await;

        assert!(matches!(res, Err(FetchError::Canceled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let fast = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));

        let res: Result<&str, TaskError> = with_retry("t", &fast, &CancellationToken::new(), || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(TaskError::fail("flaky"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(res.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
