//! # Bounded worker pool.
//!
//! [`scan_all`] fans a list of items out to `parallelism` workers (capped at
//! the item count) and fans the results back in:
//!
//! ```text
//! items ──► [queue, closed once filled] ──► worker 1 ─┐
//!                                     ├──► worker 2 ──┼──► results (Mutex<Vec>)
//!                                     └──► worker N ──┘
//! ```
//!
//! ## Rules
//! - Every item is attempted exactly once and yields exactly one [`Scanned`],
//!   even when processing fails or panics.
//! - Result order is **not** the input order; sort at the call site.
//! - A worker stops pulling from the queue as soon as it observes cancellation;
//!   a cancelled scan returns [`TaskError::Canceled`] instead of partial results.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Default number of workers.
pub const DEFAULT_PARALLELISM: usize = 8;

/// Typed "could not process" result for one item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not process item: {reason}")]
pub struct ScanFailure {
    /// Why processing failed.
    pub reason: String,
}

/// One item together with what processing it produced.
#[derive(Debug, Clone)]
pub struct Scanned<I, R> {
    /// The input item.
    pub item: I,
    /// The processed value, or the captured failure.
    pub result: Result<R, ScanFailure>,
}

/// Processes `items` with `parallelism` workers (at least 1, at most one per item).
///
/// `process` returning [`TaskError::Canceled`] cancels the whole scan; any
/// other error (or a panic) is captured as a [`ScanFailure`] for that item.
pub async fn scan_all<I, R, F, Fut>(
    items: Vec<I>,
    parallelism: usize,
    token: &CancellationToken,
    process: F,
) -> Result<Vec<Scanned<I, R>>, TaskError>
where
    I: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, TaskError>> + Send + 'static,
{
    let total = items.len();
    let (tx, rx) = mpsc::unbounded_channel();
    for item in items {
        if tx.send(item).is_err() {
            break;
        }
    }
    drop(tx);

    let queue = Arc::new(AsyncMutex::new(rx));
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let process = Arc::new(process);
    let scope = token.child_token();

    let mut workers = JoinSet::new();
    for _ in 0..worker_count(parallelism, total) {
        workers.spawn(worker(
            Arc::clone(&queue),
            Arc::clone(&results),
            Arc::clone(&process),
            scope.clone(),
        ));
    }

    let mut canceled = false;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                canceled = true;
                scope.cancel();
            }
            Err(join_err) => {
                scope.cancel();
                return Err(TaskError::fatal(format!("scan worker died: {join_err}")));
            }
        }
    }
    if canceled || token.is_cancelled() {
        return Err(TaskError::Canceled);
    }

    let mut guard = results.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(std::mem::take(&mut *guard))
}

fn worker_count(parallelism: usize, items: usize) -> usize {
    parallelism.clamp(1, items.max(1))
}

async fn worker<I, R, F, Fut>(
    queue: Arc<AsyncMutex<mpsc::UnboundedReceiver<I>>>,
    results: Arc<Mutex<Vec<Scanned<I, R>>>>,
    process: Arc<F>,
    token: CancellationToken,
) -> Result<(), TaskError>
where
    I: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, TaskError>> + Send + 'static,
{
    loop {
        if token.is_cancelled() {
            return Ok(());
        }
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            return Ok(());
        };

        let body = std::panic::AssertUnwindSafe(process(item.clone())).catch_unwind();
        let res = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            res = body => res,
        };

        let result = match res {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(TaskError::Canceled)) => return Err(TaskError::Canceled),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to process item");
                Err(ScanFailure {
                    reason: e.to_string(),
                })
            }
            Err(_panic) => {
                tracing::warn!("item processing panicked");
                Err(ScanFailure {
                    reason: "processing panicked".to_string(),
                })
            }
        };

        results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Scanned { item, result });
    }
}
