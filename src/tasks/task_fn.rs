//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(TaskHandle) -> Fut`, producing a fresh
//! future per spawn. Shared state between the closure and the caller goes
//! through an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use launchvisor::{TaskFn, TaskHandle, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc("accounts.refresh", |handle: TaskHandle| async move {
//!     handle.ensure_active()?;
//!     handle.update_progress(0.5);
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.id(), "accounts.refresh");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::handle::TaskHandle;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(id: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(TaskHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn spawn(&self, handle: TaskHandle) -> BoxTaskFuture {
        Box::pin((self.f)(handle))
    }
}
