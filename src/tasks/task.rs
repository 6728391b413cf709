//! # Task abstraction.
//!
//! A task has a stable [`id`](Task::id) and a [`spawn`](Task::spawn) method that
//! creates the future for one execution. The body receives a [`TaskHandle`]
//! carrying its cancellation token and progress state.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TaskError;
use crate::tasks::handle::TaskHandle;

/// Boxed future produced by [`Task::spawn`].
pub type BoxTaskFuture = BoxFuture<'static, Result<(), TaskError>>;

/// Shared task reference.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit of work.
///
/// Implementors should check [`TaskHandle::ensure_active`] at loop iterations
/// and return [`TaskError::Canceled`] when cancellation is observed.
///
/// # Example
/// ```
/// use launchvisor::{BoxTaskFuture, Task, TaskError, TaskHandle};
///
/// struct Unpack;
///
/// impl Task for Unpack {
///     fn id(&self) -> &str { "components.unpack" }
///
///     fn spawn(&self, handle: TaskHandle) -> BoxTaskFuture {
///         Box::pin(async move {
///             for step in 0..4 {
///                 handle.ensure_active()?;
///                 handle.update_progress(step as f32 / 4.0);
///             }
///             Ok::<(), TaskError>(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns the stable id used for registry lookup and de-duplication.
    fn id(&self) -> &str;

    /// Creates a new future for one execution of the task.
    fn spawn(&self, handle: TaskHandle) -> BoxTaskFuture;
}
