//! # Task specification: the task plus its terminal hooks.
//!
//! A [`TaskSpec`] bundles a [`TaskRef`] with optional `on_error`, `on_cancel`
//! and `on_finally` hooks. The runner fires them exactly once per execution:
//!
//! ```text
//! Ok(())             ──► on_finally
//! Err(Canceled)      ──► on_cancel ──► on_finally
//! Err(other)         ──► on_error  ──► on_finally
//! ```
//!
//! Callers that prefer a result value await the [`Completion`](crate::Completion)
//! returned by submit instead of (or in addition to) hooks.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::error::TaskError;
use crate::tasks::handle::TaskHandle;
use crate::tasks::task::TaskRef;
use crate::tasks::task_fn::TaskFn;

type ErrorHook = Arc<dyn Fn(&TaskError) + Send + Sync>;
type PlainHook = Arc<dyn Fn() + Send + Sync>;

/// Terminal hooks attached to a spec.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) on_error: Option<ErrorHook>,
    pub(crate) on_cancel: Option<PlainHook>,
    pub(crate) on_finally: Option<PlainHook>,
}

/// Specification for submitting a task.
///
/// ## Example
/// ```rust
/// use launchvisor::{TaskSpec, TaskHandle, TaskError};
///
/// let spec = TaskSpec::builder("download.single")
///     .on_error(|e: &TaskError| eprintln!("download failed: {e}"))
///     .on_finally(|| eprintln!("download finished"))
///     .build(|handle: TaskHandle| async move {
///         handle.update_progress(1.0);
///         Ok::<_, TaskError>(())
///     });
/// assert_eq!(spec.id(), "download.single");
/// ```
#[derive(Clone)]
pub struct TaskSpec {
    task: TaskRef,
    pub(crate) hooks: Hooks,
}

impl TaskSpec {
    /// Creates a specification without hooks.
    pub fn new(task: TaskRef) -> Self {
        Self {
            task,
            hooks: Hooks::default(),
        }
    }

    /// Creates a builder for constructing a spec from a closure.
    pub fn builder(id: impl Into<Cow<'static, str>>) -> TaskSpecBuilder {
        TaskSpecBuilder::new(id)
    }

    /// Returns reference to the task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    /// Convenience: returns the task id.
    pub fn id(&self) -> &str {
        self.task.id()
    }

    /// Sets the hook fired when the body fails.
    pub fn on_error(mut self, f: impl Fn(&TaskError) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the hook fired when the task is cancelled.
    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_cancel = Some(Arc::new(f));
        self
    }

    /// Sets the hook fired after every execution, last.
    pub fn on_finally(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_finally = Some(Arc::new(f));
        self
    }
}

/// Builder for [`TaskSpec`] with fluent API.
pub struct TaskSpecBuilder {
    id: Cow<'static, str>,
    hooks: Hooks,
}

impl TaskSpecBuilder {
    /// Creates a new builder with the given task id.
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            hooks: Hooks::default(),
        }
    }

    pub fn on_error(mut self, f: impl Fn(&TaskError) + Send + Sync + 'static) -> Self {
        self.hooks.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_cancel = Some(Arc::new(f));
        self
    }

    pub fn on_finally(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.on_finally = Some(Arc::new(f));
        self
    }

    /// Builds the spec from a closure body.
    pub fn build<F, Fut>(self, f: F) -> TaskSpec
    where
        F: Fn(TaskHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        TaskSpec {
            task: TaskFn::arc(self.id, f),
            hooks: self.hooks,
        }
    }

    /// Builds the spec from an existing task.
    pub fn build_from_task(self, task: TaskRef) -> TaskSpec {
        TaskSpec {
            task,
            hooks: self.hooks,
        }
    }
}
