//! # Task state, progress snapshot and terminal outcome.
//!
//! ```text
//! Preparing ──start──► Running ──ok─────► Completed
//!     │                   ├──error──► Completed (Failed outcome)
//!     └──cancel───────────┴──cancel─► Completed (Cancelled outcome)
//! ```
//!
//! `Completed` is terminal; cancellation and failure are outcomes, not states.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::TaskError;

/// Lifecycle state of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, waiting to start (e.g. for a concurrency permit).
    Preparing,
    /// Body is executing.
    Running,
    /// Terminal; reached by success, failure or cancellation.
    Completed,
}

/// Progress value meaning "indeterminate".
pub const INDETERMINATE: f32 = -1.0;

/// Progress message: a template with positional `{0}`..`{n}` placeholders.
///
/// # Example
/// ```
/// use launchvisor::Message;
///
/// let msg = Message::new("Downloading {0} ({1}/{2})").with_args(["client.jar", "3", "10"]);
/// assert_eq!(msg.render(), "Downloading client.jar (3/10)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    template: Cow<'static, str>,
    args: Vec<String>,
}

impl Message {
    /// Creates a message without arguments.
    pub fn new(template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
        }
    }

    /// Replaces the positional arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the raw template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Substitutes `{i}` with the i-th argument. Unknown indices are left as-is.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest: &str = &self.template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                let idx: usize = after[..close].parse().ok()?;
                let arg = self.args.get(idx)?;
                Some((arg, close))
            });
            match substituted {
                Some((arg, close)) => {
                    out.push_str(arg);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Point-in-time view of a task.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    /// Task id.
    pub id: Arc<str>,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Progress in `[0, 1]`, or [`INDETERMINATE`].
    pub progress: f32,
    /// Last progress message.
    pub message: Option<Message>,
}

impl TaskSnapshot {
    pub(crate) fn preparing(id: Arc<str>) -> Self {
        Self {
            id,
            state: TaskState::Preparing,
            progress: INDETERMINATE,
            message: None,
        }
    }

    /// Returns `true` when progress is the indeterminate sentinel.
    pub fn is_indeterminate(&self) -> bool {
        self.progress < 0.0
    }
}

/// Terminal result of a task execution.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Body returned `Ok(())`.
    Completed,
    /// Body returned an error other than cancellation.
    Failed(TaskError),
    /// Cancellation was observed before the body finished.
    Cancelled,
}

impl TaskOutcome {
    /// Returns `true` for [`TaskOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    /// Returns `true` for [`TaskOutcome::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }

    /// Converts into a `Result`, mapping cancellation to [`TaskError::Canceled`].
    pub fn into_result(self) -> Result<(), TaskError> {
        match self {
            TaskOutcome::Completed => Ok(()),
            TaskOutcome::Failed(e) => Err(e),
            TaskOutcome::Cancelled => Err(TaskError::Canceled),
        }
    }
}

/// Awaitable completion signal returned by [`TaskSystem::submit`](crate::TaskSystem::submit).
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<TaskOutcome>,
}

impl Completion {
    pub(crate) fn channel() -> (oneshot::Sender<TaskOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Waits for the task to reach `Completed` and returns its outcome.
    ///
    /// If the executor vanished without reporting (runtime shutdown), the outcome
    /// is reported as cancelled.
    pub async fn wait(self) -> TaskOutcome {
        self.rx.await.unwrap_or(TaskOutcome::Cancelled)
    }
}
