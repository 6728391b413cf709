//! # TaskHandle: the executing body's view of its own task.
//!
//! A [`TaskHandle`] is passed to every task body. It carries the task id, the
//! task's [`CancellationToken`] and its progress state. Progress updates are
//! published as [`EventKind::TaskProgress`] events when the handle is attached
//! to a task system.
//!
//! ## Rules
//! - Progress and message updates after `Completed` are ignored.
//! - Progress is clamped to `[0, 1]`; negative (or NaN) values become the
//!   indeterminate sentinel.
//! - State is only moved forward by the runner.

use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::state::{INDETERMINATE, Message, TaskSnapshot, TaskState};

/// Handle given to a running task body.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: Arc<str>,
    token: CancellationToken,
    status: Arc<watch::Sender<TaskSnapshot>>,
    bus: Option<Bus>,
}

impl TaskHandle {
    pub(crate) fn new(id: Arc<str>, token: CancellationToken, bus: Option<Bus>) -> Self {
        let (status, _rx) = watch::channel(TaskSnapshot::preparing(id.clone()));
        Self {
            id,
            token,
            status: Arc::new(status),
            bus,
        }
    }

    /// Creates a handle not attached to any task system.
    ///
    /// Useful for driving task bodies directly (tests, nested work).
    pub fn detached(id: impl Into<Arc<str>>, token: CancellationToken) -> Self {
        Self::new(id.into(), token, None)
    }

    /// Returns the task id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the task's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `Err(TaskError::Canceled)` once cancellation was requested.
    ///
    /// Call at loop iterations and between blocking steps.
    pub fn ensure_active(&self) -> Result<(), TaskError> {
        if self.token.is_cancelled() {
            Err(TaskError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> TaskSnapshot {
        self.status.borrow().clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> TaskState {
        self.status.borrow().state
    }

    /// Subscribes to snapshot changes.
    pub fn watch(&self) -> watch::Receiver<TaskSnapshot> {
        self.status.subscribe()
    }

    /// Sets progress, keeping the current message.
    pub fn update_progress(&self, progress: f32) {
        self.apply(Some(progress), None);
    }

    /// Sets progress and message (template + positional args).
    pub fn update_progress_with<I, S>(
        &self,
        progress: f32,
        template: impl Into<Cow<'static, str>>,
        args: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(
            Some(progress),
            Some(Message::new(template).with_args(args)),
        );
    }

    /// Sets the message, keeping the current progress.
    pub fn update_message<I, S>(&self, template: impl Into<Cow<'static, str>>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(None, Some(Message::new(template).with_args(args)));
    }

    fn apply(&self, progress: Option<f32>, message: Option<Message>) {
        let mut changed = false;
        self.status.send_if_modified(|snap| {
            if snap.state == TaskState::Completed {
                return false;
            }
            if let Some(p) = progress {
                snap.progress = normalize_progress(p);
            }
            if let Some(m) = message {
                snap.message = Some(m);
            }
            changed = true;
            true
        });

        if !changed {
            return;
        }
        if let Some(bus) = &self.bus {
            let snap = self.status.borrow().clone();
            let mut ev = Event::new(EventKind::TaskProgress)
                .with_task(self.id.clone())
                .with_progress(snap.progress);
            if let Some(m) = &snap.message {
                ev = ev.with_reason(m.render());
            }
            bus.publish(ev);
        }
    }

    /// Moves the state forward; never leaves `Completed`.
    pub(crate) fn set_state(&self, state: TaskState) {
        self.status.send_if_modified(|snap| {
            if snap.state == TaskState::Completed || snap.state == state {
                return false;
            }
            snap.state = state;
            true
        });
    }
}

fn normalize_progress(p: f32) -> f32 {
    if p.is_nan() || p < 0.0 {
        INDETERMINATE
    } else {
        p.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_and_sentinel_preserved() {
        let h = TaskHandle::detached("t", CancellationToken::new());
        h.update_progress(1.7);
        assert_eq!(h.snapshot().progress, 1.0);
        h.update_progress(-0.3);
        assert!(h.snapshot().is_indeterminate());
        h.update_progress(f32::NAN);
        assert_eq!(h.snapshot().progress, INDETERMINATE);
    }

    #[test]
    fn updates_after_completed_are_ignored() {
        let h = TaskHandle::detached("t", CancellationToken::new());
        h.set_state(TaskState::Running);
        h.update_progress_with(0.5, "step {0}", ["one"]);
        h.set_state(TaskState::Completed);
        h.update_progress(0.9);
        h.update_message("late", Vec::<String>::new());
        h.set_state(TaskState::Running);

        let snap = h.snapshot();
        assert_eq!(snap.state, TaskState::Completed);
        assert_eq!(snap.progress, 0.5);
        assert_eq!(snap.message.map(|m| m.render()).as_deref(), Some("step one"));
    }

    #[test]
    fn ensure_active_reports_cancellation() {
        let token = CancellationToken::new();
        let h = TaskHandle::detached("t", token.clone());
        assert!(h.ensure_active().is_ok());
        token.cancel();
        assert!(matches!(h.ensure_active(), Err(TaskError::Canceled)));
    }

    #[tokio::test]
    async fn progress_is_published_on_bus() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let h = TaskHandle::new("dl".into(), CancellationToken::new(), Some(bus));
        h.update_progress_with(0.25, "Downloading {0}", ["a.jar"]);

        let ev = rx.recv().await.expect("progress event");
        assert_eq!(ev.kind, EventKind::TaskProgress);
        assert_eq!(ev.progress, Some(0.25));
        assert_eq!(ev.reason.as_deref(), Some("Downloading a.jar"));
    }
}
