//! # Run a single task execution.
//!
//! Drives one [`Task`] from `Preparing` to `Completed`, publishes lifecycle
//! events and fires the spec's terminal hooks.
//!
//! ## Event flow
//! ```text
//! [permit] → TaskStarting → task.spawn() ──Ok──────────► TaskCompleted → on_finally
//!                                        ├─Err(Canceled)► TaskCancelled → on_cancel → on_finally
//!                                        ├─Err(e)───────► TaskFailed    → on_error  → on_finally
//!                                        └─panic────────► TaskFailed(fatal) → on_error → on_finally
//! ```
//!
//! ## Rules
//! - Exactly one terminal event and exactly one of `on_error` / `on_cancel` (or neither).
//! - Cancellation is observed while waiting for a permit and at every suspension
//!   point of the body (the body future is dropped when the token fires).
//! - State is set to `Completed` before hooks run.
//! - A panicking hook is logged; the remaining hooks still run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;

use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    tasks::{Hooks, TaskHandle, TaskOutcome, TaskRef, TaskState},
};

/// Executes `task` once with the given handle.
pub(crate) async fn run_task(
    task: TaskRef,
    hooks: Hooks,
    handle: TaskHandle,
    semaphore: Option<Arc<Semaphore>>,
    bus: &Bus,
) -> TaskOutcome {
    let outcome = execute(&task, &handle, semaphore, bus).await;

    handle.set_state(TaskState::Completed);
    publish_terminal(bus, handle.id(), &outcome);
    fire_hooks(handle.id(), &hooks, &outcome);
    outcome
}

async fn execute(
    task: &TaskRef,
    handle: &TaskHandle,
    semaphore: Option<Arc<Semaphore>>,
    bus: &Bus,
) -> TaskOutcome {
    let token = handle.token().clone();

    let _permit = match semaphore {
        Some(sem) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => return TaskOutcome::Cancelled,
                res = sem.acquire_owned() => match res {
                    Ok(permit) => Some(permit),
                    Err(_closed) => return TaskOutcome::Cancelled,
                },
            }
        }
        None => None,
    };
    if token.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    handle.set_state(TaskState::Running);
    bus.publish(Event::new(EventKind::TaskStarting).with_task(handle.id()));

    let body = std::panic::AssertUnwindSafe(task.spawn(handle.clone())).catch_unwind();
    let res = tokio::select! {
        biased;
        _ = token.cancelled() => Err(TaskError::Canceled),
        res = body => match res {
            Ok(r) => r,
            Err(panic) => Err(TaskError::fatal(panic_message(&*panic))),
        },
    };

    match res {
        Ok(()) => TaskOutcome::Completed,
        Err(TaskError::Canceled) => TaskOutcome::Cancelled,
        Err(e) => TaskOutcome::Failed(e),
    }
}

fn publish_terminal(bus: &Bus, id: &str, outcome: &TaskOutcome) {
    let ev = match outcome {
        TaskOutcome::Completed => Event::new(EventKind::TaskCompleted),
        TaskOutcome::Cancelled => Event::new(EventKind::TaskCancelled),
        TaskOutcome::Failed(e) => Event::new(EventKind::TaskFailed).with_reason(e.to_string()),
    };
    bus.publish(ev.with_task(id));
}

fn fire_hooks(id: &str, hooks: &Hooks, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Completed => {}
        TaskOutcome::Failed(e) => {
            if let Some(f) = &hooks.on_error {
                guarded(id, "on_error", || f(e));
            }
        }
        TaskOutcome::Cancelled => {
            if let Some(f) = &hooks.on_cancel {
                guarded(id, "on_cancel", || f());
            }
        }
    }
    if let Some(f) = &hooks.on_finally {
        guarded(id, "on_finally", || f());
    }
}

/// Runs one hook; a panic is logged and swallowed so the executor still
/// deregisters the task and delivers its outcome.
fn guarded(id: &str, hook: &'static str, f: impl FnOnce()) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(task = id, hook, reason = %panic_message(&*panic), "hook panicked");
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        format!("task panicked: {msg}")
    } else if let Some(msg) = any.downcast_ref::<String>() {
        format!("task panicked: {msg}")
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskFn, TaskSpec};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    fn recording_spec(
        task: TaskRef,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> TaskSpec {
        let (e, c, f) = (log.clone(), log.clone(), log.clone());
        TaskSpec::new(task)
            .on_error(move |_| e.lock().unwrap().push("error"))
            .on_cancel(move || c.lock().unwrap().push("cancel"))
            .on_finally(move || f.lock().unwrap().push("finally"))
    }

    async fn run(spec: TaskSpec, token: CancellationToken) -> TaskOutcome {
        let bus = Bus::new(64);
        let handle = TaskHandle::new(spec.id().into(), token, Some(bus.clone()));
        run_task(spec.task().clone(), spec.hooks.clone(), handle, None, &bus).await
    }

    #[tokio::test]
    async fn success_fires_only_finally() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef = TaskFn::arc("ok", |_h: TaskHandle| async { Ok::<(), TaskError>(()) });
        let outcome = run(recording_spec(task, &log), CancellationToken::new()).await;

        assert!(outcome.is_completed());
        assert_eq!(*log.lock().unwrap(), vec!["finally"]);
    }

    #[tokio::test]
    async fn failure_fires_error_then_finally() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef =
            TaskFn::arc("bad", |_h: TaskHandle| async { Err::<(), _>(TaskError::fail("boom")) });
        let outcome = run(recording_spec(task, &log), CancellationToken::new()).await;

        assert!(matches!(outcome, TaskOutcome::Failed(TaskError::Fail { .. })));
        assert_eq!(*log.lock().unwrap(), vec!["error", "finally"]);
    }

    #[tokio::test]
    async fn cancel_from_body_fires_cancel_then_finally() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef = TaskFn::arc("self-cancel", |_h: TaskHandle| async {
            Err::<(), _>(TaskError::Canceled)
        });
        let outcome = run(recording_spec(task, &log), CancellationToken::new()).await;

        assert!(outcome.is_cancelled());
        assert_eq!(*log.lock().unwrap(), vec!["cancel", "finally"]);
    }

    #[tokio::test]
    async fn token_cancellation_interrupts_pending_body() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef = TaskFn::arc("forever", |_h: TaskHandle| async {
            futures::future::pending::<()>().await;
            Ok::<(), TaskError>(())
        });
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            canceller.cancel();
        });
        let outcome = run(recording_spec(task, &log), token).await;

        assert!(outcome.is_cancelled());
        assert_eq!(*log.lock().unwrap(), vec!["cancel", "finally"]);
    }

    #[tokio::test]
    async fn panicking_error_hook_still_runs_finally() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef =
            TaskFn::arc("bad", |_h: TaskHandle| async { Err::<(), _>(TaskError::fail("503")) });
        let f = log.clone();
        let spec = TaskSpec::new(task)
            .on_error(|_| panic!("hook exploded"))
            .on_finally(move || f.lock().unwrap().push("finally"));
        let outcome = run(spec, CancellationToken::new()).await;

        assert!(matches!(outcome, TaskOutcome::Failed(TaskError::Fail { .. })));
        assert_eq!(*log.lock().unwrap(), vec!["finally"]);
    }

    #[tokio::test]
    async fn panic_is_reported_as_fatal_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let task: TaskRef = TaskFn::arc("panics", |_h: TaskHandle| async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), TaskError>(())
        });
        let outcome = run(recording_spec(task, &log), CancellationToken::new()).await;

        match outcome {
            TaskOutcome::Failed(TaskError::Fatal { reason }) => assert!(reason.contains("kaboom")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["error", "finally"]);
    }
}
