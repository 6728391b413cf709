//! # TaskSystem: registry of in-flight tasks, event fan-out and graceful shutdown.
//!
//! The [`TaskSystem`] is the explicit context object every entry point receives.
//! It owns the event bus, the task registry, the optional global concurrency
//! semaphore and the runtime cancellation token.
//!
//! ## Architecture
//! ```text
//! submit(spec) ──► Registry.insert(id) ──► tokio::spawn(executor)
//!                                            │
//!                                            ├─► runner::run_task()  (permit → body → hooks)
//!                                            ├─► Registry.remove_if(id, generation)
//!                                            ├─► publish(TaskRemoved)
//!                                            └─► Completion ◄── caller awaits
//!
//! Events:  runner / TaskHandle / TaskSystem ── publish ──► Bus ──► listener ──► SubscriberSet
//!
//! cancel(id)     ──► token(id).cancel()          (no waiting)
//! stop_all()     ──► every token.cancel()        (no waiting)
//! shutdown()     ──► stop accepting → cancel all → wait ≤ grace (joins, then empty registry)
//!                      ├─ all removed  → AllStoppedWithin
//!                      └─ timeout      → GraceExceeded + RuntimeError::GraceExceeded
//! ```
//!
//! ## Rules
//! - Task ids are unique among registered tasks ([`SubmitError::AlreadyRegistered`]).
//! - A task is removed from the registry by its own executor after its hooks ran
//!   and before its [`Completion`] resolves.
//! - Dropping the system stops the subscriber listener; running tasks are not
//!   awaited (call [`TaskSystem::shutdown`] for that).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

use crate::core::{config::SystemConfig, registry::Registry, runner::run_task};
use crate::error::{RuntimeError, SubmitError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::{Completion, TaskHandle, TaskSnapshot, TaskSpec};

/// Process-wide registry and executor of tasks.
pub struct TaskSystem {
    cfg: SystemConfig,
    bus: Bus,
    registry: Arc<Registry>,
    semaphore: Option<Arc<Semaphore>>,
    runtime_token: CancellationToken,
    listener_token: CancellationToken,
    closing: AtomicBool,
}

impl TaskSystem {
    pub(crate) fn new_internal(
        cfg: SystemConfig,
        bus: Bus,
        subs: SubscriberSet,
        semaphore: Option<Arc<Semaphore>>,
    ) -> Self {
        let listener_token = CancellationToken::new();
        if !subs.is_empty() {
            Self::subscriber_listener(&bus, subs, listener_token.clone());
        }
        Self {
            cfg,
            bus,
            registry: Arc::new(Registry::new()),
            semaphore,
            runtime_token: CancellationToken::new(),
            listener_token,
            closing: AtomicBool::new(false),
        }
    }

    /// Forwards bus events to the subscriber set until the system is dropped.
    fn subscriber_listener(bus: &Bus, subs: SubscriberSet, stop: CancellationToken) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => subs.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            subs.shutdown().await;
        });
    }

    /// Returns the configuration the system was built with.
    pub fn config(&self) -> &SystemConfig {
        &self.cfg
    }

    /// Creates a receiver observing all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Registers the task and starts executing it.
    ///
    /// The task's cancellation scope is a child of the system's runtime token.
    pub async fn submit(&self, spec: TaskSpec) -> Result<Completion, SubmitError> {
        let token = self.runtime_token.child_token();
        self.submit_with_token(spec, token).await
    }

    /// Like [`submit`](Self::submit), but the task is also cancelled when `parent` is.
    pub async fn submit_with_parent(
        &self,
        spec: TaskSpec,
        parent: &CancellationToken,
    ) -> Result<Completion, SubmitError> {
        self.submit_with_token(spec, parent.child_token()).await
    }

    async fn submit_with_token(
        &self,
        spec: TaskSpec,
        token: CancellationToken,
    ) -> Result<Completion, SubmitError> {
        if self.closing.load(Ordering::Acquire) {
            return Err(SubmitError::ShuttingDown);
        }

        let id: Arc<str> = Arc::from(spec.id());
        let handle = TaskHandle::new(id.clone(), token, Some(self.bus.clone()));
        let (done_tx, completion) = Completion::channel();

        let task = spec.task().clone();
        let hooks = spec.hooks.clone();
        let exec_handle = handle.clone();
        let registry = Arc::clone(&self.registry);
        let semaphore = self.semaphore.clone();
        let bus = self.bus.clone();

        self.registry
            .insert(handle, move |generation| {
                bus.publish(Event::new(EventKind::TaskSubmitted).with_task(id.clone()));
                async move {
                    let outcome = run_task(task, hooks, exec_handle, semaphore, &bus).await;
                    registry.remove_if(&id, generation).await;
                    bus.publish(Event::new(EventKind::TaskRemoved).with_task(id));
                    let _ = done_tx.send(outcome);
                }
            })
            .await?;

        Ok(completion)
    }

    /// Requests cooperative cancellation of one task; returns `false` if unknown.
    pub async fn cancel(&self, id: &str) -> bool {
        let found = self.registry.cancel(id).await;
        if found {
            self.bus
                .publish(Event::new(EventKind::CancelRequested).with_task(id));
        }
        found
    }

    /// Requests cancellation of every registered task without waiting.
    ///
    /// The system keeps accepting new submissions.
    pub async fn stop_all(&self) {
        let n = self.registry.cancel_all().await;
        if n > 0 {
            self.bus.publish(
                Event::new(EventKind::CancelRequested).with_reason(format!("stop_all: {n} tasks")),
            );
        }
    }

    /// Returns `true` if a task with this id is registered.
    pub async fn contains(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    /// Returns the current snapshot of one registered task.
    pub async fn snapshot(&self, id: &str) -> Option<TaskSnapshot> {
        self.registry.snapshot(id).await
    }

    /// Returns snapshots of every registered task, sorted by id.
    pub async fn list(&self) -> Vec<TaskSnapshot> {
        self.registry.snapshots().await
    }

    /// Stops accepting tasks, cancels all of them and waits up to `grace`.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] with the ids of tasks still
    /// registered when the grace period ran out.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.closing.store(true, Ordering::Release);
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.runtime_token.cancel();
        self.registry.cancel_all().await;

        let mut joins = self.registry.take_joins().await;
        let grace = self.cfg.grace;
        let registry = &self.registry;
        let all = async move {
            futures::future::join_all(joins.iter_mut().map(|(_, join)| join)).await;
            registry.wait_empty().await;
        };

        match tokio::time::timeout(grace, all).await {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let stuck = self.registry.ids().await;
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")),
                );
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

impl Drop for TaskSystem {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}
