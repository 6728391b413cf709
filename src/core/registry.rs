//! # Task registry: the live set of submitted tasks, keyed by id.
//!
//! The registry owns one [`Entry`] per registered task (its [`TaskHandle`] and
//! the join handle of its executor). Entries are removed by the executor itself
//! when the task completes.
//!
//! ## Rules
//! - Ids are unique among registered tasks; re-submitting after removal is fine.
//! - Insertion spawns the executor while the write lock is held, so a task that
//!   finishes instantly cannot try to remove itself before it was inserted.
//! - Removal is generation-checked: a finished executor never removes a newer
//!   task that reused its id.
//! - Cancellation never awaits the task (cancel is a signal, not a join).

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::error::SubmitError;
use crate::tasks::{TaskHandle, TaskSnapshot};

struct Entry {
    generation: u64,
    handle: TaskHandle,
    join: Option<JoinHandle<()>>,
}

/// Registry of in-flight tasks.
pub(crate) struct Registry {
    tasks: RwLock<HashMap<String, Entry>>,
    next_generation: AtomicU64,
    len: watch::Sender<usize>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            len: watch::Sender::new(0),
        }
    }

    /// Registers `handle` and spawns the executor built by `make`.
    ///
    /// `make` receives the entry's generation so the executor can remove
    /// exactly its own entry later.
    pub(crate) async fn insert<F, Fut>(&self, handle: TaskHandle, make: F) -> Result<(), SubmitError>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(handle.id()) {
            return Err(SubmitError::AlreadyRegistered {
                id: handle.id().to_string(),
            });
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let join = tokio::spawn(make(generation));
        tasks.insert(
            handle.id().to_string(),
            Entry {
                generation,
                handle,
                join: Some(join),
            },
        );
        self.len.send_replace(tasks.len());
        Ok(())
    }

    /// Removes the entry for `id` if it still belongs to `generation`.
    pub(crate) async fn remove_if(&self, id: &str, generation: u64) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get(id) {
            Some(entry) if entry.generation == generation => {
                tasks.remove(id);
                self.len.send_replace(tasks.len());
                true
            }
            _ => false,
        }
    }

    /// Signals cancellation to one task; returns `false` if it is not registered.
    pub(crate) async fn cancel(&self, id: &str) -> bool {
        let tasks = self.tasks.read().await;
        match tasks.get(id) {
            Some(entry) => {
                entry.handle.token().cancel();
                true
            }
            None => false,
        }
    }

    /// Signals cancellation to every registered task without waiting.
    pub(crate) async fn cancel_all(&self) -> usize {
        let tasks = self.tasks.read().await;
        for entry in tasks.values() {
            entry.handle.token().cancel();
        }
        tasks.len()
    }

    pub(crate) async fn contains(&self, id: &str) -> bool {
        self.tasks.read().await.contains_key(id)
    }

    pub(crate) async fn snapshot(&self, id: &str) -> Option<TaskSnapshot> {
        self.tasks.read().await.get(id).map(|e| e.handle.snapshot())
    }

    /// Returns snapshots of all registered tasks, sorted by id.
    pub(crate) async fn snapshots(&self) -> Vec<TaskSnapshot> {
        let tasks = self.tasks.read().await;
        let mut out: Vec<TaskSnapshot> = tasks.values().map(|e| e.handle.snapshot()).collect();
        out.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Returns sorted ids of all registered tasks.
    pub(crate) async fn ids(&self) -> Vec<String> {
        let tasks = self.tasks.read().await;
        let mut ids: Vec<String> = tasks.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Resolves once no task is registered.
    ///
    /// Unlike joining executors, this also covers tasks whose join handle was
    /// already taken by an earlier shutdown.
    pub(crate) async fn wait_empty(&self) {
        let mut len = self.len.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = len.wait_for(|n| *n == 0).await;
    }

    /// Takes the join handles of every registered executor (entries stay registered).
    ///
    /// Used by shutdown; executors still remove their own entries on exit.
    pub(crate) async fn take_joins(&self) -> Vec<(String, JoinHandle<()>)> {
        let mut tasks = self.tasks.write().await;
        tasks
            .iter_mut()
            .filter_map(|(id, entry)| entry.join.take().map(|j| (id.clone(), j)))
            .collect()
    }
}
