use std::sync::Arc;
use tokio::sync;

use super::{config::SystemConfig, system::TaskSystem};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`TaskSystem`].
pub struct TaskSystemBuilder {
    cfg: SystemConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl TaskSystemBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SystemConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive task lifecycle events through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the task system.
    ///
    /// Must be called from within a tokio runtime (subscriber workers are spawned here).
    pub fn build(self) -> Arc<TaskSystem> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(sync::Semaphore::new)
            .map(Arc::new);

        Arc::new(TaskSystem::new_internal(self.cfg, bus, subs, semaphore))
    }
}

impl TaskSystem {
    /// Returns a builder for a task system with the given configuration.
    pub fn builder(cfg: SystemConfig) -> TaskSystemBuilder {
        TaskSystemBuilder::new(cfg)
    }
}
