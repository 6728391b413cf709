//! # LogWriter: events to `tracing`
//!
//! A subscriber that renders incoming [`Event`]s as `tracing` records.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  launchvisor::log: submitted task="GameAssetCleaner.CollectFiles"
//! DEBUG launchvisor::log: progress task="GameAssetCleaner.Cleanup" progress=0.42 msg="Cleaning foo.jar"
//! WARN  launchvisor::log: failed task="download.client" err="execution failed: 503"
//! INFO  launchvisor::log: cancelled task="download.client"
//! WARN  launchvisor::log: grace-exceeded stuck="download.client"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::TaskSubmitted => info!(target: "launchvisor::log", task, "submitted"),
            EventKind::TaskStarting => info!(target: "launchvisor::log", task, "starting"),
            EventKind::TaskProgress => debug!(
                target: "launchvisor::log",
                task,
                progress = e.progress.unwrap_or(-1.0),
                msg = reason,
                "progress"
            ),
            EventKind::TaskCompleted => info!(target: "launchvisor::log", task, "completed"),
            EventKind::TaskFailed => warn!(target: "launchvisor::log", task, err = reason, "failed"),
            EventKind::TaskCancelled => info!(target: "launchvisor::log", task, "cancelled"),
            EventKind::CancelRequested => {
                debug!(target: "launchvisor::log", task, "cancel-requested")
            }
            EventKind::TaskRemoved => debug!(target: "launchvisor::log", task, "removed"),
            EventKind::ShutdownRequested => info!(target: "launchvisor::log", "shutdown-requested"),
            EventKind::AllStoppedWithin => {
                info!(target: "launchvisor::log", "all-stopped-within-grace")
            }
            EventKind::GraceExceeded => {
                warn!(target: "launchvisor::log", stuck = reason, "grace-exceeded")
            }
            EventKind::SubscriberOverflow => warn!(
                target: "launchvisor::log",
                subscriber = task,
                reason,
                "subscriber-overflow"
            ),
            EventKind::SubscriberPanicked => error!(
                target: "launchvisor::log",
                subscriber = task,
                info = reason,
                "subscriber-panicked"
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
