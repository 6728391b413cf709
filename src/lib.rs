//! # launchvisor
//!
//! **Launchvisor** is the task orchestration and resource-lifecycle core of a
//! game launcher.
//!
//! It runs cancellable, progress-reporting background tasks and provides the
//! building blocks those tasks are made of: retry with backoff, mirror
//! failover, a bounded worker-pool scanner, an installer subprocess manager
//! that walks a runtime chain, and a reachability GC for shared assets.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   TaskSpec   │   │   TaskSpec   │   │   TaskSpec   │
//!     │ (download)   │   │ (installer)  │   │  (asset GC)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskSystem                                                       │
//! │  - Registry (id -> handle, generation-checked removal)            │
//! │  - Semaphore (optional global concurrency cap)                    │
//! │  - Bus (broadcast events) ──► SubscriberSet (per-sub queues)      │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   runner::run_task   runner::run_task   runner::run_task
//!   permit ─► Running ─► body ─► Completed ─► on_error | on_cancel ─► on_finally
//! ```
//!
//! Task bodies get a [`TaskHandle`] (cancellation token + progress) and use
//! the domain modules:
//!
//! | Module          | Description                                                   | Key items                                      |
//! |-----------------|---------------------------------------------------------------|------------------------------------------------|
//! | [`fetch`]       | Retry with backoff, sequential mirror failover, BMCLAPI URLs. | [`with_retry`], [`fetch::resolve`]             |
//! | [`scan`]        | Bounded worker pool; one result per item, panics contained.   | [`scan::scan_all`], [`scan::scan_directory`]   |
//! | [`installer`]   | Installer subprocess with exit code over loopback datagram.   | [`installer::InstallerRunner`]                 |
//! | [`cleanup`]     | Four-stage asset reachability GC.                             | [`cleanup::AssetCleaner`]                      |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use launchvisor::{LogWriter, Subscribe, SystemConfig, TaskError, TaskHandle, TaskSpec, TaskSystem};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let system = TaskSystem::builder(SystemConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let spec = TaskSpec::builder("download.client")
//!         .on_error(|e| eprintln!("download failed: {e}"))
//!         .build(|handle: TaskHandle| async move {
//!             handle.update_progress_with(0.5, "downloading {0}", ["client.jar"]);
//!             handle.ensure_active()?;
//!             Ok::<(), TaskError>(())
//!         });
//!
//!     let done = system.submit(spec).await?;
//!     assert!(done.wait().await.is_completed());
//!
//!     system.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

pub mod cleanup;
pub mod fetch;
pub mod installer;
pub mod scan;

// ---- Public re-exports ----

pub use core::{PipelineOutcome, SystemConfig, TaskSystem, TaskSystemBuilder};
pub use error::{RuntimeError, SubmitError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use fetch::with_retry;
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{
    BoxTaskFuture, Completion, INDETERMINATE, Message, Task, TaskFn, TaskHandle, TaskOutcome,
    TaskRef, TaskSnapshot, TaskSpec, TaskSpecBuilder, TaskState,
};
