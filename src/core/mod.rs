//! Runtime core: task registry, execution and shutdown.
//!
//! The public API from this module is [`TaskSystem`] (with its builder and
//! configuration) and [`PipelineOutcome`].
//!
//! Internal modules:
//! - [`runner`]: executes one task with permit, cancellation, events and hooks;
//! - [`registry`]: the id-keyed set of in-flight tasks;
//! - [`system`]: submission, cancellation, snapshots, graceful shutdown;
//! - [`pipeline`]: strictly sequential stages on top of the system.

mod builder;
mod config;
mod pipeline;
mod registry;
mod runner;
mod system;

pub use builder::TaskSystemBuilder;
pub use config::SystemConfig;
pub use pipeline::PipelineOutcome;
pub use system::TaskSystem;
