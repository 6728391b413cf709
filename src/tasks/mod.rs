//! # Task abstractions and specifications.
//!
//! - [`Task`] trait for async cancelable units of work
//! - [`TaskFn`] closure-backed implementation
//! - [`TaskSpec`] task plus terminal hooks
//! - [`TaskHandle`] the body's access to cancellation and progress
//! - [`TaskState`], [`TaskSnapshot`], [`TaskOutcome`], [`Completion`]

mod handle;
mod spec;
mod state;
mod task;
mod task_fn;

pub(crate) use spec::Hooks;

pub use handle::TaskHandle;
pub use spec::{TaskSpec, TaskSpecBuilder};
pub use state::{Completion, INDETERMINATE, Message, TaskOutcome, TaskSnapshot, TaskState};
pub use task::{BoxTaskFuture, Task, TaskRef};
pub use task_fn::TaskFn;
