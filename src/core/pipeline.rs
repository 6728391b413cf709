//! # Sequential task pipeline.
//!
//! Runs a list of stage specs one after another through the [`TaskSystem`],
//! so every stage is registered, cancellable and progress-reporting on its own.
//!
//! ```text
//! stage[0] ──ok──► stage[1] ──ok──► ... ──ok──► Completed
//!    │                │
//!    ├─ failed ──► Failed { stage, error }   (later stages never start)
//!    └─ cancelled ► Cancelled { stage }
//! ```

use tokio_util::sync::CancellationToken;

use crate::core::system::TaskSystem;
use crate::error::{SubmitError, TaskError};
use crate::tasks::{TaskOutcome, TaskSpec};

/// Result of [`TaskSystem::run_pipeline`].
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Every stage completed.
    Completed,
    /// A stage failed; no later stage ran.
    Failed {
        /// Id of the failing stage.
        stage: String,
        /// The stage's error.
        error: TaskError,
    },
    /// Cancellation was observed at (or before) this stage.
    Cancelled {
        /// Id of the stage that was cancelled or never started.
        stage: String,
    },
}

impl PipelineOutcome {
    /// Returns `true` for [`PipelineOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }

    /// Converts into a `Result`, mapping cancellation to [`TaskError::Canceled`].
    pub fn into_result(self) -> Result<(), TaskError> {
        match self {
            PipelineOutcome::Completed => Ok(()),
            PipelineOutcome::Failed { error, .. } => Err(error),
            PipelineOutcome::Cancelled { .. } => Err(TaskError::Canceled),
        }
    }
}

impl TaskSystem {
    /// Runs `stages` strictly in order, each as a task that is a child of `token`.
    ///
    /// Stops at the first failure or cancellation. Returns `Err` only when a
    /// stage could not be submitted.
    pub async fn run_pipeline(
        &self,
        stages: Vec<TaskSpec>,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, SubmitError> {
        for spec in stages {
            let stage = spec.id().to_string();
            if token.is_cancelled() {
                return Ok(PipelineOutcome::Cancelled { stage });
            }

            let completion = self.submit_with_parent(spec, token).await?;
            match completion.wait().await {
                TaskOutcome::Completed => {}
                TaskOutcome::Failed(error) => return Ok(PipelineOutcome::Failed { stage, error }),
                TaskOutcome::Cancelled => return Ok(PipelineOutcome::Cancelled { stage }),
            }
        }
        Ok(PipelineOutcome::Completed)
    }
}
