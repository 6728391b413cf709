use std::path::PathBuf;

use thiserror::Error;

use crate::error::{SubmitError, TaskError};

/// Failure reported by a [`VersionCatalog`](crate::cleanup::VersionCatalog).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CatalogError {
    /// Human-readable cause.
    pub reason: String,
}

impl CatalogError {
    /// Creates a catalog error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by the asset cleaner.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CleanupError {
    /// Some redundant files could not be removed; the others stay deleted.
    #[error("failed to delete {} file(s)", files.len())]
    PartialDeletion {
        /// Files that are still on disk.
        files: Vec<PathBuf>,
    },

    /// The version catalog could not list versions or their files.
    #[error("version catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Filesystem failure while collecting files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage could not be registered with the task system.
    #[error("stage rejected: {0}")]
    Submit(#[from] SubmitError),

    /// A stage failed without a more specific cause (e.g. it panicked).
    #[error("stage {stage} failed: {source}")]
    Stage {
        /// Stage id.
        stage: String,
        /// The stage's error.
        source: TaskError,
    },

    /// The run was cancelled; nothing after the cancelled stage ran.
    #[error("cleanup cancelled")]
    Canceled,
}

impl CleanupError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CleanupError::PartialDeletion { .. } => "cleanup_partial_deletion",
            CleanupError::Catalog(_) => "cleanup_catalog",
            CleanupError::Io(_) => "cleanup_io",
            CleanupError::Submit(_) => "cleanup_submit",
            CleanupError::Stage { .. } => "cleanup_stage",
            CleanupError::Canceled => "cleanup_canceled",
        }
    }
}

impl From<&CleanupError> for TaskError {
    fn from(err: &CleanupError) -> Self {
        match err {
            CleanupError::Canceled => TaskError::Canceled,
            CleanupError::Stage { source, .. } => source.clone(),
            e => TaskError::fail(e.to_string()),
        }
    }
}

impl From<CleanupError> for TaskError {
    fn from(err: CleanupError) -> Self {
        TaskError::from(&err)
    }
}
