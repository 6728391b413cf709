use thiserror::Error;

use crate::error::TaskError;

/// # Errors produced by the installer subprocess manager.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InstallerError {
    /// Every runtime of the chain ran the installer and none exited with 0.
    #[error("all {attempts} runtimes exhausted; last exit code {exit_code}")]
    RuntimesExhausted {
        /// Exit code of the last attempt.
        exit_code: i32,
        /// Number of attempts made.
        attempts: u32,
    },

    /// The installer process could not be started.
    #[error("failed to start installer with runtime {runtime}: {source}")]
    Spawn {
        /// Runtime name.
        runtime: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// The local signal channel could not be bound or read.
    #[error("signal channel error: {0}")]
    Channel(#[from] std::io::Error),

    /// The runtime chain was empty.
    #[error("no runtime available to run the installer")]
    EmptyChain,

    /// The caller's cancellation token fired.
    #[error("installer cancelled")]
    Canceled,
}

impl InstallerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InstallerError::RuntimesExhausted { .. } => "installer_runtimes_exhausted",
            InstallerError::Spawn { .. } => "installer_spawn",
            InstallerError::Channel(_) => "installer_channel",
            InstallerError::EmptyChain => "installer_empty_chain",
            InstallerError::Canceled => "installer_canceled",
        }
    }
}

impl From<InstallerError> for TaskError {
    fn from(err: InstallerError) -> Self {
        match err {
            InstallerError::Canceled => TaskError::Canceled,
            e @ (InstallerError::RuntimesExhausted { .. } | InstallerError::EmptyChain) => {
                TaskError::fatal(e.to_string())
            }
            e => TaskError::fail(e.to_string()),
        }
    }
}
