//! Errors for network work and mirror resolution.
//!
//! [`FetchError`] classifies a single request failure as retryable (I/O,
//! connect/timeout, 5xx) or fatal (anything else). [`MirrorError`] is what a
//! caller sees once every source of a mirror list has been tried.

use thiserror::Error;

use crate::error::TaskError;
use crate::fetch::mirror::SourceKind;

/// # Errors produced by a single fetch attempt.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// Local or socket I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("unexpected http status {code}")]
    Status {
        /// HTTP status code.
        code: u16,
    },

    /// The HTTP client failed (connect, timeout, body decode...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The payload was received but could not be used.
    #[error("invalid response: {reason}")]
    Invalid {
        /// What was wrong with it.
        reason: String,
    },

    /// The caller's cancellation token fired.
    #[error("fetch cancelled")]
    Canceled,
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Io(_) => "fetch_io",
            FetchError::Status { .. } => "fetch_status",
            FetchError::Http(_) => "fetch_http",
            FetchError::Invalid { .. } => "fetch_invalid",
            FetchError::Canceled => "fetch_canceled",
        }
    }

    /// Network I/O failures and 5xx responses are worth another attempt.
    ///
    /// # Example
    /// ```
    /// use launchvisor::fetch::FetchError;
    ///
    /// assert!(FetchError::Status { code: 503 }.is_retryable());
    /// assert!(!FetchError::Status { code: 404 }.is_retryable());
    /// assert!(!FetchError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Io(_) => true,
            FetchError::Status { code } => (500..600).contains(code),
            FetchError::Http(e) => {
                e.is_connect()
                    || e.is_timeout()
                    || e.is_request()
                    || e.is_body()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            FetchError::Invalid { .. } | FetchError::Canceled => false,
        }
    }

    /// Returns `true` for [`FetchError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

impl From<FetchError> for TaskError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Canceled => TaskError::Canceled,
            e if e.is_retryable() => TaskError::fail(e.to_string()),
            e => TaskError::fatal(e.to_string()),
        }
    }
}

/// # Errors produced by mirror failover.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Every source was tried; carries the error of the last one that failed.
    #[error("all sources failed; last was {kind}: {cause}")]
    Exhausted {
        /// Which kind of source produced `cause`.
        kind: SourceKind,
        /// The last failure observed.
        #[source]
        cause: FetchError,
    },

    /// The source list was empty, or every source came back empty-handed.
    #[error("failed to retrieve information from any source")]
    NoSource,

    /// The caller's cancellation token fired.
    #[error("mirror resolution cancelled")]
    Canceled,
}

impl MirrorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MirrorError::Exhausted { .. } => "mirror_exhausted",
            MirrorError::NoSource => "mirror_no_source",
            MirrorError::Canceled => "mirror_canceled",
        }
    }

    /// Retryable only when the last source failed transiently.
    pub fn is_retryable(&self) -> bool {
        match self {
            MirrorError::Exhausted { cause, .. } => cause.is_retryable(),
            MirrorError::NoSource | MirrorError::Canceled => false,
        }
    }

    /// Returns `true` for [`MirrorError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, MirrorError::Canceled)
    }
}

impl From<MirrorError> for TaskError {
    fn from(err: MirrorError) -> Self {
        match err {
            MirrorError::Canceled => TaskError::Canceled,
            e if e.is_retryable() => TaskError::fail(e.to_string()),
            e => TaskError::fatal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let io = FetchError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(io.is_retryable());
        assert!(FetchError::Status { code: 500 }.is_retryable());
        assert!(!FetchError::Status { code: 429 }.is_retryable());
        assert!(!FetchError::Invalid { reason: "bad json".into() }.is_retryable());
    }

    #[test]
    fn converts_into_task_error() {
        assert!(TaskError::from(FetchError::Canceled).is_canceled());
        assert_eq!(
            TaskError::from(FetchError::Status { code: 502 }).as_label(),
            "task_failed"
        );
        assert_eq!(
            TaskError::from(FetchError::Status { code: 404 }).as_label(),
            "task_fatal"
        );
        assert!(TaskError::from(MirrorError::Canceled).is_canceled());
        assert_eq!(TaskError::from(MirrorError::NoSource).as_label(), "task_fatal");
    }

    #[test]
    fn exhausted_mirror_is_classified_by_its_last_cause() {
        let transient = MirrorError::Exhausted {
            kind: SourceKind::Bmclapi,
            cause: FetchError::Status { code: 503 },
        };
        let missing = MirrorError::Exhausted {
            kind: SourceKind::Official,
            cause: FetchError::Status { code: 404 },
        };
        assert!(transient.is_retryable());
        assert!(!missing.is_retryable());
        assert_eq!(TaskError::from(transient).as_label(), "task_failed");
        assert_eq!(TaskError::from(missing).as_label(), "task_fatal");
    }
}
