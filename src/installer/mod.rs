//! # Installer subprocess lifecycle.
//!
//! Runs a secondary installer process (e.g. a mod loader installer) and learns
//! its exit code over a loopback datagram channel. A non-zero code retries with
//! the next runtime of a [`RuntimeChain`].
//!
//! - [`InstallerRunner`] the retry loop, one active run at a time.
//! - [`SignalChannel`] / [`report_exit_code`] both ends of the exit-code channel.
//! - [`Launcher`] process start seam, [`ProcessLauncher`] for real children.

mod channel;
mod config;
mod error;
mod launcher;
mod runner;
mod runtime;

pub use channel::{SignalChannel, parse_exit_code, report_exit_code};
pub use config::{InstallerConfig, SIGNAL_PORT};
pub use error::InstallerError;
pub use launcher::{LaunchRequest, Launcher, ProcessExit, ProcessLauncher, SIGNAL_ADDR_ENV};
pub use runner::{InstallReport, InstallerJob, InstallerRunner};
pub use runtime::{JAVA_UPGRADE_ORDER, Runtime, RuntimeChain};
