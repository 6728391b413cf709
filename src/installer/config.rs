//! # Installer subprocess configuration.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Default loopback port the installer reports its exit code to.
pub const SIGNAL_PORT: u16 = 53151;

/// Configuration for an [`InstallerRunner`](crate::installer::InstallerRunner).
#[derive(Clone, Debug)]
pub struct InstallerConfig {
    /// Address the signal channel binds for each attempt.
    ///
    /// Port `0` binds an ephemeral port; the bound address is handed to the
    /// launcher either way.
    pub signal_addr: SocketAddr,

    /// Interval of the "is another installer still running" poll.
    pub poll_interval: Duration,
}

impl Default for InstallerConfig {
    /// - `signal_addr = 127.0.0.1:53151`
    /// - `poll_interval = 100ms`
    fn default() -> Self {
        Self {
            signal_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, SIGNAL_PORT)),
            poll_interval: Duration::from_millis(100),
        }
    }
}
