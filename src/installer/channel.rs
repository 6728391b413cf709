//! # Loopback datagram channel carrying the installer's exit code.
//!
//! The installer side sends one datagram whose payload is the ASCII exit code
//! ([`report_exit_code`]). The launcher side binds a [`SignalChannel`] per
//! attempt and closes it before the next attempt binds again.
//!
//! A payload that does not parse as an integer counts as exit code `0`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

const MAX_DATAGRAM: usize = 1024;

/// Single-owner listener for one installer attempt.
#[derive(Debug)]
pub struct SignalChannel {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl SignalChannel {
    /// Binds the listener. Fails if another channel still holds the address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let addr = socket.local_addr()?;
        tracing::debug!(%addr, "signal channel bound");
        Ok(Self { socket, addr })
    }

    /// The address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the next datagram and decodes it as an exit code.
    pub async fn recv_code(&self) -> io::Result<i32> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        let code = parse_exit_code(&buf[..n]);
        tracing::info!(%from, code, "received installer exit code");
        Ok(code)
    }

    /// Returns an already-queued exit code without waiting.
    pub fn try_recv_code(&self) -> Option<i32> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.try_recv_from(&mut buf) {
            Ok((n, _)) => Some(parse_exit_code(&buf[..n])),
            Err(_) => None,
        }
    }

    /// Releases the socket.
    pub fn close(self) {
        tracing::debug!(addr = %self.addr, "signal channel closed");
    }
}

/// Decodes an ASCII exit code; anything unparsable is `0`.
pub fn parse_exit_code(payload: &[u8]) -> i32 {
    std::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(|| {
            tracing::warn!(?payload, "unparsable exit code payload, assuming 0");
            0
        })
}

/// Sends `code` to the launcher's signal channel at `addr`.
pub async fn report_exit_code(addr: SocketAddr, code: i32) -> io::Result<()> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::LOCALHOST, 0).into()
    } else {
        (std::net::Ipv6Addr::LOCALHOST, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.send_to(code.to_string().as_bytes(), addr).await?;
    tracing::info!(%addr, code, "reported exit code");
    Ok(())
}
