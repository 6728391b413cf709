//! # Launching the installer process.
//!
//! [`Launcher`] is the seam between the retry loop and the platform:
//! [`ProcessLauncher`] spawns a child with `tokio::process`, tests plug in a
//! scripted launcher.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::process::Command;

use crate::installer::runtime::Runtime;

/// Environment variable carrying the signal channel address to the installer.
pub const SIGNAL_ADDR_ENV: &str = "LAUNCHVISOR_SIGNAL_ADDR";

/// Resolves when the launched process is gone.
///
/// Yields the process exit code, or `None` if it was terminated by a signal
/// or could not be awaited. Dropping it stops the process.
pub type ProcessExit = BoxFuture<'static, Option<i32>>;

/// One installer launch.
#[derive(Clone, Debug)]
pub struct LaunchRequest {
    /// Runtime executing the installer.
    pub runtime: Runtime,
    /// Full argument list, prefix arguments included.
    pub args: Vec<String>,
    /// Working directory, inherited when `None`.
    pub work_dir: Option<PathBuf>,
    /// Where the installer reports its exit code.
    pub signal_addr: SocketAddr,
}

/// Starts installer processes.
#[async_trait]
pub trait Launcher: Send + Sync + 'static {
    /// Starts the process and returns a future tracking its death.
    async fn launch(&self, req: &LaunchRequest) -> std::io::Result<ProcessExit>;

    /// True while a process started by this launcher is still alive.
    async fn is_busy(&self) -> bool;
}

/// [`Launcher`] backed by `tokio::process`.
#[derive(Debug, Default)]
pub struct ProcessLauncher {
    live: Arc<AtomicUsize>,
}

impl ProcessLauncher {
    /// Creates a launcher with no live process.
    pub fn new() -> Self {
        Self::default()
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, req: &LaunchRequest) -> std::io::Result<ProcessExit> {
        let mut cmd = Command::new(req.runtime.executable());
        cmd.args(&req.args)
            .env(SIGNAL_ADDR_ENV, req.signal_addr.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &req.work_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        let guard = LiveGuard::enter(&self.live);
        tracing::info!(
            runtime = %req.runtime,
            pid = ?child.id(),
            "installer process started"
        );

        Ok(Box::pin(async move {
            let _guard = guard;
            match child.wait().await {
                Ok(status) => {
                    tracing::debug!(?status, "installer process exited");
                    status.code()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to wait for installer process");
                    None
                }
            }
        }))
    }

    async fn is_busy(&self) -> bool {
        self.live.load(Ordering::SeqCst) > 0
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> LaunchRequest {
        LaunchRequest {
            runtime: Runtime::new("sh", 0, "/bin/sh"),
            args: vec!["-c".into(), script.into()],
            work_dir: None,
            signal_addr: ([127, 0, 0, 1], 9).into(),
        }
    }

    #[tokio::test]
    async fn reports_exit_code_and_busy_state() {
        let launcher = ProcessLauncher::new();
        assert!(!launcher.is_busy().await);

        let exit = launcher.launch(&shell("exit 3")).await.unwrap();
        assert!(launcher.is_busy().await);
        assert_eq!(exit.await, Some(3));
        assert!(!launcher.is_busy().await);
    }

    #[tokio::test]
    async fn passes_signal_address() {
        let launcher = ProcessLauncher::new();
        let exit = launcher
            .launch(&shell("test \"$LAUNCHVISOR_SIGNAL_ADDR\" = 127.0.0.1:9"))
            .await
            .unwrap();
        assert_eq!(exit.await, Some(0));
    }

    #[tokio::test]
    async fn dropping_the_exit_future_releases_the_slot() {
        let launcher = ProcessLauncher::new();
        let exit = launcher.launch(&shell("sleep 30")).await.unwrap();
        assert!(launcher.is_busy().await);
        drop(exit);
        assert!(!launcher.is_busy().await);
    }

    #[tokio::test]
    async fn missing_executable_is_an_error() {
        let launcher = ProcessLauncher::new();
        let mut req = shell("true");
        req.runtime = Runtime::new("missing", 0, "/nonexistent/bin/java");
        assert!(launcher.launch(&req).await.is_err());
        assert!(!launcher.is_busy().await);
    }
}
