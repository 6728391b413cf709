//! # Running an installer across a chain of runtimes.
//!
//! For each runtime of the [`RuntimeChain`], in order:
//!
//! ```text
//! wait_until_idle ─► bind SignalChannel ─► launch ─► first of:
//!                                                   ├─ datagram: exit code
//!                                                   ├─ process death: queued datagram, else process code, else -1
//!                                                   └─ cancel: stop
//! code == 0 ─► done
//! code != 0 ─► close channel, next runtime (RuntimesExhausted after the last)
//! ```
//!
//! Only one run is active per [`InstallerRunner`]; the channel is bound before
//! the process starts and closed before the next attempt binds again.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::installer::channel::SignalChannel;
use crate::installer::config::InstallerConfig;
use crate::installer::error::InstallerError;
use crate::installer::launcher::{LaunchRequest, Launcher};
use crate::installer::runtime::{Runtime, RuntimeChain};

type PrefixFn = Arc<dyn Fn(&Runtime) -> Option<String> + Send + Sync>;

/// Installer invocation, independent of the runtime executing it.
#[derive(Clone)]
pub struct InstallerJob {
    args: Vec<String>,
    work_dir: Option<PathBuf>,
    prefix_args: Option<PrefixFn>,
}

impl InstallerJob {
    /// Job with the installer's own arguments.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            work_dir: None,
            prefix_args: None,
        }
    }

    /// Sets the working directory.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Sets a per-runtime prefix, split on whitespace and placed before the
    /// installer arguments.
    pub fn with_prefix_args<F>(mut self, f: F) -> Self
    where
        F: Fn(&Runtime) -> Option<String> + Send + Sync + 'static,
    {
        self.prefix_args = Some(Arc::new(f));
        self
    }

    /// Full argument list for `runtime`.
    pub fn args_for(&self, runtime: &Runtime) -> Vec<String> {
        let prefix = self.prefix_args.as_ref().and_then(|f| f(runtime));
        prefix
            .iter()
            .flat_map(|p| p.split_whitespace().map(str::to_owned))
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Debug for InstallerJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerJob")
            .field("args", &self.args)
            .field("work_dir", &self.work_dir)
            .field("prefix_args", &self.prefix_args.is_some())
            .finish()
    }
}

/// Successful installer run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallReport {
    /// Runtime whose attempt exited with 0.
    pub runtime: Runtime,
    /// Attempts made, the successful one included.
    pub attempts: u32,
}

/// Runs installers, one at a time, walking the runtime chain on failure.
pub struct InstallerRunner {
    cfg: InstallerConfig,
    launcher: Arc<dyn Launcher>,
    session: Mutex<()>,
}

enum Signal {
    Code(i32),
    Died(Option<i32>),
    ChannelFailed(std::io::Error),
    Canceled,
}

impl InstallerRunner {
    /// Creates a runner over `launcher`.
    pub fn new(cfg: InstallerConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            cfg,
            launcher,
            session: Mutex::new(()),
        }
    }

    /// Runs `job` with each runtime of `chain` until one exits with 0.
    ///
    /// Returns [`InstallerError::RuntimesExhausted`] with the last exit code
    /// once the chain is used up.
    pub async fn run_with_retry(
        &self,
        job: &InstallerJob,
        chain: &RuntimeChain,
        token: &CancellationToken,
    ) -> Result<InstallReport, InstallerError> {
        if chain.is_empty() {
            return Err(InstallerError::EmptyChain);
        }
        let _session = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(InstallerError::Canceled),
            guard = self.session.lock() => guard,
        };

        let mut attempts = 0u32;
        let mut last_code = 0;
        for runtime in chain {
            self.wait_until_idle(token).await?;
            attempts += 1;

            let code = self.attempt(job, runtime, token).await?;
            if code == 0 {
                tracing::info!(runtime = %runtime, attempts, "installer succeeded");
                return Ok(InstallReport {
                    runtime: runtime.clone(),
                    attempts,
                });
            }
            last_code = code;
            match chain.next_after(runtime) {
                Some(next) => tracing::info!(
                    failed = %runtime,
                    next = %next,
                    exit_code = code,
                    "installer failed, switching runtime"
                ),
                None => tracing::warn!(
                    failed = %runtime,
                    exit_code = code,
                    "installer failed on the last runtime"
                ),
            }
        }

        Err(InstallerError::RuntimesExhausted {
            exit_code: last_code,
            attempts,
        })
    }

    async fn wait_until_idle(&self, token: &CancellationToken) -> Result<(), InstallerError> {
        loop {
            if token.is_cancelled() {
                return Err(InstallerError::Canceled);
            }
            if !self.launcher.is_busy().await {
                return Ok(());
            }
            tracing::debug!("another installer process is running, waiting");
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(InstallerError::Canceled),
                _ = tokio::time::sleep(self.cfg.poll_interval) => {}
            }
        }
    }

    async fn attempt(
        &self,
        job: &InstallerJob,
        runtime: &Runtime,
        token: &CancellationToken,
    ) -> Result<i32, InstallerError> {
        let channel = SignalChannel::bind(self.cfg.signal_addr).await?;
        let req = LaunchRequest {
            runtime: runtime.clone(),
            args: job.args_for(runtime),
            work_dir: job.work_dir.clone(),
            signal_addr: channel.local_addr(),
        };

        let exit = match self.launcher.launch(&req).await {
            Ok(exit) => exit,
            Err(source) => {
                channel.close();
                return Err(InstallerError::Spawn {
                    runtime: runtime.name().to_owned(),
                    source,
                });
            }
        };

        let signal = tokio::select! {
            biased;
            _ = token.cancelled() => Signal::Canceled,
            code = channel.recv_code() => match code {
                Ok(code) => Signal::Code(code),
                Err(e) => Signal::ChannelFailed(e),
            },
            status = exit => Signal::Died(status),
        };

        let result = match signal {
            Signal::Code(code) => Ok(code),
            Signal::Died(status) => {
                let code = channel.try_recv_code().or(status).unwrap_or(-1);
                tracing::debug!(?status, code, "installer process exited before signalling");
                Ok(code)
            }
            Signal::ChannelFailed(e) => Err(InstallerError::Channel(e)),
            Signal::Canceled => Err(InstallerError::Canceled),
        };
        channel.close();
        result
    }
}

impl fmt::Debug for InstallerRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerRunner")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::installer::channel::report_exit_code;
    use crate::installer::launcher::ProcessExit;

    #[derive(Clone, Copy)]
    enum Report {
        Datagram(i32),
        ExitOnly(i32),
        Hang,
    }

    #[derive(Default)]
    struct ScriptedLauncher {
        script: std::sync::Mutex<VecDeque<Report>>,
        launched: std::sync::Mutex<Vec<LaunchRequest>>,
        busy_polls: AtomicUsize,
    }

    impl ScriptedLauncher {
        fn new(script: impl IntoIterator<Item = Report>) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into_iter().collect()),
                ..Default::default()
            })
        }

        fn launched(&self) -> Vec<LaunchRequest> {
            self.launched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Launcher for ScriptedLauncher {
        async fn launch(&self, req: &LaunchRequest) -> std::io::Result<ProcessExit> {
            self.launched.lock().unwrap().push(req.clone());
            let next = self.script.lock().unwrap().pop_front().unwrap_or(Report::Hang);
            let addr = req.signal_addr;
            Ok(match next {
                Report::Datagram(code) => {
                    tokio::spawn(async move {
                        let _ = report_exit_code(addr, code).await;
                    });
                    Box::pin(futures::future::pending::<Option<i32>>())
                }
                Report::ExitOnly(code) => Box::pin(async move { Some(code) }),
                Report::Hang => Box::pin(futures::future::pending::<Option<i32>>()),
            })
        }

        async fn is_busy(&self) -> bool {
            let left = self.busy_polls.load(Ordering::SeqCst);
            if left == 0 {
                return false;
            }
            self.busy_polls.store(left - 1, Ordering::SeqCst);
            true
        }
    }

    fn cfg() -> InstallerConfig {
        InstallerConfig {
            signal_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            poll_interval: Duration::from_millis(100),
        }
    }

    fn java_chain() -> RuntimeChain {
        let homes = [8, 17, 21]
            .into_iter()
            .map(|m| (m, PathBuf::from(format!("/runtimes/{m}"))))
            .collect::<BTreeMap<_, _>>();
        RuntimeChain::java_from(8, &homes)
    }

    #[tokio::test]
    async fn walks_runtimes_until_success() {
        let launcher = ScriptedLauncher::new([Report::Datagram(1), Report::Datagram(1), Report::Datagram(0)]);
        let runner = InstallerRunner::new(cfg(), launcher.clone());

        let report = runner
            .run_with_retry(&InstallerJob::new(["--install"]), &java_chain(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.runtime.major_version(), 21);
        let majors: Vec<u32> = launcher
            .launched()
            .iter()
            .map(|r| r.runtime.major_version())
            .collect();
        assert_eq!(majors, vec![8, 17, 21]);
    }

    #[tokio::test]
    async fn exhausted_chain_keeps_last_code() {
        let launcher = ScriptedLauncher::new([Report::Datagram(3), Report::Datagram(5), Report::Datagram(7)]);
        let runner = InstallerRunner::new(cfg(), launcher);

        let err = runner
            .run_with_retry(&InstallerJob::new(["--install"]), &java_chain(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InstallerError::RuntimesExhausted { exit_code: 7, attempts: 3 }
        ));
    }

    #[tokio::test]
    async fn process_exit_without_datagram_uses_process_code() {
        let launcher = ScriptedLauncher::new([Report::ExitOnly(9), Report::ExitOnly(0)]);
        let runner = InstallerRunner::new(cfg(), launcher);

        let report = runner
            .run_with_retry(&InstallerJob::new(["--install"]), &java_chain(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.runtime.major_version(), 17);
    }

    #[tokio::test]
    async fn prefix_args_depend_on_runtime() {
        let launcher = ScriptedLauncher::new([Report::Datagram(1), Report::Datagram(0)]);
        let runner = InstallerRunner::new(cfg(), launcher.clone());
        let job = InstallerJob::new(["--install", "/tmp/forge"]).with_prefix_args(|rt| {
            (rt.major_version() >= 9).then(|| "--add-exports a/b=ALL-UNNAMED".to_owned())
        });

        runner
            .run_with_retry(&job, &java_chain(), &CancellationToken::new())
            .await
            .unwrap();

        let launched = launcher.launched();
        assert_eq!(launched[0].args, vec!["--install", "/tmp/forge"]);
        assert_eq!(
            launched[1].args,
            vec!["--add-exports", "a/b=ALL-UNNAMED", "--install", "/tmp/forge"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_running_installer() {
        let launcher = ScriptedLauncher::new([Report::ExitOnly(0)]);
        launcher.busy_polls.store(3, Ordering::SeqCst);
        let runner = InstallerRunner::new(cfg(), launcher.clone());

        let started = tokio::time::Instant::now();
        runner
            .run_with_retry(&InstallerJob::new(["--install"]), &java_chain(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(launcher.launched().len(), 1);
    }

    #[tokio::test]
    async fn cancel_stops_waiting_for_signal() {
        let launcher = ScriptedLauncher::new([Report::Hang]);
        let runner = Arc::new(InstallerRunner::new(cfg(), launcher));
        let token = CancellationToken::new();

        let run = {
            let runner = Arc::clone(&runner);
            let token = token.clone();
            tokio::spawn(async move {
                runner
                    .run_with_retry(&InstallerJob::new(["--install"]), &java_chain(), &token)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let err = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, InstallerError::Canceled));
    }

    #[tokio::test]
    async fn empty_chain_is_rejected() {
        let runner = InstallerRunner::new(cfg(), ScriptedLauncher::new(Vec::<Report>::new()));
        let err = runner
            .run_with_retry(&InstallerJob::new(["--install"]), &RuntimeChain::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InstallerError::EmptyChain));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_process_exit_code_is_reported() {
        let runner = InstallerRunner::new(cfg(), Arc::new(crate::installer::ProcessLauncher::new()));
        let chain = RuntimeChain::new(vec![Runtime::new("sh", 0, "/bin/sh")]);

        let err = runner
            .run_with_retry(&InstallerJob::new(["-c", "exit 4"]), &chain, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InstallerError::RuntimesExhausted { exit_code: 4, attempts: 1 }
        ));
    }
}
