// src/backend/process.rs

//! Generic supervisor for one external service process.
//!
//! [`ServiceProcess`] owns the child exclusively: spawn per the
//! [`ServiceCommand`] descriptor, poll the readiness probe while watching
//! for early exit, and stop with an escalating signal protocol (graceful
//! terminate, bounded grace period, forceful kill). `stop` is idempotent
//! and infallible so that plan teardown is never interrupted.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::backend::readiness::ReadinessProbe;
use crate::backend::relay::spawn_line_relay;
use crate::errors::{Result, StagehandError};

/// Interval between readiness probe attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a service gets to exit after the graceful terminate before it
/// is killed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable description of how to run one backing service.
#[derive(Debug, Clone)]
pub struct ServiceCommand {
    name: String,
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
    readiness: ReadinessProbe,
    ready_timeout: Duration,
    error_log: Option<PathBuf>,
    relay_stderr: bool,
}

impl ServiceCommand {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            env_remove: Vec::new(),
            cwd: None,
            readiness: ReadinessProbe::None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            error_log: None,
            relay_stderr: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Explicit environment override for the spawned process. The ambient
    /// environment of stagehand itself is never mutated.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Remove a variable from the child's inherited environment.
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn readiness(mut self, probe: ReadinessProbe) -> Self {
        self.readiness = probe;
        self
    }

    /// Upper bound on the total readiness wait. Expiry fails the start
    /// instead of polling forever against a wedged service.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// File whose content is captured into the startup error when the
    /// service dies before becoming ready.
    pub fn error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = Some(path.into());
        self
    }

    /// Pipe the child's stderr through the line relay at info level
    /// instead of discarding it.
    pub fn relay_stderr(mut self, relay: bool) -> Self {
        self.relay_stderr = relay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lifecycle of a supervised service process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Starting,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

/// One supervised OS process. Holds at most one child handle at a time.
#[derive(Debug)]
pub struct ServiceProcess {
    command: ServiceCommand,
    child: Option<Child>,
    state: ServiceState,
}

impl ServiceProcess {
    pub fn new(command: ServiceCommand) -> Self {
        Self {
            command,
            child: None,
            state: ServiceState::NotStarted,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn name(&self) -> &str {
        self.command.name()
    }

    /// Spawn the service and wait for its readiness probe.
    ///
    /// Fails with `BackendStartup` if the spawn errors, the process exits
    /// before becoming ready, or the readiness timeout expires; the state
    /// is `Failed` afterwards and no child handle is retained.
    pub async fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }

        self.state = ServiceState::Starting;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        if let Some(dir) = &self.command.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.command.env {
            cmd.env(key, value);
        }
        for key in &self.command.env_remove {
            cmd.env_remove(key);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(if self.command.relay_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        // Safety net: if the supervisor is dropped without stop(), the
        // child does not outlive the run.
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                self.state = ServiceState::Failed;
                return Err(StagehandError::BackendStartup {
                    backend: self.command.name.clone(),
                    reason: format!("failed to spawn `{}`: {err}", self.command.program),
                    error_log: String::new(),
                });
            }
        };

        match child.id() {
            Some(pid) => {
                info!(backend = %self.command.name, pid, "spawned service process");
            }
            None => {
                warn!(
                    backend = %self.command.name,
                    "spawned service process but PID is unavailable (it may have exited already)"
                );
            }
        }

        if self.command.relay_stderr {
            if let Some(stderr) = child.stderr.take() {
                let name = self.command.name.clone();
                spawn_line_relay(stderr, move |line| {
                    info!(backend = %name, "{line}");
                });
            }
        }

        self.child = Some(child);
        self.wait_until_ready().await
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.command.ready_timeout;

        loop {
            if self.command.readiness.poll().await {
                self.state = ServiceState::Ready;
                info!(backend = %self.command.name, "backend is ready");
                return Ok(());
            }

            if let Some(status) = self.poll_exit()? {
                self.state = ServiceState::Failed;
                self.child = None;
                let error_log = self.read_error_log();
                if !error_log.is_empty() {
                    warn!(
                        backend = %self.command.name,
                        "service error log:\n{error_log}"
                    );
                }
                return Err(StagehandError::BackendStartup {
                    backend: self.command.name.clone(),
                    reason: format!("process exited before becoming ready ({status})"),
                    error_log,
                });
            }

            if Instant::now() >= deadline {
                warn!(
                    backend = %self.command.name,
                    "backend not ready after {:?}; giving up",
                    self.command.ready_timeout
                );
                self.kill_and_reap().await;
                self.state = ServiceState::Failed;
                return Err(StagehandError::BackendStartup {
                    backend: self.command.name.clone(),
                    reason: format!(
                        "not ready after {:?}",
                        self.command.ready_timeout
                    ),
                    error_log: self.read_error_log(),
                });
            }

            info!(backend = %self.command.name, "waiting for backend readiness");
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Non-blocking check whether the child has exited.
    fn poll_exit(&mut self) -> Result<Option<std::process::ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(None);
        };
        match child.try_wait() {
            Ok(status) => Ok(status),
            Err(err) => {
                self.state = ServiceState::Failed;
                Err(StagehandError::BackendStartup {
                    backend: self.command.name.clone(),
                    reason: format!("failed to poll service process: {err}"),
                    error_log: String::new(),
                })
            }
        }
    }

    /// Stop the service with the escalating protocol: graceful terminate,
    /// wait up to [`GRACE_PERIOD`], then kill.
    ///
    /// Idempotent: calling this on a process that was never started or has
    /// already been stopped does nothing. Never fails; problems during
    /// termination are logged so the rest of the unwind can proceed.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        self.state = ServiceState::Stopping;
        info!(backend = %self.command.name, "terminating backend");

        if send_sigterm(&child, self.command.name()) {
            match timeout(GRACE_PERIOD, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(backend = %self.command.name, %status, "backend exited");
                    self.state = ServiceState::Stopped;
                    return;
                }
                Ok(Err(err)) => {
                    warn!(
                        backend = %self.command.name,
                        error = %err,
                        "error waiting for backend to exit"
                    );
                }
                Err(_) => {
                    warn!(
                        backend = %self.command.name,
                        "backend did not exit within {GRACE_PERIOD:?}; killing"
                    );
                }
            }
        }

        if let Err(err) = child.kill().await {
            warn!(
                backend = %self.command.name,
                error = %err,
                "failed to kill backend process"
            );
        }
        self.state = ServiceState::Stopped;
    }

    async fn kill_and_reap(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!(
                    backend = %self.command.name,
                    error = %err,
                    "failed to kill unready backend process"
                );
            }
        }
    }

    fn read_error_log(&self) -> String {
        self.command
            .error_log
            .as_ref()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .unwrap_or_default()
    }
}

/// Graceful phase of the escalation. Returns whether a wait for exit is
/// worthwhile (signal delivered, or the process is already gone).
#[cfg(unix)]
fn send_sigterm(child: &Child, name: &str) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return true;
    };
    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => {
            debug!(backend = %name, pid, "sent SIGTERM");
            true
        }
        Err(Errno::ESRCH) => {
            debug!(backend = %name, pid, "process already gone");
            true
        }
        Err(err) => {
            warn!(backend = %name, pid, error = %err, "failed to send SIGTERM");
            false
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child, _name: &str) -> bool {
    false
}
