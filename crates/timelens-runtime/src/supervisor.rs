//! Backend process supervisor.
//!
//! Owns the one backend handle the application ever has, drives startup
//! polling, dispatches raw process output into the log broadcaster, and
//! implements both shutdown protocols.
//!
//! Key design decisions:
//! - **Probe-first attach**: an instance already answering health checks
//!   (developer script, previous run) is adopted as `External` - the
//!   supervisor never spawns a second backend.
//! - **Internal state ownership**: the supervisor is the only writer of
//!   handle and state; `start`/`stop`/`restart` serialize on an operation
//!   mutex, and a cancellation token lets `stop()` supersede an in-flight
//!   `start()`.
//! - **Exit monitor**: the `Child` moves into a task awaiting the exit
//!   notification, so crashes are detected even when nobody called
//!   `stop()`; stop signals by pid.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use timelens_core::{
    classify, parse_port_announcement, BackendEvent, BackendState, HealthProbe, LogLevel,
    LogStream, RetryPolicy, StartError, StopError, DEFAULT_BACKEND_PORT,
};

use crate::broadcaster::LogBroadcaster;
use crate::launch::LaunchSpec;
use crate::poll::{poll_until, PollOutcome};
use crate::probe::HttpHealthProbe;
use crate::shutdown::{self, ExitSummary};
use crate::stream::spawn_line_reader;

/// Capacity of the lifecycle event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for a [`BackendSupervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How to spawn the backend when no instance is reachable.
    pub launch: LaunchSpec,
    /// Port probed before spawning; replaced by the backend's
    /// `BACKEND_PORT:` announcement for owned processes.
    pub port: u16,
    /// Retry budget for startup polling.
    pub startup: RetryPolicy,
    /// Retry budget for confirming an external backend's shutdown.
    pub shutdown_confirm: RetryPolicy,
    /// How long an owned process gets to exit after SIGTERM before the
    /// forceful kill.
    pub grace_period: Duration,
    /// How long to wait for the exit notification after SIGKILL.
    pub kill_wait: Duration,
}

impl SupervisorConfig {
    /// Default timings for the given launch spec.
    #[must_use]
    pub fn new(launch: LaunchSpec) -> Self {
        Self {
            launch,
            port: DEFAULT_BACKEND_PORT,
            startup: RetryPolicy::STARTUP,
            shutdown_confirm: RetryPolicy::SHUTDOWN_CONFIRM,
            grace_period: Duration::from_secs(5),
            kill_wait: Duration::from_secs(2),
        }
    }
}

/// The backend handle: who owns the process decides how it stops.
#[derive(Debug, Clone)]
pub enum BackendHandle {
    /// A process this supervisor spawned; terminated via OS signals.
    Owned {
        /// Process id, used for signal delivery.
        pid: u32,
        /// Exit notification from the monitor task.
        exited: watch::Receiver<Option<ExitSummary>>,
    },
    /// An instance that was already running; terminated via the HTTP
    /// shutdown request only.
    External,
}

struct Inner {
    state: BackendState,
    handle: Option<BackendHandle>,
    port: u16,
}

struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn port(&self) -> u16 {
        self.inner.lock().unwrap().port
    }

    fn set_port(&self, port: u16) {
        self.inner.lock().unwrap().port = port;
    }
}

/// Supervisor for the out-of-process analysis backend.
///
/// Construct one per application lifetime and share it as an `Arc`; it is
/// never reached through a global.
pub struct BackendSupervisor {
    config: SupervisorConfig,
    probe: Arc<dyn HealthProbe>,
    logs: Arc<LogBroadcaster>,
    events: broadcast::Sender<BackendEvent>,
    shared: Arc<Shared>,
    /// Serializes `start`/`stop`/`restart`.
    op_lock: tokio::sync::Mutex<()>,
    /// Token for the in-flight `start()`, if any; `stop()` cancels it.
    start_cancel: Mutex<Option<CancellationToken>>,
}

impl BackendSupervisor {
    /// Create a supervisor with an explicit probe implementation.
    #[must_use]
    pub fn new(config: SupervisorConfig, probe: Arc<dyn HealthProbe>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let port = config.port;
        Self {
            config,
            probe,
            logs: Arc::new(LogBroadcaster::new()),
            events,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: BackendState::Stopped,
                    handle: None,
                    port,
                }),
            }),
            op_lock: tokio::sync::Mutex::new(()),
            start_cancel: Mutex::new(None),
        }
    }

    /// Create a supervisor backed by the real HTTP probe.
    #[must_use]
    pub fn with_http_probe(config: SupervisorConfig) -> Self {
        Self::new(config, Arc::new(HttpHealthProbe::new()))
    }

    /// The log broadcaster; attach a consumer to receive buffered and
    /// live backend output.
    #[must_use]
    pub fn logs(&self) -> &Arc<LogBroadcaster> {
        &self.logs
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle state. Never blocks.
    #[must_use]
    pub fn state(&self) -> BackendState {
        self.shared.inner.lock().unwrap().state
    }

    /// Port health checks and API calls currently target. Never blocks.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.shared.port()
    }

    /// Whether the backend is ready to serve. Never blocks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().is_ready()
    }

    /// Whether the current handle is an attached external instance.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(
            self.shared.inner.lock().unwrap().handle,
            Some(BackendHandle::External)
        )
    }

    /// Pid of the owned backend process, if any.
    #[must_use]
    pub fn backend_pid(&self) -> Option<u32> {
        match self.shared.inner.lock().unwrap().handle {
            Some(BackendHandle::Owned { pid, .. }) => Some(pid),
            _ => None,
        }
    }

    /// Start the backend and return the port it serves on.
    ///
    /// Idempotent while `Ready`. Probes the configured port first and
    /// attaches to a healthy instance instead of spawning; otherwise
    /// spawns the launch spec and polls health with the startup budget.
    ///
    /// # Errors
    ///
    /// [`StartError::SpawnFailure`] immediately when the executable cannot
    /// be launched, [`StartError::StartupTimeout`] when the retry budget
    /// is exhausted, [`StartError::Canceled`] when a concurrent `stop()`
    /// superseded the startup polling.
    pub async fn start(&self) -> Result<u16, StartError> {
        let cancel = CancellationToken::new();
        *self.start_cancel.lock().unwrap() = Some(cancel.clone());
        let result = self.start_inner(&cancel).await;
        self.start_cancel.lock().unwrap().take();
        result
    }

    async fn start_inner(&self, cancel: &CancellationToken) -> Result<u16, StartError> {
        let _op = self.op_lock.lock().await;
        if cancel.is_cancelled() {
            return Err(StartError::Canceled);
        }
        {
            let inner = self.shared.inner.lock().unwrap();
            if inner.state == BackendState::Ready {
                debug!(port = inner.port, "backend already ready; start() is a no-op");
                return Ok(inner.port);
            }
        }

        // A previous start may have timed out while the owned process was
        // still warming up; keep polling it instead of spawning a sibling.
        let resumable = {
            let inner = self.shared.inner.lock().unwrap();
            matches!(
                inner.handle,
                Some(BackendHandle::Owned { ref exited, .. }) if exited.borrow().is_none()
            )
        };

        if !resumable {
            self.set_state(BackendState::Probing);
            let port = self.shared.port();
            if self.probe.check(port).await {
                info!(port, "attached to already-running backend");
                self.logs.host(
                    LogLevel::Info,
                    format!("attached to running backend on port {port}"),
                );
                {
                    let mut inner = self.shared.inner.lock().unwrap();
                    inner.handle = Some(BackendHandle::External);
                    inner.state = BackendState::Ready;
                }
                let _ = self.events.send(BackendEvent::ready(port));
                return Ok(port);
            }

            if let Err(e) = self.spawn_backend() {
                self.set_state(BackendState::Error);
                let err = StartError::SpawnFailure(e);
                let _ = self.events.send(BackendEvent::error(err.to_string()));
                return Err(err);
            }
        }

        self.set_state(BackendState::Starting);
        let _ = self.events.send(BackendEvent::Starting);

        let started = Instant::now();
        match poll_until(self.config.startup, Some(cancel), || self.probe_current()).await {
            PollOutcome::Satisfied { attempts } => {
                let port = {
                    let mut inner = self.shared.inner.lock().unwrap();
                    inner.state = BackendState::Ready;
                    inner.port
                };
                info!(port, attempts, elapsed = ?started.elapsed(), "backend is ready");
                let _ = self.events.send(BackendEvent::ready(port));
                Ok(port)
            }
            PollOutcome::Canceled => {
                debug!("startup polling superseded by stop()");
                Err(StartError::Canceled)
            }
            PollOutcome::Exhausted { attempts, waited } => {
                // The exit monitor may already have recorded a crash; an
                // Error state would mask the Stopped fallback.
                {
                    let mut inner = self.shared.inner.lock().unwrap();
                    if inner.state != BackendState::Stopped {
                        inner.state = BackendState::Error;
                    }
                }
                let err = StartError::StartupTimeout { waited, attempts };
                warn!(%err, "backend failed to become healthy");
                let _ = self.events.send(BackendEvent::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Stop the backend via the protocol matching its ownership.
    ///
    /// Idempotent while `Stopped`. Cancels an in-flight `start()` first.
    /// External backends get the HTTP shutdown request plus best-effort
    /// confirmation polling; owned processes get SIGTERM with SIGKILL
    /// escalation after the grace period.
    ///
    /// # Errors
    ///
    /// [`StopError::Signal`] when signal delivery to an owned process
    /// fails for a reason other than the process already being gone. The
    /// supervisor still reports `Stopped` afterwards.
    pub async fn stop(&self) -> Result<(), StopError> {
        if let Some(token) = self.start_cancel.lock().unwrap().take() {
            token.cancel();
        }
        let _op = self.op_lock.lock().await;

        let (handle, port) = {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.state == BackendState::Stopped {
                debug!("backend already stopped; stop() is a no-op");
                return Ok(());
            }
            inner.state = BackendState::Stopping;
            (inner.handle.take(), inner.port)
        };
        let _ = self.events.send(BackendEvent::Stopping);

        let result = match handle {
            None => Ok(()),
            Some(BackendHandle::External) => {
                self.stop_external(port).await;
                Ok(())
            }
            Some(BackendHandle::Owned { pid, exited }) => self.stop_owned(pid, exited).await,
        };

        self.set_state(BackendState::Stopped);
        let _ = self.events.send(BackendEvent::Stopped);
        result
    }

    /// Sequential `stop()` then `start()`.
    ///
    /// # Errors
    ///
    /// Propagates the start half's [`StartError`]. A stop failure is
    /// logged and the start proceeds - probe-first attach reattaches to a
    /// survivor instead of double-spawning.
    pub async fn restart(&self) -> Result<u16, StartError> {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "stop during restart failed; continuing with start");
        }
        self.start().await
    }

    async fn probe_current(&self) -> bool {
        let port = self.shared.port();
        self.probe.check(port).await
    }

    fn set_state(&self, state: BackendState) {
        self.shared.inner.lock().unwrap().state = state;
    }

    /// Spawn the backend and wire up output readers and the exit monitor.
    fn spawn_backend(&self) -> io::Result<()> {
        let mut child = self.config.launch.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("spawned backend exited before its pid could be read"))?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, LogStream::Stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, LogStream::Stderr, line_tx.clone());
        }
        drop(line_tx); // dispatcher ends when both readers hit EOF
        self.spawn_output_dispatcher(line_rx);

        let (exit_tx, exit_rx) = watch::channel(None);
        {
            let mut inner = self.shared.inner.lock().unwrap();
            inner.handle = Some(BackendHandle::Owned {
                pid,
                exited: exit_rx,
            });
        }
        self.spawn_exit_monitor(child, pid, exit_tx);

        info!(pid, program = %self.config.launch.program().display(), "spawned backend process");
        Ok(())
    }

    /// Classify and forward every output line; scan for the port
    /// announcement while at it.
    fn spawn_output_dispatcher(&self, mut rx: mpsc::UnboundedReceiver<(LogStream, String)>) {
        let shared = Arc::clone(&self.shared);
        let logs = Arc::clone(&self.logs);
        tokio::spawn(async move {
            while let Some((stream, line)) = rx.recv().await {
                if let Some(port) = parse_port_announcement(&line) {
                    debug!(port, "backend announced listening port");
                    shared.set_port(port);
                }
                let level = classify(&line, stream.default_level());
                logs.backend(level, stream, line);
            }
        });
    }

    /// Await the exit notification; detect crashes nobody asked for.
    fn spawn_exit_monitor(
        &self,
        mut child: tokio::process::Child,
        pid: u32,
        exit_tx: watch::Sender<Option<ExitSummary>>,
    ) {
        let shared = Arc::clone(&self.shared);
        let logs = Arc::clone(&self.logs);
        let events = self.events.clone();
        tokio::spawn(async move {
            let summary = match child.wait().await {
                Ok(status) => ExitSummary::from_status(status),
                Err(e) => {
                    warn!(pid, error = %e, "failed to await backend exit");
                    ExitSummary {
                        code: None,
                        signal: None,
                    }
                }
            };
            let _ = exit_tx.send(Some(summary));

            let stopping = {
                let inner = shared.inner.lock().unwrap();
                matches!(
                    inner.state,
                    BackendState::Stopping | BackendState::Stopped
                )
            };

            if stopping {
                // Requested termination; the stop() in flight owns the
                // state transition.
                debug!(pid, %summary, "backend exited during shutdown");
                logs.host(
                    LogLevel::Info,
                    format!("backend process {pid} exited during shutdown ({summary})"),
                );
                return;
            }

            if summary.is_clean() {
                info!(pid, "backend process exited cleanly");
                logs.host(LogLevel::Info, format!("backend process {pid} exited cleanly"));
            } else {
                warn!(pid, %summary, "backend process exited unexpectedly");
                logs.host(
                    LogLevel::Error,
                    format!("backend process {pid} exited unexpectedly ({summary})"),
                );
            }

            {
                let mut inner = shared.inner.lock().unwrap();
                inner.handle = None;
                inner.state = BackendState::Stopped;
            }
            let _ = events.send(BackendEvent::Stopped);
        });
    }

    /// External protocol: shutdown request, then best-effort confirmation.
    async fn stop_external(&self, port: u16) {
        info!(port, "requesting shutdown of external backend");
        if !self.probe.request_shutdown(port).await {
            warn!(port, "external backend did not acknowledge the shutdown request");
            self.logs.host(
                LogLevel::Warn,
                format!("shutdown request to external backend on port {port} was not acknowledged"),
            );
        }

        let outcome = poll_until(self.config.shutdown_confirm, None, || async {
            !self.probe.check(port).await
        })
        .await;

        match outcome {
            PollOutcome::Satisfied { .. } => {
                debug!(port, "external backend stopped answering health checks");
            }
            PollOutcome::Exhausted { .. } => {
                // Cannot distinguish "really stopped" from "unreachable
                // from here but still running"; the local view is best
                // effort either way.
                warn!(port, "external backend still answers health checks; assuming stopped");
                self.logs.host(
                    LogLevel::Warn,
                    format!(
                        "external backend on port {port} still answers health checks; assuming stopped"
                    ),
                );
            }
            PollOutcome::Canceled => {}
        }
    }

    /// Owned protocol: SIGTERM, grace period, SIGKILL escalation.
    async fn stop_owned(
        &self,
        pid: u32,
        mut exited: watch::Receiver<Option<ExitSummary>>,
    ) -> Result<(), StopError> {
        if exited.borrow().is_some() {
            return Ok(());
        }

        debug!(pid, "sending SIGTERM to backend");
        shutdown::signal_terminate(pid).map_err(|source| StopError::Signal { pid, source })?;

        let graceful = timeout(self.config.grace_period, exited.wait_for(Option::is_some))
            .await
            .is_ok();
        match graceful {
            true => {
                debug!(pid, "backend exited within the grace period");
                Ok(())
            }
            false => {
                warn!(pid, grace = ?self.config.grace_period, "backend ignored SIGTERM; escalating to SIGKILL");
                self.logs.host(
                    LogLevel::Warn,
                    format!(
                        "backend process {pid} did not exit within {:?}; sending SIGKILL",
                        self.config.grace_period
                    ),
                );
                shutdown::signal_kill(pid).map_err(|source| StopError::Signal { pid, source })?;
                let _ = timeout(self.config.kill_wait, exited.wait_for(Option::is_some)).await;
                Ok(())
            }
        }
    }
}
