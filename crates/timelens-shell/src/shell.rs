//! Run loop: relay backend output into the host log, keep the backend
//! supervised until the shell is interrupted, then shut it down.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use timelens_core::{BackendEvent, HealthProbe, LogLevel, LogStream};
use timelens_runtime::{BackendSupervisor, HttpHealthProbe};

use crate::bootstrap::{bootstrap, ShellConfig};

/// Supervise the backend until interrupted.
///
/// A failed start is reported but does not abort the shell; `status`
/// stays usable and the backend can be probed again externally. Shutdown
/// always runs the supervisor's stop protocol before returning.
///
/// # Errors
///
/// Fails when no backend executable can be resolved.
pub async fn run(config: &ShellConfig) -> Result<()> {
    let supervisor = bootstrap(config)?;
    relay_logs(&supervisor);
    relay_events(&supervisor);

    match supervisor.start().await {
        Ok(port) => info!(port, external = supervisor.is_external(), "backend ready"),
        Err(e) => warn!(error = %e, "continuing without a healthy backend"),
    }

    wait_for_shutdown_signal().await;
    info!("shutting down");
    if let Err(e) = supervisor.stop().await {
        warn!(error = %e, "backend stop reported an error");
    }
    Ok(())
}

/// Probe the given port once and report.
///
/// # Errors
///
/// Fails when nothing answers the health check, so the process exit
/// code reflects backend availability.
pub async fn status(port: u16) -> Result<()> {
    let probe = HttpHealthProbe::new();
    if probe.check(port).await {
        println!("backend healthy on port {port}");
        Ok(())
    } else {
        anyhow::bail!("no backend answering health checks on port {port}")
    }
}

/// Drain the broadcaster (backlog first, then live) into the host log.
fn relay_logs(supervisor: &Arc<BackendSupervisor>) {
    let mut rx = supervisor.logs().attach();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let stream = event.stream.map_or("host", LogStream::as_str);
            match event.level {
                LogLevel::Debug => debug!(target: "backend", stream, "{}", event.text),
                LogLevel::Info => info!(target: "backend", stream, "{}", event.text),
                LogLevel::Warn => warn!(target: "backend", stream, "{}", event.text),
                LogLevel::Error => error!(target: "backend", stream, "{}", event.text),
            }
        }
    });
}

/// Surface lifecycle transitions in the host log.
fn relay_events(supervisor: &Arc<BackendSupervisor>) {
    let mut rx = supervisor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                BackendEvent::Starting => info!("backend starting"),
                BackendEvent::Ready { port } => info!(port, "backend ready"),
                BackendEvent::Error { message } => error!("backend error: {message}"),
                BackendEvent::Stopping => info!("backend stopping"),
                BackendEvent::Stopped => info!("backend stopped"),
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM; falling back to ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => debug!("received ctrl-c"),
        _ = sigterm.recv() => debug!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
