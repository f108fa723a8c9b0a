//! Shell bootstrap - the composition root.
//!
//! This module is the only place where the concrete probe, launch spec,
//! and supervisor are wired together. Everything downstream of here
//! talks to the supervisor through its own API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::debug;

use timelens_core::RetryPolicy;
use timelens_runtime::{BackendSupervisor, LaunchSpec, SupervisorConfig};

use crate::cli::RunArgs;

/// File name of the backend executable looked up next to the shell
/// binary and on PATH.
pub const BACKEND_EXECUTABLE: &str = "timelens-backend";

/// Resolved configuration for one shell run.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Port the backend should serve on.
    pub port: u16,
    /// Explicit backend executable, bypassing resolution.
    pub backend_override: Option<PathBuf>,
    /// Working directory for the spawned backend.
    pub backend_dir: Option<PathBuf>,
    /// Startup polling budget.
    pub startup: RetryPolicy,
    /// SIGTERM grace period before the forceful kill.
    pub grace_period: Duration,
}

impl ShellConfig {
    #[must_use]
    pub fn from_args(args: &RunArgs) -> Self {
        Self {
            port: args.port,
            backend_override: args.backend.clone(),
            backend_dir: args.backend_dir.clone(),
            startup: RetryPolicy::new(
                args.startup_attempts,
                Duration::from_millis(args.startup_interval_ms),
            ),
            grace_period: Duration::from_secs(args.grace_secs),
        }
    }
}

/// Locate the backend executable.
///
/// Resolution order: explicit override, a sibling of the shell binary,
/// then the PATH.
///
/// # Errors
///
/// Fails when the override path does not exist or when no candidate is
/// found anywhere.
pub fn resolve_backend(backend_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = backend_override {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        bail!("backend executable not found at {}", path.display());
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(BACKEND_EXECUTABLE);
            if sibling.is_file() {
                debug!(path = %sibling.display(), "found backend next to the shell binary");
                return Ok(sibling);
            }
        }
    }

    if let Some(path) = std::env::var_os("PATH") {
        if let Some(found) = find_in_dirs(std::env::split_paths(&path), BACKEND_EXECUTABLE) {
            debug!(path = %found.display(), "found backend on PATH");
            return Ok(found);
        }
    }

    bail!(
        "no {BACKEND_EXECUTABLE} executable found; pass --backend or set TIMELENS_BACKEND"
    )
}

fn find_in_dirs(dirs: impl Iterator<Item = PathBuf>, name: &str) -> Option<PathBuf> {
    dirs.map(|dir| dir.join(name)).find(|p| p.is_file())
}

/// Assemble the supervisor from a resolved shell configuration.
///
/// # Errors
///
/// Fails when no backend executable can be resolved.
pub fn bootstrap(config: &ShellConfig) -> Result<Arc<BackendSupervisor>> {
    let program = resolve_backend(config.backend_override.as_deref())
        .context("resolving the backend executable")?;

    let mut launch = LaunchSpec::new(program).fixed_port(config.port);
    if let Some(dir) = &config.backend_dir {
        launch = launch.working_dir(dir);
    }

    let mut supervisor_config = SupervisorConfig::new(launch);
    supervisor_config.port = config.port;
    supervisor_config.startup = config.startup;
    supervisor_config.grace_period = config.grace_period;

    Ok(Arc::new(BackendSupervisor::with_http_probe(
        supervisor_config,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn make_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    #[cfg(unix)]
    fn explicit_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let backend = make_executable(dir.path(), "custom-backend");
        let resolved = resolve_backend(Some(&backend)).unwrap();
        assert_eq!(resolved, backend);
    }

    #[test]
    fn missing_override_is_an_error() {
        let err = resolve_backend(Some(Path::new("/nonexistent/timelens-backend"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    #[cfg(unix)]
    fn dir_scan_finds_the_executable() {
        let empty = tempfile::tempdir().unwrap();
        let hit = tempfile::tempdir().unwrap();
        let backend = make_executable(hit.path(), BACKEND_EXECUTABLE);

        let dirs = [empty.path().to_path_buf(), hit.path().to_path_buf()];
        let found = find_in_dirs(dirs.into_iter(), BACKEND_EXECUTABLE).unwrap();
        assert_eq!(found, backend);
    }

    #[test]
    fn dir_scan_misses_cleanly() {
        let empty = tempfile::tempdir().unwrap();
        let dirs = [empty.path().to_path_buf()];
        assert!(find_in_dirs(dirs.into_iter(), BACKEND_EXECUTABLE).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn bootstrap_wires_the_supervisor() {
        let dir = tempfile::tempdir().unwrap();
        let backend = make_executable(dir.path(), BACKEND_EXECUTABLE);

        let config = ShellConfig {
            port: 9200,
            backend_override: Some(backend),
            backend_dir: None,
            startup: RetryPolicy::new(3, Duration::from_millis(10)),
            grace_period: Duration::from_secs(1),
        };
        let supervisor = bootstrap(&config).unwrap();
        assert_eq!(supervisor.port(), 9200);
        assert!(!supervisor.is_running());
    }
}
