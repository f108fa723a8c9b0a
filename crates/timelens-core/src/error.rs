//! Error taxonomy for supervisor operations.
//!
//! Only failures that affect whether the backend is usable are surfaced as
//! errors; log lines and soft shutdown outcomes never interrupt control
//! flow. Presentation is the shell's job - nothing here formats dialogs.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors from `BackendSupervisor::start()` (and the start half of
/// `restart()`).
#[derive(Debug, Error)]
pub enum StartError {
    /// The backend executable could not be launched at all. Fatal
    /// immediately; the retry budget is not consumed.
    #[error("failed to spawn backend process: {0}")]
    SpawnFailure(#[source] io::Error),

    /// The backend never answered a health check within the retry budget.
    #[error("backend did not become healthy within {waited:?} ({attempts} attempts)")]
    StartupTimeout {
        /// Total elapsed wait, for operator diagnostics.
        waited: Duration,
        /// Number of probe attempts made.
        attempts: u32,
    },

    /// A concurrent `stop()` superseded this start while it was polling.
    #[error("startup was canceled by a concurrent stop")]
    Canceled,
}

/// Errors from `BackendSupervisor::stop()`.
///
/// External shutdown is best effort by design and never fails; only
/// signal delivery to an owned process can error out.
#[derive(Debug, Error)]
pub enum StopError {
    /// Sending a termination signal to the owned process failed for a
    /// reason other than the process already being gone.
    #[error("failed to signal backend process {pid}: {source}")]
    Signal {
        /// Process id the signal was aimed at.
        pid: u32,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_error_messages() {
        let err = StartError::SpawnFailure(io::Error::new(
            io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(err.to_string().contains("failed to spawn"));

        let err = StartError::StartupTimeout {
            waited: Duration::from_secs(30),
            attempts: 30,
        };
        let text = err.to_string();
        assert!(text.contains("30 attempts"));
    }

    #[test]
    fn spawn_failure_preserves_source() {
        let err = StartError::SpawnFailure(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("denied"));
    }
}
