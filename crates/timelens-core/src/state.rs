//! Backend lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the supervised backend process.
///
/// `Stopped` is both the initial state and the fallback whenever an owned
/// process exits, expectedly or not. The supervisor is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    /// No backend is running or being started.
    Stopped,
    /// A single health probe is checking for an already-running instance.
    Probing,
    /// A process has been spawned and startup polling is in progress.
    Starting,
    /// The backend answers health checks and is usable.
    Ready,
    /// Startup failed (spawn failure or retry budget exhausted).
    Error,
    /// A stop is in flight.
    Stopping,
}

impl BackendState {
    /// Whether the backend is usable from this state.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether a `start()` from this state has work to do.
    ///
    /// `Probing`/`Starting`/`Stopping` only occur while an operation holds
    /// the supervisor's operation lock, so callers observing them are
    /// queued behind that operation anyway.
    #[must_use]
    pub const fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Probing => "probing",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Stopping => "stopping",
        };
        write!(f, "{name}")
    }
}
