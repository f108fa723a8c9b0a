//! Backend lifecycle events for UI synchronization.
//!
//! These events are broadcast by the supervisor and consumed by whichever
//! shell is hosting it (console today, a GUI adapter later). Consumers
//! should treat them as the sole source of truth for backend lifecycle.

use serde::{Deserialize, Serialize};

/// Backend lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendEvent {
    /// Startup has begun (a process was spawned, startup polling runs).
    Starting,
    /// The backend answers health checks on the given port.
    Ready {
        /// Port the backend is listening on.
        port: u16,
    },
    /// Startup failed; the shell should surface the message to the operator.
    Error {
        /// Human-readable failure description.
        message: String,
    },
    /// A stop has been initiated.
    Stopping,
    /// The backend is gone - clean stop or crash, the state is the same.
    Stopped,
}

impl BackendEvent {
    /// Create a ready event for a backend reachable on `port`.
    #[must_use]
    pub const fn ready(port: u16) -> Self {
        Self::Ready { port }
    }

    /// Create an error event from any displayable failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_serialization() {
        let json = serde_json::to_string(&BackendEvent::ready(8765)).unwrap();
        assert!(json.contains("\"type\":\"ready\""));
        assert!(json.contains("\"port\":8765"));
    }

    #[test]
    fn error_serialization() {
        let json = serde_json::to_string(&BackendEvent::error("spawn failed")).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"message\":\"spawn failed\""));
    }
}
