//! Structured log event types.
//!
//! Raw backend output arrives as free-form text on two independent
//! streams. The supervisor classifies every line into a [`LogEvent`] and
//! hands it to the broadcaster, which preserves per-stream arrival order.
//! Ordering between stdout and stderr is unspecified - they are separate
//! channels.

use serde::{Deserialize, Serialize};

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Who produced a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// A line of backend process output.
    Backend,
    /// A diagnostic emitted by the supervisor itself.
    Host,
}

/// Which output stream a backend line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    /// Default severity for lines carrying no recognizable level marker.
    #[must_use]
    pub const fn default_level(self) -> LogLevel {
        match self {
            Self::Stdout => LogLevel::Info,
            Self::Stderr => LogLevel::Warn,
        }
    }

    /// Stream name as it appears in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A single structured log event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Classified severity.
    pub level: LogLevel,
    /// Backend output or host diagnostic.
    pub source: LogSource,
    /// Originating stream for backend lines (`None` for host events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<LogStream>,
    /// The line text, without trailing newline.
    pub text: String,
    /// Arrival sequence number, assigned by the broadcaster.
    pub seq: u64,
}
