//! Core domain types and port definitions for timelens.
//!
//! This crate holds the pure half of the backend supervisor: lifecycle
//! states and events, structured log types and classification, retry
//! policies, and the `HealthProbe` port. No I/O happens here - the
//! runtime crate provides the process, HTTP, and signal plumbing.

pub mod classify;
pub mod error;
pub mod events;
pub mod logs;
pub mod ports;
pub mod retry;
pub mod state;

// Re-export commonly used types for convenience
pub use classify::{classify, parse_port_announcement};
pub use error::{StartError, StopError};
pub use events::BackendEvent;
pub use logs::{LogEvent, LogLevel, LogSource, LogStream};
pub use ports::HealthProbe;
pub use retry::RetryPolicy;
pub use state::BackendState;

/// Default port the analysis backend listens on when nothing else is
/// configured. Matches the backend's own `find_free_port` starting point.
pub const DEFAULT_BACKEND_PORT: u16 = 8765;
