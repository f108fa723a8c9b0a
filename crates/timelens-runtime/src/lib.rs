//! Process runtime and OS-level concerns for timelens.
//!
//! This crate owns everything that touches the operating system or the
//! network on the backend's behalf: spawning the analysis server, reading
//! its output streams, HTTP health probing, the buffered log broadcaster,
//! and the SIGTERM -> SIGKILL shutdown path. The `BackendSupervisor` ties
//! those pieces into the lifecycle state machine defined in
//! `timelens-core`.

mod broadcaster;
mod launch;
mod poll;
mod probe;
mod shutdown;
mod stream;
mod supervisor;

pub use broadcaster::LogBroadcaster;
pub use launch::LaunchSpec;
pub use poll::{poll_until, PollOutcome};
pub use probe::HttpHealthProbe;
pub use shutdown::ExitSummary;
pub use supervisor::{BackendHandle, BackendSupervisor, SupervisorConfig};
