//! Signal delivery and exit status summaries for owned backends.
//!
//! The supervisor moves the `Child` into its exit-monitor task, so stop
//! has to signal by pid. SIGTERM first; SIGKILL only after the grace
//! period elapses without an exit notification.

use std::fmt;
use std::io;
use std::process::ExitStatus;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Condensed exit status of the backend process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitSummary {
    /// Exit code, when the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the process was killed (unix).
    pub signal: Option<i32>,
}

impl ExitSummary {
    /// Summarize a reaped [`ExitStatus`].
    #[must_use]
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// Whether this counts as a clean exit (code 0, no signal).
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self.code, Some(0)) && self.signal.is_none()
    }
}

impl fmt::Display for ExitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "terminated by signal {signal}"),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Send SIGTERM to `pid`, asking for a graceful exit.
///
/// A process that is already gone is not an error - the exit monitor has
/// the authoritative notification.
#[cfg(unix)]
pub(crate) fn signal_terminate(pid: u32) -> io::Result<()> {
    send_signal(pid, Signal::SIGTERM)
}

/// Send SIGKILL to `pid` after the grace period expired.
#[cfg(unix)]
pub(crate) fn signal_kill(pid: u32) -> io::Result<()> {
    send_signal(pid, Signal::SIGKILL)
}

#[cfg(unix)]
fn send_signal(pid: u32, sig: Signal) -> io::Result<()> {
    match signal::kill(Pid::from_raw(pid as i32), sig) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Ok(()), // already gone
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub(crate) fn signal_terminate(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination by pid is not implemented on this platform",
    ))
}

#[cfg(not(unix))]
pub(crate) fn signal_kill(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "forceful kill by pid is not implemented on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[test]
    #[cfg(unix)]
    fn signal_to_missing_pid_is_ok() {
        // A pid far above any default pid_max.
        assert!(signal_terminate(4_000_000).is_ok());
        assert!(signal_kill(4_000_000).is_ok());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn sigterm_stops_a_cooperative_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        signal_terminate(pid).unwrap();
        let status = child.wait().await.unwrap();
        let summary = ExitSummary::from_status(status);
        assert_eq!(summary.signal, Some(libc_sigterm()));
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn clean_exit_summary() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = child.wait().await.unwrap();
        let summary = ExitSummary::from_status(status);
        assert!(summary.is_clean());
        assert_eq!(summary.to_string(), "exit code 0");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn nonzero_exit_summary() {
        let mut child = Command::new("sh").arg("-c").arg("exit 3").spawn().unwrap();
        let status = child.wait().await.unwrap();
        let summary = ExitSummary::from_status(status);
        assert!(!summary.is_clean());
        assert_eq!(summary.code, Some(3));
        assert_eq!(summary.to_string(), "exit code 3");
    }

    #[cfg(unix)]
    fn libc_sigterm() -> i32 {
        nix::sys::signal::Signal::SIGTERM as i32
    }
}
