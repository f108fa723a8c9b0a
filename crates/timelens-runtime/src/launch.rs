//! Backend launch specification.
//!
//! How the backend executable is located is a packaging concern resolved
//! by the composition root; this module only turns a resolved spec into a
//! spawned process with the right environment and piped output streams.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

/// A fully resolved backend command: what to run, where, and with which
/// environment.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Executable to run (absolute path or a name resolved via `PATH`).
    program: PathBuf,
    /// Arguments passed verbatim.
    args: Vec<String>,
    /// Working directory, when the backend expects to run in place.
    working_dir: Option<PathBuf>,
    /// Fixed port to request via the `PORT` environment variable. When
    /// unset the backend picks its own port and announces it on stdout.
    fixed_port: Option<u16>,
}

impl LaunchSpec {
    /// Create a spec for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            fixed_port: None,
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run the backend from this directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Request a fixed listening port instead of letting the backend pick.
    #[must_use]
    pub const fn fixed_port(mut self, port: u16) -> Self {
        self.fixed_port = Some(port);
        self
    }

    /// The program this spec will run.
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Spawn the backend with piped stdout/stderr.
    ///
    /// The Python runtime must flush output immediately so the port
    /// announcement and log lines are observed promptly, hence
    /// `PYTHONUNBUFFERED`; bytecode caching is disabled so packaged
    /// installs never write next to their own sources.
    ///
    /// # Errors
    ///
    /// Propagates the spawn error (missing executable, permission denied).
    pub fn spawn(&self) -> io::Result<Child> {
        debug!(program = %self.program.display(), args = ?self.args, "spawning backend");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(port) = self.fixed_port {
            cmd.env("PORT", port.to_string());
        }

        cmd.spawn()
    }
}
