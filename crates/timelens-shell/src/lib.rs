//! Console shell for the timelens backend.
//!
//! Hosts the composition root: argument parsing, backend executable
//! resolution, supervisor wiring, and the run loop that keeps the
//! backend alive until the shell is interrupted.

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod cli;
pub mod shell;

pub use bootstrap::{bootstrap, resolve_backend, ShellConfig};
pub use cli::{Cli, Commands, RunArgs};
