//! Command-line parser for the `timelens` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use timelens_core::DEFAULT_BACKEND_PORT;

/// Top-level parser with global options and subcommand dispatch.
#[derive(Parser)]
#[command(name = "timelens")]
#[command(about = "Run and supervise the timelens analysis backend")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the backend and keep it supervised until interrupted
    Run(RunArgs),
    /// Check whether a backend is answering health checks
    Status {
        /// Port to probe
        #[arg(long, env = "TIMELENS_PORT", default_value_t = DEFAULT_BACKEND_PORT)]
        port: u16,
    },
}

/// Options for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Port the backend should serve on
    #[arg(long, env = "TIMELENS_PORT", default_value_t = DEFAULT_BACKEND_PORT)]
    pub port: u16,

    /// Path to the backend executable; defaults to a sibling of this
    /// binary, then a PATH lookup
    #[arg(long, env = "TIMELENS_BACKEND")]
    pub backend: Option<PathBuf>,

    /// Working directory for the spawned backend
    #[arg(long)]
    pub backend_dir: Option<PathBuf>,

    /// Maximum startup health checks before giving up
    #[arg(long, default_value_t = 30)]
    pub startup_attempts: u32,

    /// Milliseconds between startup health checks
    #[arg(long, default_value_t = 1000)]
    pub startup_interval_ms: u64,

    /// Seconds the backend gets to exit after SIGTERM before the
    /// forceful kill
    #[arg(long, default_value_t = 5)]
    pub grace_secs: u64,
}
