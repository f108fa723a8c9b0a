//! Binary entry point.
//!
//! Parses arguments, initializes logging, and dispatches to the shell.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use timelens_shell::{shell, Cli, Commands, ShellConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Run(args) => {
            let config = ShellConfig::from_args(&args);
            shell::run(&config).await
        }
        Commands::Status { port } => shell::status(port).await,
    }
}
