//! sextant - terminal HTTP API client
//!
//! Parses the command line, sets up file logging and runs the command.

use std::fs;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sextant::cli::{self, Cli};
use sextant::constants::{APP_VERSION, LOG_FILE_NAME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config();

    // Initialize logging to file; the terminal belongs to command output
    fs::create_dir_all(config.log_dir())
        .with_context(|| format!("Failed to create {}", config.log_dir().display()))?;
    let file_appender = tracing_appender::rolling::never(config.log_dir(), LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(version = APP_VERSION, home = %config.home.display(), "Starting");

    let succeeded = cli::run(cli, config).await?;
    if !succeeded {
        // Flush the log before exiting
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
