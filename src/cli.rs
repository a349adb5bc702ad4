//! CLI entry point: parse flags, set up logging, boot the server.

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::config::Config;

/// partwise - an ordered-parts catalog service
#[derive(Parser, Debug)]
#[command(name = "partwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Engine-wide lock-wait timeout in seconds
    #[arg(long, default_value_t = 50)]
    pub lock_wait_timeout: u64,

    /// Tight lock-window timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub tight_window: u64,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn into_config(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            lock_wait_timeout_secs: self.lock_wait_timeout,
            tight_window_secs: self.tight_window,
            ..Config::default()
        }
    }
}

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Parse arguments and serve until shutdown.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("partwise=info")),
        )
        .init();

    let config = cli.into_config();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(api::serve(config))?;
    Ok(())
}
