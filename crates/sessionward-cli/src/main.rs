//! sessionward - sign in, out and around an Auth API from the terminal.
//!
//! Tokens persist between runs in the configured storage, so every command
//! starts by restoring the session.

mod cli;
mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use sessionward_core::{Config, ProtectedGate, SessionManager};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Rolling log file name prefix in the cache directory
const LOG_FILE_PREFIX: &str = "sessionward.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut guard = None;
    let file_layer = if config.log_to_file {
        match config.cache_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                Some(fmt::layer().with_ansi(false).with_writer(writer))
            }
            Err(e) => {
                eprintln!("File logging disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(storage) = cli.storage {
        config.storage = storage.parse()?;
    }

    let _log_guard = init_tracing(&config);
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(api = %config.api_base_url, storage = %config.storage, "sessionward starting");

    let manager = SessionManager::from_config(&config)?;
    let gate = ProtectedGate::new(config.login_path.clone());

    manager.initialize().await;
    commands::run(&manager, &gate, cli.command).await
}
