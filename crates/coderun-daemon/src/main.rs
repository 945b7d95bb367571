//! coderun-daemon - Long-running execution service
//!
//! Accepts length-prefixed MessagePack requests on a Unix socket and runs
//! them through a bounded pool of executions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coderun_core::Executor;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

mod config;
mod pool;
mod server;

use config::DaemonConfig;
use pool::ExecutionPool;

#[derive(Parser)]
#[command(name = "coderun-daemon")]
#[command(about = "Run untrusted code on behalf of socket clients", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the socket path from the configuration
    #[arg(short, long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coderun=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!("coderun-daemon starting");

    let mut config = DaemonConfig::load(cli.config.as_deref())?;
    if let Some(socket) = cli.socket {
        config.socket_path = socket;
    }
    tracing::info!(
        max_concurrent = config.max_concurrent,
        socket = ?config.socket_path,
        timeout_ms = config.execution.timeout.as_millis(),
        "configuration loaded"
    );

    // Create socket directory if needed
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }

    // Remove stale socket
    let _ = std::fs::remove_file(&config.socket_path);

    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("could not bind {}", config.socket_path.display()))?;
    tracing::info!(socket = ?config.socket_path, "listening");

    let executor = Executor::new(config.execution.clone());
    let pool = Arc::new(ExecutionPool::new(executor, config.max_concurrent));

    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    let handle = signals.handle();

    let outcome = tokio::select! {
        result = server::run(listener, pool) => result.context("server stopped"),
        signal = signals.next() => {
            tracing::info!(?signal, "shutting down");
            Ok(())
        }
    };

    handle.close();
    let _ = std::fs::remove_file(&config.socket_path);
    tracing::info!("coderun-daemon stopped");

    outcome
}
