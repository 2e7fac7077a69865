//! flowsync - relays instrument telemetry to a remote aggregation service
//!
//! This is the main entry point for the flowsync service.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use flowsync::config::Config;
use flowsync::error::AppError;
use flowsync::logging::init_tracing;
use flowsync::server::{AppState, Server};
use flowsync::sync::{build_coordinator, TimedHttpClient};

/// flowsync - relays instrument telemetry to a remote aggregation service
#[derive(Parser, Debug)]
#[command(name = "flowsync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file; the environment is used when absent
    #[arg(short, long, env = "FLOWSYNC_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    run(args).await?;
    Ok(())
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = load_config(&args)?;

    init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        ship = %config.ship_name,
        meters = config.meters.len(),
        reports_enabled = config.remote.ticket_url.is_some(),
        "Starting flowsync"
    );

    let client = TimedHttpClient::new()?;
    let coordinator = Arc::new(build_coordinator(&config, client));
    info!(units = coordinator.unit_count(), "Sync coordinator initialized");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler = tokio::spawn(
        coordinator
            .clone()
            .run(config.polling.interval(), shutdown_rx),
    );

    let state = AppState { coordinator };
    let server = Server::new(config.server.clone(), state);

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    let result = server.run(shutdown_signal()).await;

    // Stop the scheduler whether the server exited cleanly or not
    let _ = shutdown_tx.send(());
    if let Err(e) = scheduler.await {
        error!(error = %e, "Sync scheduler task failed");
    }

    info!("flowsync shutdown complete");

    Ok(result?)
}

/// Load and validate configuration from file or environment
fn load_config(args: &Args) -> Result<Config, AppError> {
    let config = match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path)?
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env()?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
