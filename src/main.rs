//! # Bearer Gateway - Main Entry Point
//!
//! Loads configuration, installs logging and either serves the gateway on its
//! own listener or, under a hosting platform that owns the listener, stops
//! after validating that the application can be assembled.

use tokio::signal;
use tracing::{error, info};

use bearer_gateway::observability::init_logging;
use bearer_gateway::{GatewayConfig, GatewayResult, GatewayServer};

#[tokio::main]
async fn main() {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed");
        eprintln!("bearer-gateway: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> GatewayResult<()> {
    let config = GatewayConfig::load().await?;
    init_logging(&config.logging, &config.server.service_name)?;

    info!("Starting {}", config.server.service_name);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(upstream = %config.upstream.base_url()?, mode = ?config.server.mode, "Configuration loaded");

    let server = GatewayServer::new(config)?;

    if !server.config().server.mode.binds_listener() {
        info!("Managed deployment detected, the hosting platform owns the listener");
        return Ok(());
    }

    server.start(shutdown_signal()).await?;

    info!("Gateway shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
