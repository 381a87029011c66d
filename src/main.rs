//! Gateway entry point: one binary, one subcommand per tier.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use db_gateway::config::loader::load_config;
use db_gateway::config::GatewayConfig;
use db_gateway::observability::{logging, metrics};
use db_gateway::proxy::ProxyService;
use db_gateway::trusted_host::TrustedHost;
use db_gateway::{gatekeeper, proxy, trusted_host};

#[derive(Parser)]
#[command(name = "db-gateway", about = "Three-tier SQL request-routing gateway")]
struct Cli {
    /// Path to a TOML config file; built-in defaults are used when absent.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    tier: Tier,
}

#[derive(Subcommand)]
enum Tier {
    /// Externally reachable perimeter service.
    Gatekeeper,
    /// Internal relay between Gatekeeper and Proxy.
    TrustedHost,
    /// Routing engine in front of the database cluster.
    Proxy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_tracing(&config.observability.log_level);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.tier {
        Tier::Gatekeeper => {
            let state = Arc::new(gatekeeper::Gatekeeper::new(&config));
            tracing::info!("Starting Gatekeeper service");
            serve(&config.gatekeeper.bind_address, gatekeeper::router(state)).await?;
        }
        Tier::TrustedHost => {
            let state = Arc::new(TrustedHost::new(&config));
            tracing::info!("Starting Trusted Host service");
            serve(&config.trusted_host.bind_address, trusted_host::router(state)).await?;
        }
        Tier::Proxy => {
            let state = Arc::new(ProxyService::new(&config));
            tracing::info!("Starting Proxy service");
            serve(&config.proxy.bind_address, proxy::router(state)).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(bind_address: &str, app: axum::Router) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
