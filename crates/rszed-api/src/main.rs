//! rszed server binary.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! rszed --config config.yaml
//!
//! # With environment variables only
//! RSZED_SERVER__PORT=9090 rszed
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rszed_api::http::{create_router, AppState};
use rszed_api::observability::{init_logging, LoggingConfig};
use rszed_domain::cache::register_cache_metrics;
use rszed_server::ServerConfig;
use rszed_storage::MemoryDataStore;

/// rszed - revision-consistent watch server
#[derive(Parser, Debug)]
#[command(name = "rszed")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig::from_settings(&config.logging));
    info!(version = env!("CARGO_PKG_VERSION"), "Starting rszed server");

    register_cache_metrics();
    if config.dispatch_cache.enabled {
        info!(
            max_capacity = config.dispatch_cache.max_capacity,
            ttl_secs = config.dispatch_cache.ttl_secs,
            "Dispatch cache enabled"
        );
    }

    let storage = Arc::new(MemoryDataStore::with_config(config.watch.to_memory_config()));
    info!("Using in-memory storage backend");

    let shutdown = CancellationToken::new();
    let state = AppState::with_cache_config(storage, config.dispatch_cache.to_cache_config())
        .with_response_buffer(config.watch.response_buffer)
        .with_shutdown(shutdown.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    run_http_server(create_router(state), addr, shutdown).await
}

/// Run the HTTP server with graceful shutdown.
///
/// Open watch streams never end on their own, so the shutdown token is
/// cancelled before axum waits for in-flight responses.
async fn run_http_server(
    router: axum::Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("HTTP server received shutdown signal");
            shutdown.cancel();
        })
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
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
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
