//! fx-gateway: currency conversion service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ security::rate_limit ──▶ http::convert
//!                                                                   │
//!                                                                   ▼
//!                                                        conversion::Converter
//!                                                                   │
//!                                                                   ▼
//!                                                   resilience::CircuitBreaker
//!                                                    (latency window, phases)
//!                                                                   │
//!                                                                   ▼
//!                     rates::RateRefresher ─────────────▶ rates::RateCache
//!                       (periodic, backoff)            (single-flight refresh)
//!                                                                   │
//!                                                                   ▼
//!                                                      rates::HttpRateFetcher ──▶ Rate feed
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use fx_gateway::config::load_or_default;
use fx_gateway::lifecycle::{build_rate_cache, spawn_signal_handler, Shutdown};
use fx_gateway::observability::{logging, metrics};
use fx_gateway::rates::RateRefresher;
use fx_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "fx-gateway", version, about = "Currency conversion gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "FX_GATEWAY_CONFIG", default_value = "fx-gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The subscriber is not installed yet; config errors go to stderr.
    let config = match load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fx-gateway: invalid configuration {}: {e}", args.config.display());
            std::process::exit(2);
        }
    };
    logging::init_logging(&config.observability);

    tracing::info!("fx-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %args.config.display(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_ms = config.upstream.timeout_ms,
        stale_after_secs = config.cache.stale_after_secs,
        "Configuration loaded"
    );

    // Initialize metrics server
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let cache = match build_rate_cache(&config).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let refresher = RateRefresher::new(cache.clone(), &config.cache);
    let refresher_handle = tokio::spawn(refresher.run(shutdown.subscribe()));

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let server = HttpServer::new(config, cache);
    let mut server_handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let mut stopping = shutdown.subscribe();
    tokio::select! {
        result = &mut server_handle => {
            // Server exited on its own; stop the background tasks too.
            shutdown.trigger();
            result??;
        }
        _ = stopping.recv() => {
            match tokio::time::timeout(grace, &mut server_handle).await {
                Ok(result) => result??,
                Err(_) => tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "In-flight requests did not drain in time, exiting"
                ),
            }
        }
    }

    let _ = refresher_handle.await;
    tracing::info!("Shutdown complete");
    Ok(())
}
