//! Portico: static files and service gateway on one port.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                   PORTICO                      │
//!     Client Request      │  ┌─────────┐    ┌──────────┐                   │
//!     ────────────────────┼─▶│  http   │───▶│ dispatch │──┬─▶ proxy ───────┼──▶ Upstream (HTTP)
//!                         │  │ server  │    │ (routing)│  ├─▶ websocket ───┼══▶ Upstream (WSS)
//!                         │  └─────────┘    └──────────┘  └─▶ static ──────┼──▶ Filesystem
//!                         │                                                │
//!                         │  ┌──────────────────────────────────────────┐  │
//!                         │  │ config · discovery · net (TLS, client)   │  │
//!                         │  │ observability · lifecycle                │  │
//!                         │  └──────────────────────────────────────────┘  │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;

use portico::config::Args;
use portico::lifecycle::signals::spawn_signal_handler;
use portico::observability::{logging, metrics};
use portico::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("portico: {e}");
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability.log_level);
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "portico starting");

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => {
                tracing::error!(metrics_address = %address, "Failed to parse metrics address");
            }
        }
    }

    let port = config.listener.port;
    let server = match HttpServer::new(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
