//! Forwarding HTTP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ net::listener ──▶ http::server (one task per connection)
//!                                     │
//!                                     ▼
//!                      http::frame + http::request (first read only)
//!                                     │
//!                    CONNECT ┌────────┴────────┐ other methods
//!                            ▼                 ▼
//!                      http::tunnel       http::relay ──────▶ Destination
//!                            │                 │
//!                            └──▶ http::forward ◀┘
//!                                 (codec::xor on each chunk body)
//! ```

use std::path::PathBuf;

use clap::Parser;

use forward_proxy::config::{load_config, ProxyConfig};
use forward_proxy::lifecycle::{self, signals};
use forward_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "forward-proxy")]
#[command(about = "Forwarding HTTP proxy with CONNECT tunnelling and body obfuscation", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability)?;

    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?cli.config,
        host = %config.listener.host,
        port = config.listener.port,
        max_pending_connections = config.listener.max_pending_connections,
        buffer_size = config.forwarding.buffer_size,
        "Configuration loaded"
    );

    if let Some(addr) = config.observability.metrics_listen_addr()? {
        metrics::init_metrics(addr);
    }

    let proxy = lifecycle::start(config).await?;

    signals::shutdown_signal().await;
    proxy.shutdown().await;

    tracing::info!("Server stopped");
    Ok(())
}
