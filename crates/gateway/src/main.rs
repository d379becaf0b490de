//! Gateway
//!
//! Client entry point for the trading backend. Elects the order leader at
//! startup and fails over whenever it stops answering.

use anyhow::{Context, Result};
use clap::Parser;
use gateway::{GatewayConfig, GatewayServer, GatewayState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trade_types::RosterEntry;

/// Trading gateway
#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "Client-facing gateway with order leader failover", long_about = None)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(long)]
    port: Option<u16>,

    /// Catalog address (host:port)
    #[arg(long)]
    catalog_addr: Option<String>,

    /// Order node as ID=HOST:PORT, repeatable
    #[arg(long = "order-node")]
    order_nodes: Vec<RosterEntry>,

    /// Disable the quote cache
    #[arg(long)]
    no_cache: bool,

    /// Attempts per request before giving up on the order cluster
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)?,
            None => GatewayConfig::default(),
        };
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(addr) = self.catalog_addr {
            config.catalog_addr = addr;
        }
        if !self.order_nodes.is_empty() {
            config.order_nodes = self.order_nodes;
        }
        if self.no_cache {
            config.enable_cache = false;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.into_config()?;
    tracing::info!("Starting gateway");
    tracing::info!("  Address: {}", config.bind_addr());
    tracing::info!("  Catalog: {}", config.catalog_addr);
    tracing::info!("  Order nodes: {}", config.order_nodes.len());
    tracing::info!("  Quote cache: {}", if config.enable_cache { "on" } else { "off" });

    let state = GatewayState::from_config(&config)?;

    // Nothing can be served without an order leader
    state
        .directory()
        .current_or_elect(None)
        .await
        .context("leader election at startup failed")?;

    let server = GatewayServer::new(state);
    let addr = config.bind_addr();
    tokio::select! {
        result = server.run(&addr) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down gateway..."),
    }

    Ok(())
}
