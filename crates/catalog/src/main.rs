//! Catalog service
//!
//! Serves stock lookups and executes trades against the inventory file.

use anyhow::Result;
use catalog::{CatalogServer, Inventory};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Stock catalog service
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(about = "Inventory service for the trading backend", long_about = None)]
struct Args {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1:9020")]
    addr: String,

    /// Inventory file (JSON array of {name, price, quantity})
    #[arg(long, default_value = "./data/catalog.json")]
    data_file: PathBuf,

    /// Gateway address (host:port) to send cache invalidations to
    #[arg(long)]
    frontend_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
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

    tracing::info!("Starting catalog service");
    tracing::info!("  Address: {}", args.addr);
    tracing::info!("  Inventory: {:?}", args.data_file);

    let inventory = Arc::new(Inventory::open(&args.data_file)?);
    let frontend_url = args.frontend_addr.map(|addr| format!("http://{}", addr));
    if let Some(url) = &frontend_url {
        tracing::info!("  Cache invalidations go to {}", url);
    }

    let server = CatalogServer::new(inventory, frontend_url);
    tokio::select! {
        result = server.run(&args.addr) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down catalog..."),
    }

    Ok(())
}
