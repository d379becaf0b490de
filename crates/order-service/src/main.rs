//! Order node
//!
//! One replica of the order ledger. The gateway decides which replica
//! leads; this process only follows the `/notify` it receives.

use anyhow::{bail, Result};
use clap::Parser;
use order_service::{NodeConfig, OrderNode, OrderServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Order service replica
#[derive(Parser, Debug)]
#[command(name = "order-node")]
#[command(about = "Replicated order ledger node", long_about = None)]
struct Args {
    /// Instance id; higher ids win leader elections
    #[arg(long)]
    instance_id: u32,

    /// Bind host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bind port
    #[arg(long)]
    port: u16,

    /// Directory for the order log
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Catalog address (host:port)
    #[arg(long, default_value = "127.0.0.1:9020")]
    catalog_addr: String,

    /// Timeout for catalog and peer requests, in milliseconds
    #[arg(long, default_value = "5000")]
    rpc_timeout_ms: u64,

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

    let config = NodeConfig {
        instance_id: args.instance_id,
        host: args.host,
        port: args.port,
        data_dir: args.data_dir,
        catalog_addr: args.catalog_addr,
        rpc_timeout_ms: args.rpc_timeout_ms,
    };

    tracing::info!("Starting order node {}", config.instance_id);
    tracing::info!("  Address: {}", config.bind_addr());
    tracing::info!("  Catalog: {}", config.catalog_addr);

    let node = OrderNode::open(&config)?;
    let mut fatal = node.fatal_signal();
    let server = OrderServer::new(node.clone());
    let addr = config.bind_addr();

    tokio::select! {
        result = server.run(&addr) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down order node..."),
        changed = fatal.wait_for(|reason| reason.is_some()) => {
            let reason = changed
                .ok()
                .and_then(|reason| (*reason).clone())
                .unwrap_or_else(|| "fatal signal dropped".to_string());
            bail!("Order node {} stopping: {}", config.instance_id, reason);
        }
    }

    let stats = node.replication_stats();
    tracing::info!(
        "Replication: {} queued, {} broadcast, {} failed deliveries",
        stats.updates_queued,
        stats.updates_broadcast,
        stats.deliveries_failed
    );
    Ok(())
}
