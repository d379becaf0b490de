//! Order node configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use trade_types::NodeId;

/// Order node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Instance id, also the node's election priority
    pub instance_id: NodeId,
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Directory holding `order_log_{instance_id}.jsonl`
    pub data_dir: PathBuf,
    /// Catalog address (host:port)
    pub catalog_addr: String,
    /// Timeout for outbound calls (catalog, peers)
    pub rpc_timeout_ms: u64,
}

impl NodeConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            instance_id: 1,
            host: "127.0.0.1".to_string(),
            port: 8001,
            data_dir: PathBuf::from("./data"),
            catalog_addr: "127.0.0.1:9020".to_string(),
            rpc_timeout_ms: 5_000,
        }
    }
}
