//! Gateway configuration

use crate::error::GatewayError;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use trade_types::{Roster, RosterEntry};

/// Gateway configuration, loadable from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Catalog address (host:port)
    pub catalog_addr: String,
    /// Every order node; the instance id doubles as election priority
    pub order_nodes: Vec<RosterEntry>,
    /// Cache catalog quotes until the catalog invalidates them
    pub enable_cache: bool,
    /// Timeout for each outbound request
    pub request_timeout_ms: u64,
    /// Failover retry budget
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            catalog_addr: "127.0.0.1:9020".to_string(),
            order_nodes: Vec::new(),
            enable_cache: true,
            request_timeout_ms: 3_000,
            retry: RetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Order nodes keyed by instance id; duplicate ids are rejected
    pub fn roster(&self) -> Result<Roster, GatewayError> {
        if self.order_nodes.is_empty() {
            return Err(GatewayError::Config("no order nodes configured".to_string()));
        }
        let mut roster = Roster::new();
        for node in &self.order_nodes {
            if roster.insert(node.instance_id, node.clone()).is_some() {
                return Err(GatewayError::Config(format!(
                    "order node {} listed twice",
                    node.instance_id
                )));
            }
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "port": 8100,
                "enable_cache": false,
                "order_nodes": [
                    {{"instance_id": 1, "host": "10.0.0.1", "port": 8001}},
                    {{"instance_id": 2, "host": "10.0.0.2", "port": 8002}}
                ],
                "retry": {{"max_attempts": 3}}
            }}"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8100);
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.enable_cache);
        assert_eq!(config.retry.max_attempts, 3);

        let roster = config.roster().unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[&2].base_url(), "http://10.0.0.2:8002");
    }

    #[test]
    fn test_roster_rejects_duplicates_and_empty() {
        let mut config = GatewayConfig::default();
        assert!(config.roster().is_err());

        config.order_nodes = vec![
            "1=127.0.0.1:8001".parse().unwrap(),
            "1=127.0.0.1:8002".parse().unwrap(),
        ];
        assert!(matches!(config.roster(), Err(GatewayError::Config(_))));
    }
}
