//! Shared types for the trading services
//!
//! Wire and data types used by the gateway, the catalog and the order
//! nodes. Everything here is plain serde data with no behaviour beyond
//! small conversions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Transaction number assigned by the order leader (starts at 1)
pub type TxnNumber = u64;

/// Order node identity. Doubles as election priority: higher wins.
pub type NodeId = u32;

/// Full order-node membership, keyed by instance id
pub type Roster = BTreeMap<NodeId, RosterEntry>;

/// Side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Buy,
    Sell,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Buy => f.write_str("buy"),
            OrderType::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderType::Buy),
            "sell" => Ok(OrderType::Sell),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

/// A committed trade. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRecord {
    pub txn_number: TxnNumber,
    pub stock_name: String,
    pub order_type: OrderType,
    pub quantity: u32,
}

/// Trade request body, shared by the client → gateway, gateway → leader
/// and leader → catalog hops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: u32,
}

/// Successful trade answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub transaction_number: TxnNumber,
}

/// Query answer for a single order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub number: TxnNumber,
    pub name: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: u32,
}

impl From<&TxnRecord> for OrderView {
    fn from(record: &TxnRecord) -> Self {
        Self {
            number: record.txn_number,
            name: record.stock_name.clone(),
            order_type: record.order_type,
            quantity: record.quantity,
        }
    }
}

/// Roster entry for one order node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub instance_id: NodeId,
    pub host: String,
    pub port: u16,
}

impl RosterEntry {
    pub fn new(instance_id: NodeId, host: impl Into<String>, port: u16) -> Self {
        Self {
            instance_id,
            host: host.into(),
            port,
        }
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl FromStr for RosterEntry {
    type Err = String;

    /// Parses `ID=HOST:PORT`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, addr) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=HOST:PORT, got {s}"))?;
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| format!("expected HOST:PORT, got {addr}"))?;
        let instance_id = id
            .trim()
            .parse::<NodeId>()
            .map_err(|e| format!("invalid instance id {id}: {e}"))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port {port}: {e}"))?;
        Ok(Self::new(instance_id, host, port))
    }
}

/// Who the order leader is, as known by a gateway or an order node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderInfo {
    pub instance_id: NodeId,
    pub host: String,
    pub port: u16,
}

impl LeaderInfo {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl From<&RosterEntry> for LeaderInfo {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            instance_id: entry.instance_id,
            host: entry.host.clone(),
            port: entry.port,
        }
    }
}

/// Leader announcement sent by the gateway to every order node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub leader: NodeId,
    pub all_order_nodes: Roster,
}

/// Liveness probe answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub instance_id: NodeId,
    pub status: String,
}

/// Cache invalidation sent by the catalog to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateRequest {
    pub name: String,
}

/// Success envelope: `{"data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Failure envelope: `{"error": {"code", "message"}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}
