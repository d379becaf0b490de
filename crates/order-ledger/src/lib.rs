//! Order Ledger - the per-node transaction log
//!
//! This crate owns the order node's durable state:
//! - An append-only list of committed trades, strictly ordered by number
//! - The transaction counter (highest number applied on this node)
//! - A line-structured log file rewritten after every mutation

pub mod error;
pub mod ledger;
pub mod persistence;

pub use error::LedgerError;
pub use ledger::OrderLedger;
pub use persistence::{FileLogStore, LogStore, MemoryLogStore};

/// File name of the log for a given instance
pub fn log_file_name(instance_id: trade_types::NodeId) -> String {
    format!("order_log_{}.jsonl", instance_id)
}
