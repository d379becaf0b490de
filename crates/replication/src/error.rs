//! Replication errors

use order_ledger::LedgerError;
use trade_types::{NodeId, TxnNumber};

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Network error talking to {target}: {reason}")]
    Network { target: String, reason: String },

    #[error("Peer {target} answered {status}: {message}")]
    Rejected {
        target: String,
        status: u16,
        message: String,
    },

    /// The follower's baseline is not in the leader's log. Not recoverable
    /// without an operator.
    #[error("Log divergence: transaction {0} is not in the leader's log")]
    Divergence(TxnNumber),

    #[error("Leader {0} is not part of the announced roster")]
    UnknownLeader(NodeId),

    #[error("No leader known yet")]
    NoLeader,
}
