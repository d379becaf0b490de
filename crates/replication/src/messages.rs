//! Message types exchanged between order nodes

use serde::{Deserialize, Serialize};
use trade_types::{LeaderInfo, TxnNumber, TxnRecord};

/// Leader → follower: one freshly committed trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateUpdate {
    /// The committed record
    pub successful_order_data: TxnRecord,
    /// Leader's tail before this record was appended. `None` only for the
    /// first transaction the cluster ever committed.
    pub previous_txn_num: Option<TxnNumber>,
    /// Who sent it, so a lagging follower knows where to sync from
    pub current_leader_details: LeaderInfo,
}

/// Where a follower's log ends, as sent in a sync request
///
/// `Empty` (no history at all) is deliberately a different value from any
/// transaction number, and unrelated to `previous_txn_num: None` in
/// [`ReplicateUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncBaseline {
    /// The follower holds no transactions
    Empty,
    /// The follower holds everything up to and including `txn`
    After { txn: TxnNumber },
}

impl SyncBaseline {
    /// Baseline for a follower whose tail is `last`
    pub fn from_last(last: Option<TxnNumber>) -> Self {
        match last {
            Some(txn) => SyncBaseline::After { txn },
            None => SyncBaseline::Empty,
        }
    }

    pub fn last(self) -> Option<TxnNumber> {
        match self {
            SyncBaseline::Empty => None,
            SyncBaseline::After { txn } => Some(txn),
        }
    }
}

/// Follower → leader catch-up request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub last_txn: SyncBaseline,
}

/// Leader → follower: everything after the requested baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub all_missed_txns: Vec<TxnRecord>,
}
