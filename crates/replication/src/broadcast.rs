//! Leader-side broadcast of committed trades
//!
//! Updates are queued in commit order and delivered by a single background
//! task. Each update fans out to every follower concurrently; a failed
//! delivery is logged and dropped.

use crate::cluster::ClusterView;
use crate::error::ReplicationError;
use crate::messages::ReplicateUpdate;
use crate::transport::PeerTransport;
use order_ledger::OrderLedger;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use trade_types::{NodeId, TradeRequest, TxnNumber, TxnRecord};

/// Outcome of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<NodeId>,
    pub failed: Vec<NodeId>,
}

/// Counters about the leader's broadcasts
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplicationStats {
    pub updates_queued: u64,
    pub updates_broadcast: u64,
    pub deliveries_failed: u64,
}

/// Send `update` to every follower in the cluster view
pub async fn broadcast_trade(
    cluster: &ClusterView,
    transport: &dyn PeerTransport,
    update: &ReplicateUpdate,
) -> BroadcastReport {
    let followers = cluster.followers();
    let sends = followers.iter().map(|follower| async move {
        let result = transport.send_update(follower, update).await;
        (follower.instance_id, result)
    });

    let mut report = BroadcastReport::default();
    for (id, result) in futures::future::join_all(sends).await {
        match result {
            Ok(()) => report.delivered.push(id),
            Err(e) => {
                tracing::warn!(
                    "Failed to replicate transaction {} to node {}: {}",
                    update.successful_order_data.txn_number,
                    id,
                    e
                );
                report.failed.push(id);
            }
        }
    }
    report
}

/// Leader replication handle
pub struct Replicator {
    /// Queue drained by the broadcast task
    tx: mpsc::UnboundedSender<ReplicateUpdate>,
    /// Keeps commit order and queue order identical
    sequencer: Mutex<()>,
    cluster: Arc<ClusterView>,
    stats: Arc<RwLock<ReplicationStats>>,
}

impl Replicator {
    /// Create the handle and spawn its broadcast task
    pub fn start(
        cluster: Arc<ClusterView>,
        transport: Arc<dyn PeerTransport>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ReplicateUpdate>();
        let stats = Arc::new(RwLock::new(ReplicationStats::default()));

        let task_cluster = cluster.clone();
        let task_stats = stats.clone();
        let handle = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let report = broadcast_trade(&task_cluster, transport.as_ref(), &update).await;
                tracing::debug!(
                    "Transaction {} replicated to {} followers ({} failed)",
                    update.successful_order_data.txn_number,
                    report.delivered.len(),
                    report.failed.len()
                );

                {
                    let mut stats = task_stats.write();
                    stats.updates_broadcast += 1;
                    stats.deliveries_failed += report.failed.len() as u64;
                }
            }
            tracing::info!("Broadcast queue closed");
        });

        let replicator = Self {
            tx,
            sequencer: Mutex::new(()),
            cluster,
            stats,
        };
        (replicator, handle)
    }

    /// Commit a catalog-confirmed trade and queue it for broadcast
    pub fn commit_trade(
        &self,
        ledger: &OrderLedger,
        trade: &TradeRequest,
    ) -> Result<TxnRecord, ReplicationError> {
        let _order = self.sequencer.lock();
        let (record, previous) = ledger.commit(&trade.name, trade.order_type, trade.quantity)?;
        self.broadcast_trade(record.clone(), previous);
        Ok(record)
    }

    /// Queue `record` for delivery to every follower
    ///
    /// Never blocks and never fails the caller.
    pub fn broadcast_trade(&self, record: TxnRecord, previous: Option<TxnNumber>) {
        let Some(leader) = self.cluster.leader() else {
            tracing::warn!(
                "No leader reference, not broadcasting transaction {}",
                record.txn_number
            );
            return;
        };

        let update = ReplicateUpdate {
            successful_order_data: record,
            previous_txn_num: previous,
            current_leader_details: leader,
        };
        if self.tx.send(update).is_err() {
            tracing::error!("Broadcast task is gone, update dropped");
            return;
        }
        self.stats.write().updates_queued += 1;
    }

    pub fn stats(&self) -> ReplicationStats {
        self.stats.read().clone()
    }
}
