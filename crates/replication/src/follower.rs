//! Follower-side application of leader updates

use crate::cluster::ClusterView;
use crate::error::ReplicationError;
use crate::messages::ReplicateUpdate;
use crate::recovery;
use crate::transport::PeerTransport;
use order_ledger::OrderLedger;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What `apply_update` did with an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Appended directly
    Appended,
    /// The exact record is already in our log
    Duplicate,
    /// Gap found; this many records pulled from the leader
    Recovered(usize),
    /// We are the leader, updates are not for us
    IgnoredAsLeader,
}

/// Applies updates on a non-leader node
pub struct Follower {
    ledger: Arc<OrderLedger>,
    cluster: Arc<ClusterView>,
    transport: Arc<dyn PeerTransport>,
    /// Serialises updates so a catch-up never races a direct append
    apply_gate: Mutex<()>,
}

impl Follower {
    pub fn new(
        ledger: Arc<OrderLedger>,
        cluster: Arc<ClusterView>,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            ledger,
            cluster,
            transport,
            apply_gate: Mutex::new(()),
        }
    }

    /// Apply one update from the leader
    ///
    /// - the identical record is already logged: duplicate, no-op
    /// - a different record under the same number: divergence
    /// - first cluster transaction on an empty log, or our tail equals the
    ///   leader's previous number: append
    /// - anything else: adopt the sender as leader and sync from it; the
    ///   recovered suffix already contains the update's record. A tail the
    ///   leader does not know comes back as [`ReplicationError::Divergence`].
    pub async fn apply_update(
        &self,
        update: ReplicateUpdate,
    ) -> Result<ApplyOutcome, ReplicationError> {
        if self.cluster.is_leader() {
            tracing::warn!(
                "Leader received replication update for transaction {}, ignoring",
                update.successful_order_data.txn_number
            );
            return Ok(ApplyOutcome::IgnoredAsLeader);
        }

        let _gate = self.apply_gate.lock().await;
        let record = update.successful_order_data;
        let last = self.ledger.last_transaction_number();

        match self.ledger.find_by_number(record.txn_number) {
            Some(existing) if existing == record => {
                tracing::debug!(
                    "Transaction {} already applied (tail {:?})",
                    record.txn_number,
                    last
                );
                return Ok(ApplyOutcome::Duplicate);
            }
            Some(existing) => {
                tracing::error!(
                    "Transaction {} differs from our copy: leader has {:?}, we have {:?}",
                    record.txn_number,
                    record,
                    existing
                );
                return Err(ReplicationError::Divergence(record.txn_number));
            }
            None => {}
        }

        if last == update.previous_txn_num {
            match last {
                None => tracing::info!("Applying first cluster transaction {}", record.txn_number),
                Some(_) => tracing::debug!("Applying transaction {}", record.txn_number),
            }
            self.ledger.append(record)?;
            return Ok(ApplyOutcome::Appended);
        }

        tracing::warn!(
            "Log mismatch on transaction {}: leader's previous is {:?}, our tail is {:?}",
            record.txn_number,
            update.previous_txn_num,
            last
        );
        let leader = update.current_leader_details;
        self.cluster.adopt_leader(leader.clone());
        let recovered = recovery::catch_up(&self.ledger, self.transport.as_ref(), &leader).await?;
        Ok(ApplyOutcome::Recovered(recovered))
    }
}
