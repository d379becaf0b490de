//! Leader directory: the gateway's view of who leads the order cluster

use crate::election::{ElectionPolicy, LeaderAnnouncer, LivenessProbe};
use crate::error::GatewayError;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use trade_types::{NodeId, NotifyRequest, Roster, RosterEntry};

pub struct LeaderDirectory {
    roster: Roster,
    policy: Box<dyn ElectionPolicy>,
    probe: Arc<dyn LivenessProbe>,
    announcer: Arc<dyn LeaderAnnouncer>,
    leader: RwLock<Option<RosterEntry>>,
    /// One election at a time; counts completed elections
    elections: Mutex<u64>,
}

impl LeaderDirectory {
    pub fn new(
        roster: Roster,
        policy: Box<dyn ElectionPolicy>,
        probe: Arc<dyn LivenessProbe>,
        announcer: Arc<dyn LeaderAnnouncer>,
    ) -> Self {
        Self {
            roster,
            policy,
            probe,
            announcer,
            leader: RwLock::new(None),
            elections: Mutex::new(0),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn leader(&self) -> Option<RosterEntry> {
        self.leader.read().clone()
    }

    pub async fn election_count(&self) -> u64 {
        *self.elections.lock().await
    }

    /// Probe candidates in policy order; the first live one becomes leader
    ///
    /// Unreachable candidates are skipped, not retried within the pass.
    pub async fn elect_leader(&self) -> Result<RosterEntry, GatewayError> {
        for candidate in self.policy.candidates(&self.roster) {
            if self.probe.is_alive(&candidate).await {
                tracing::info!(
                    "Elected order node {} ({}:{}) as leader",
                    candidate.instance_id,
                    candidate.host,
                    candidate.port
                );
                *self.leader.write() = Some(candidate.clone());
                return Ok(candidate);
            }
            tracing::warn!("Order node {} is not alive, skipping", candidate.instance_id);
        }

        tracing::error!("All order service instances are down");
        *self.leader.write() = None;
        Err(GatewayError::NoLiveNode)
    }

    /// Tell every roster node who leads, along with the full roster
    ///
    /// Returns how many nodes acknowledged. Failures are logged only.
    pub async fn announce_leader(&self, leader: &RosterEntry) -> usize {
        let notify = NotifyRequest {
            leader: leader.instance_id,
            all_order_nodes: self.roster.clone(),
        };

        let deliveries = self.roster.values().map(|node| {
            let notify = &notify;
            async move { (node.instance_id, self.announcer.notify(node, notify).await) }
        });

        let mut acknowledged = 0;
        for (id, result) in join_all(deliveries).await {
            match result {
                Ok(()) => acknowledged += 1,
                Err(e) => tracing::warn!("Failed to notify order node {}: {}", id, e),
            }
        }
        tracing::info!(
            "Announced leader {} to {}/{} order nodes",
            leader.instance_id,
            acknowledged,
            self.roster.len()
        );
        acknowledged
    }

    /// Current leader, or a fresh election when there is none or when the
    /// current one is `stale`
    ///
    /// Concurrent callers that saw the same stale leader trigger a single
    /// election; the others pick up its result.
    pub async fn current_or_elect(
        &self,
        stale: Option<NodeId>,
    ) -> Result<RosterEntry, GatewayError> {
        let mut elections = self.elections.lock().await;

        if let Some(leader) = self.leader() {
            if stale != Some(leader.instance_id) {
                return Ok(leader);
            }
            tracing::warn!("Leader {} is unresponsive, re-electing", leader.instance_id);
        }

        let leader = self.elect_leader().await?;
        self.announce_leader(&leader).await;
        *elections += 1;
        Ok(leader)
    }
}
