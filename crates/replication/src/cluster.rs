//! Cluster view held by each order node
//!
//! The gateway is authoritative for membership and leadership; a node only
//! keeps the copy it was last told about.

use crate::error::ReplicationError;
use parking_lot::RwLock;
use trade_types::{LeaderInfo, NodeId, NotifyRequest, Roster, RosterEntry};

#[derive(Debug, Default)]
struct ClusterState {
    leader: Option<LeaderInfo>,
    roster: Roster,
}

/// This node's identity plus its cached leader reference and roster
#[derive(Debug)]
pub struct ClusterView {
    self_id: NodeId,
    state: RwLock<ClusterState>,
}

impl ClusterView {
    pub fn new(self_id: NodeId) -> Self {
        Self {
            self_id,
            state: RwLock::new(ClusterState::default()),
        }
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    /// Take over the gateway's announcement: new leader and full roster
    pub fn apply_notify(&self, notify: NotifyRequest) -> Result<LeaderInfo, ReplicationError> {
        let leader = notify
            .all_order_nodes
            .values()
            .find(|entry| entry.instance_id == notify.leader)
            .map(LeaderInfo::from)
            .ok_or(ReplicationError::UnknownLeader(notify.leader))?;

        let mut state = self.state.write();
        state.leader = Some(leader.clone());
        state.roster = notify.all_order_nodes;
        Ok(leader)
    }

    /// Replace the leader reference (a follower learning it from an update)
    pub fn adopt_leader(&self, leader: LeaderInfo) {
        let mut state = self.state.write();
        if state.leader.as_ref() != Some(&leader) {
            tracing::info!("Adopting node {} as leader", leader.instance_id);
            state.leader = Some(leader);
        }
    }

    pub fn leader(&self) -> Option<LeaderInfo> {
        self.state.read().leader.clone()
    }

    pub fn is_leader(&self) -> bool {
        self.state
            .read()
            .leader
            .as_ref()
            .map_or(false, |l| l.instance_id == self.self_id)
    }

    pub fn roster(&self) -> Roster {
        self.state.read().roster.clone()
    }

    /// Every roster entry except this node
    pub fn followers(&self) -> Vec<RosterEntry> {
        self.state
            .read()
            .roster
            .values()
            .filter(|entry| entry.instance_id != self.self_id)
            .cloned()
            .collect()
    }
}
