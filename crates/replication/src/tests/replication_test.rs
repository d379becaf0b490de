//! Replication Integration Tests
//!
//! Runs several in-process nodes wired through an in-memory transport:
//! - Convergence of empty followers after sequential commits
//! - Gap detection and recovery after a missed broadcast
//! - Duplicate delivery and leader self-delivery
//! - Divergent follower history, by tail or by record contents
//! - The background broadcast queue

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use order_ledger::{MemoryLogStore, OrderLedger};
use parking_lot::RwLock;
use trade_types::{
    LeaderInfo, NodeId, NotifyRequest, OrderType, Roster, RosterEntry, TradeRequest, TxnRecord,
};

use crate::{
    broadcast_trade, serve_sync, ApplyOutcome, ClusterView, Follower, PeerTransport,
    ReplicateUpdate, ReplicationError, Replicator, SyncRequest, SyncResponse,
};

struct TestNode {
    ledger: Arc<OrderLedger>,
    cluster: Arc<ClusterView>,
    follower: Follower,
}

/// Routes peer calls straight into the target node's handlers
#[derive(Default)]
struct LocalTransport {
    nodes: RwLock<HashMap<NodeId, Arc<TestNode>>>,
    down: RwLock<HashSet<NodeId>>,
}

impl LocalTransport {
    fn node(&self, id: NodeId) -> Result<Arc<TestNode>, ReplicationError> {
        if self.down.read().contains(&id) {
            return Err(ReplicationError::Network {
                target: id.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.nodes
            .read()
            .get(&id)
            .cloned()
            .ok_or(ReplicationError::Network {
                target: id.to_string(),
                reason: "no such node".to_string(),
            })
    }

    fn set_down(&self, id: NodeId, down: bool) {
        if down {
            self.down.write().insert(id);
        } else {
            self.down.write().remove(&id);
        }
    }
}

#[async_trait]
impl PeerTransport for LocalTransport {
    async fn send_update(
        &self,
        target: &RosterEntry,
        update: &ReplicateUpdate,
    ) -> Result<(), ReplicationError> {
        let node = self.node(target.instance_id)?;
        node.follower.apply_update(update.clone()).await?;
        Ok(())
    }

    async fn request_sync(
        &self,
        leader: &LeaderInfo,
        request: &SyncRequest,
    ) -> Result<SyncResponse, ReplicationError> {
        let node = self.node(leader.instance_id)?;
        serve_sync(&node.ledger, request)
    }
}

struct TestCluster {
    transport: Arc<LocalTransport>,
    nodes: HashMap<NodeId, Arc<TestNode>>,
    leader: NodeId,
}

impl TestCluster {
    /// Nodes `1..=size`, the highest id announced as leader
    fn new(size: NodeId) -> Self {
        let transport = Arc::new(LocalTransport::default());
        let roster: Roster = (1..=size)
            .map(|id| (id, RosterEntry::new(id, "127.0.0.1", 9000 + id as u16)))
            .collect();

        let mut nodes = HashMap::new();
        for id in 1..=size {
            let ledger = Arc::new(OrderLedger::open(MemoryLogStore::new()).unwrap());
            let cluster = Arc::new(ClusterView::new(id));
            cluster
                .apply_notify(NotifyRequest {
                    leader: size,
                    all_order_nodes: roster.clone(),
                })
                .unwrap();
            let follower = Follower::new(ledger.clone(), cluster.clone(), transport.clone());
            nodes.insert(
                id,
                Arc::new(TestNode {
                    ledger,
                    cluster,
                    follower,
                }),
            );
        }
        *transport.nodes.write() = nodes.clone();

        Self {
            transport,
            nodes,
            leader: size,
        }
    }

    fn leader(&self) -> &TestNode {
        &self.nodes[&self.leader]
    }

    fn log(&self, id: NodeId) -> Vec<TxnRecord> {
        self.nodes[&id].ledger.snapshot()
    }

    /// Commit on the leader and broadcast synchronously
    async fn commit(&self, name: &str, quantity: u32) -> TxnRecord {
        let leader = self.leader();
        let (record, previous) = leader.ledger.commit(name, OrderType::Buy, quantity).unwrap();
        let update = ReplicateUpdate {
            successful_order_data: record.clone(),
            previous_txn_num: previous,
            current_leader_details: leader.cluster.leader().unwrap(),
        };
        broadcast_trade(&leader.cluster, self.transport.as_ref(), &update).await;
        record
    }
}

fn update_for(cluster: &TestCluster, record: TxnRecord, previous: Option<u64>) -> ReplicateUpdate {
    ReplicateUpdate {
        successful_order_data: record,
        previous_txn_num: previous,
        current_leader_details: cluster.leader().cluster.leader().unwrap(),
    }
}

#[tokio::test]
async fn test_followers_converge_after_sequential_commits() {
    let cluster = TestCluster::new(4);

    for k in 1..=6 {
        cluster.commit("FishCo", k).await;
    }

    let leader_log = cluster.log(4);
    assert_eq!(leader_log.len(), 6);
    for id in 1..=3 {
        assert_eq!(cluster.log(id), leader_log, "node {id} diverged");
        assert_eq!(cluster.nodes[&id].ledger.counter(), Some(6));
    }
}

#[tokio::test]
async fn test_missed_broadcast_is_recovered_on_next_update() {
    let cluster = TestCluster::new(3);
    cluster.commit("FishCo", 1).await;

    cluster.transport.set_down(1, true);
    let report_record = cluster.commit("BoarCo", 2).await;
    assert_eq!(report_record.txn_number, 2);
    assert_eq!(cluster.log(1).len(), 1);

    cluster.transport.set_down(1, false);
    let leader = cluster.leader();
    let (record, previous) = leader.ledger.commit("MenhirCo", OrderType::Sell, 3).unwrap();
    let outcome = cluster.nodes[&1]
        .follower
        .apply_update(update_for(&cluster, record, previous))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Recovered(2));
    assert_eq!(cluster.log(1), cluster.log(3));
    assert_eq!(cluster.nodes[&1].ledger.counter(), Some(3));
}

#[tokio::test]
async fn test_empty_follower_syncs_whole_log() {
    let cluster = TestCluster::new(2);
    cluster.transport.set_down(1, true);
    for k in 1..=3 {
        cluster.commit("FishCo", k).await;
    }
    cluster.transport.set_down(1, false);
    assert!(cluster.log(1).is_empty());

    let record = cluster.commit("FishCo", 4).await;

    assert_eq!(record.txn_number, 4);
    assert_eq!(cluster.log(1), cluster.log(2));
}

#[tokio::test]
async fn test_duplicate_delivery_is_ignored() {
    let cluster = TestCluster::new(2);
    let first = cluster.commit("FishCo", 1).await;
    cluster.commit("FishCo", 2).await;

    let outcome = cluster.nodes[&1]
        .follower
        .apply_update(update_for(&cluster, first, None))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::Duplicate);
    assert_eq!(cluster.log(1), cluster.log(2));
}

#[tokio::test]
async fn test_leader_ignores_updates() {
    let cluster = TestCluster::new(2);
    let record = TxnRecord {
        txn_number: 1,
        stock_name: "FishCo".to_string(),
        order_type: OrderType::Buy,
        quantity: 1,
    };

    let outcome = cluster
        .leader()
        .follower
        .apply_update(update_for(&cluster, record, None))
        .await
        .unwrap();

    assert_eq!(outcome, ApplyOutcome::IgnoredAsLeader);
    assert!(cluster.log(2).is_empty());
}

#[tokio::test]
async fn test_divergent_follower_is_reported() {
    let cluster = TestCluster::new(2);
    cluster.commit("FishCo", 1).await;
    cluster.commit("FishCo", 2).await;

    // follower holds a transaction the leader never issued
    cluster.nodes[&1]
        .ledger
        .append(TxnRecord {
            txn_number: 7,
            stock_name: "Rogue".to_string(),
            order_type: OrderType::Sell,
            quantity: 1,
        })
        .unwrap();
    let before = cluster.log(1);

    let leader = cluster.leader();
    let (record, previous) = leader.ledger.commit("FishCo", OrderType::Buy, 3).unwrap();
    let result = cluster.nodes[&1]
        .follower
        .apply_update(update_for(&cluster, record, previous))
        .await;

    assert!(matches!(result, Err(ReplicationError::Divergence(7))));
    assert_eq!(cluster.log(1), before);
}

#[tokio::test]
async fn test_conflicting_record_is_not_a_duplicate() {
    let cluster = TestCluster::new(2);
    let first = cluster.commit("FishCo", 1).await;

    let forged = TxnRecord {
        stock_name: "BoarCo".to_string(),
        ..first.clone()
    };
    let result = cluster.nodes[&1]
        .follower
        .apply_update(update_for(&cluster, forged, None))
        .await;

    assert!(matches!(result, Err(ReplicationError::Divergence(1))));
    assert_eq!(cluster.log(1), vec![first]);
}

#[tokio::test]
async fn test_unreachable_leader_leaves_follower_untouched() {
    let cluster = TestCluster::new(2);
    cluster.commit("FishCo", 1).await;
    let leader = cluster.leader();
    let (record, previous) = leader.ledger.commit("FishCo", OrderType::Buy, 2).unwrap();
    let (record3, previous3) = leader.ledger.commit("FishCo", OrderType::Buy, 3).unwrap();
    assert_eq!(previous, Some(1));

    cluster.transport.set_down(2, true);
    let result = cluster.nodes[&1]
        .follower
        .apply_update(update_for(&cluster, record3, previous3))
        .await;

    assert!(matches!(result, Err(ReplicationError::Network { .. })));
    assert_eq!(cluster.log(1).len(), 1);
    assert_eq!(record.txn_number, 2);
}

#[tokio::test]
async fn test_replicator_queue_delivers_in_commit_order() {
    let cluster = TestCluster::new(3);
    let leader = cluster.leader();
    let (replicator, _task) = Replicator::start(leader.cluster.clone(), cluster.transport.clone());

    for k in 1..=5 {
        let trade = TradeRequest {
            name: format!("Stock{k}"),
            order_type: OrderType::Buy,
            quantity: k,
        };
        let record = replicator.commit_trade(&leader.ledger, &trade).unwrap();
        assert_eq!(record.txn_number, k as u64);
    }

    let expected = cluster.log(3);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while (cluster.log(1) != expected || cluster.log(2) != expected)
        && tokio::time::Instant::now() < deadline
    {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(cluster.log(1), expected);
    assert_eq!(cluster.log(2), expected);
    let stats = replicator.stats();
    assert_eq!(stats.updates_queued, 5);
    assert_eq!(stats.deliveries_failed, 0);
}
