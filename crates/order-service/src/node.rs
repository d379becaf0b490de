//! Order node: ledger, cluster view and replication roles in one place

use crate::config::NodeConfig;
use crate::error::ApiError;
use catalog::CatalogClient;
use order_ledger::{FileLogStore, OrderLedger};
use order_replication::{
    serve_sync, ApplyOutcome, ClusterView, Follower, HttpTransport, PeerTransport,
    ReplicateUpdate, ReplicationError, ReplicationStats, Replicator, SyncRequest, SyncResponse,
};
use std::sync::Arc;
use tokio::sync::watch;
use trade_types::{
    HealthStatus, LeaderInfo, NodeId, NotifyRequest, OrderView, TradeReceipt, TradeRequest,
    TxnNumber,
};

/// One order service replica
///
/// Every node runs both roles. Whether `trade` and `sync` are accepted
/// depends on the leader reference last pushed by `/notify`.
pub struct OrderNode {
    ledger: Arc<OrderLedger>,
    cluster: Arc<ClusterView>,
    follower: Follower,
    replicator: Replicator,
    catalog: CatalogClient,
    /// Set once the node has found its log inconsistent with the leader's
    fatal: watch::Sender<Option<String>>,
}

impl OrderNode {
    /// Wire a node from its parts. Spawns the broadcast task.
    pub fn new(
        instance_id: NodeId,
        ledger: Arc<OrderLedger>,
        catalog: CatalogClient,
        transport: Arc<dyn PeerTransport>,
    ) -> Arc<Self> {
        let cluster = Arc::new(ClusterView::new(instance_id));
        let follower = Follower::new(ledger.clone(), cluster.clone(), transport.clone());
        let (replicator, _broadcast_task) = Replicator::start(cluster.clone(), transport);
        let (fatal, _) = watch::channel(None);

        Arc::new(Self {
            ledger,
            cluster,
            follower,
            replicator,
            catalog,
            fatal,
        })
    }

    /// Open the on-disk ledger and build an HTTP-connected node
    pub fn open(config: &NodeConfig) -> anyhow::Result<Arc<Self>> {
        let store = FileLogStore::open(&config.data_dir, config.instance_id)?;
        tracing::info!("Order log: {:?}", store.path());
        let ledger = Arc::new(OrderLedger::open(store)?);
        tracing::info!(
            "Loaded {} transactions, last {:?}",
            ledger.len(),
            ledger.last_transaction_number()
        );

        let catalog = CatalogClient::new(&config.catalog_addr, config.rpc_timeout())?;
        let transport = Arc::new(HttpTransport::new(config.rpc_timeout())?);
        Ok(Self::new(config.instance_id, ledger, catalog, transport))
    }

    pub fn instance_id(&self) -> NodeId {
        self.cluster.self_id()
    }

    pub fn ledger(&self) -> &Arc<OrderLedger> {
        &self.ledger
    }

    pub fn cluster(&self) -> &Arc<ClusterView> {
        &self.cluster
    }

    pub fn replication_stats(&self) -> ReplicationStats {
        self.replicator.stats()
    }

    /// Receiver that observes the fatal inconsistency signal
    pub fn fatal_signal(&self) -> watch::Receiver<Option<String>> {
        self.fatal.subscribe()
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.borrow().is_some()
    }

    fn trip_fatal(&self, txn: TxnNumber) {
        let reason = format!("order log diverged from the leader at transaction {txn}");
        tracing::error!("{}", reason);
        self.fatal.send_replace(Some(reason));
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            instance_id: self.instance_id(),
            status: "OK".to_string(),
        }
    }

    pub fn notify(&self, notify: NotifyRequest) -> Result<LeaderInfo, ApiError> {
        let leader = self.cluster.apply_notify(notify)?;
        if leader.instance_id == self.instance_id() {
            tracing::info!("Elected leader");
        } else {
            tracing::info!("Following leader {}", leader.instance_id);
        }
        Ok(leader)
    }

    /// Execute a trade against the catalog, then log and replicate it
    ///
    /// Nothing is appended unless the catalog accepted the trade.
    pub async fn trade(&self, trade: TradeRequest) -> Result<TradeReceipt, ApiError> {
        if !self.cluster.is_leader() {
            return Err(ApiError::NotLeader);
        }
        if trade.quantity == 0 {
            return Err(ApiError::BadRequest("invalid quantity".to_string()));
        }

        self.catalog.trade(&trade).await.map_err(|e| {
            tracing::info!("Trade {} {} x{} refused: {}", trade.order_type, trade.name, trade.quantity, e);
            ApiError::from(e)
        })?;

        let record = self.replicator.commit_trade(&self.ledger, &trade)?;
        tracing::info!(
            "Transaction {}: {} {} x{}",
            record.txn_number,
            record.order_type,
            record.stock_name,
            record.quantity
        );
        Ok(TradeReceipt {
            transaction_number: record.txn_number,
        })
    }

    pub fn query(&self, number: TxnNumber) -> Result<OrderView, ApiError> {
        self.ledger
            .find_by_number(number)
            .map(|record| OrderView::from(&record))
            .ok_or_else(|| ApiError::NotFound("invalid number".to_string()))
    }

    pub async fn replicate(&self, update: ReplicateUpdate) -> Result<ApplyOutcome, ApiError> {
        match self.follower.apply_update(update).await {
            Ok(outcome) => Ok(outcome),
            Err(ReplicationError::Divergence(txn)) => {
                self.trip_fatal(txn);
                Err(ApiError::Divergence(txn))
            }
            Err(e) => {
                tracing::warn!("Failed to apply replication update: {}", e);
                Err(e.into())
            }
        }
    }

    /// Serve a follower's catch-up request
    ///
    /// A follower whose history is not a prefix of ours is fatal for the
    /// cluster; the leader stops after answering.
    pub fn sync(&self, request: &SyncRequest) -> Result<SyncResponse, ApiError> {
        if !self.cluster.is_leader() {
            return Err(ApiError::NotLeader);
        }
        match serve_sync(&self.ledger, request) {
            Ok(response) => Ok(response),
            Err(ReplicationError::Divergence(txn)) => {
                self.trip_fatal(txn);
                Err(ApiError::Divergence(txn))
            }
            Err(e) => Err(e.into()),
        }
    }
}
