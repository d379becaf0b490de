//! Recovery sync: a lagging follower pulls the missing suffix from the leader

use crate::error::ReplicationError;
use crate::messages::{SyncBaseline, SyncRequest, SyncResponse};
use crate::transport::PeerTransport;
use order_ledger::{LedgerError, OrderLedger};
use trade_types::LeaderInfo;

/// Leader side: everything after the follower's baseline
///
/// A baseline missing from the leader's log means the follower's history
/// is not a prefix of ours. That is reported as
/// [`ReplicationError::Divergence`]; the caller must treat it as fatal.
pub fn serve_sync(
    ledger: &OrderLedger,
    request: &SyncRequest,
) -> Result<SyncResponse, ReplicationError> {
    let missed = ledger
        .records_after(request.last_txn.last())
        .map_err(|e| match e {
            LedgerError::BaselineNotFound(txn) => ReplicationError::Divergence(txn),
            other => ReplicationError::Ledger(other),
        })?;

    tracing::info!(
        "Serving sync from {:?}: {} missed transactions",
        request.last_txn,
        missed.len()
    );
    Ok(SyncResponse {
        all_missed_txns: missed,
    })
}

/// Follower side: fetch and apply everything after our own tail
///
/// Returns the number of records appended.
pub async fn catch_up(
    ledger: &OrderLedger,
    transport: &dyn PeerTransport,
    leader: &LeaderInfo,
) -> Result<usize, ReplicationError> {
    let request = SyncRequest {
        last_txn: SyncBaseline::from_last(ledger.last_transaction_number()),
    };
    tracing::info!(
        "Syncing from leader {} with baseline {:?}",
        leader.instance_id,
        request.last_txn
    );

    let response = transport.request_sync(leader, &request).await?;
    let appended = ledger.append_batch(response.all_missed_txns)?;

    tracing::info!(
        "Recovered {} transactions, log now ends at {:?}",
        appended,
        ledger.last_transaction_number()
    );
    Ok(appended)
}
