//! Peer transport between order nodes
//!
//! The leader pushes updates with it and followers pull missed
//! transactions with it. The HTTP implementation talks to the order
//! service's `/updateOrderLog` and `/syncOrderData` endpoints.

use crate::error::ReplicationError;
use crate::messages::{ReplicateUpdate, SyncRequest, SyncResponse};
use async_trait::async_trait;
use std::time::Duration;
use trade_types::{ErrorBody, LeaderInfo, RosterEntry};

/// Status a leader answers `/syncOrderData` with when the follower's
/// baseline is not in its log
pub const DIVERGENCE_STATUS: u16 = 422;

#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Deliver one update to a follower
    async fn send_update(
        &self,
        target: &RosterEntry,
        update: &ReplicateUpdate,
    ) -> Result<(), ReplicationError>;

    /// Ask the leader for everything after the request's baseline
    async fn request_sync(
        &self,
        leader: &LeaderInfo,
        request: &SyncRequest,
    ) -> Result<SyncResponse, ReplicationError>;
}

/// JSON-over-HTTP transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ReplicationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReplicationError::Network {
                target: "local".to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<reqwest::Response, ReplicationError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ReplicationError::Network {
                target: url.clone(),
                reason: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "no error body".to_string(),
        };
        Err(ReplicationError::Rejected {
            target: url,
            status,
            message,
        })
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn send_update(
        &self,
        target: &RosterEntry,
        update: &ReplicateUpdate,
    ) -> Result<(), ReplicationError> {
        let url = format!("{}/updateOrderLog", target.base_url());
        self.post(url, update).await?;
        Ok(())
    }

    async fn request_sync(
        &self,
        leader: &LeaderInfo,
        request: &SyncRequest,
    ) -> Result<SyncResponse, ReplicationError> {
        let url = format!("{}/syncOrderData", leader.base_url());
        let response = match self.post(url.clone(), request).await {
            Ok(response) => response,
            Err(ReplicationError::Rejected { status, .. }) if status == DIVERGENCE_STATUS => {
                let baseline = request.last_txn.last().unwrap_or_default();
                return Err(ReplicationError::Divergence(baseline));
            }
            Err(e) => return Err(e),
        };
        response
            .json::<SyncResponse>()
            .await
            .map_err(|e| ReplicationError::Network {
                target: url,
                reason: format!("Invalid sync response: {e}"),
            })
    }
}
