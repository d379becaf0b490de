//! Forwarding to the order leader with re-election on failure

use crate::directory::LeaderDirectory;
use crate::error::GatewayError;
use crate::retry::RetryPolicy;
use axum::body::Bytes;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use trade_types::{NodeId, RosterEntry, TradeRequest};

/// An order node's answer, passed through to the client unchanged
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub status: StatusCode,
    pub body: Bytes,
    /// Which node answered
    pub served_by: NodeId,
}

/// Sends trades and queries to whoever leads the order cluster
pub struct OrderRouter {
    directory: Arc<LeaderDirectory>,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OrderRouter {
    pub fn new(
        directory: Arc<LeaderDirectory>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            directory,
            client,
            retry,
        })
    }

    pub fn directory(&self) -> &Arc<LeaderDirectory> {
        &self.directory
    }

    pub async fn forward_trade(&self, trade: &TradeRequest) -> Result<Forwarded, GatewayError> {
        self.forward("trade", |leader| {
            self.client
                .post(format!("{}/trade", leader.base_url()))
                .json(trade)
        })
        .await
    }

    pub async fn forward_query(&self, number: &str) -> Result<Forwarded, GatewayError> {
        self.forward("query", |leader| {
            self.client
                .get(format!("{}/query/{}", leader.base_url(), number))
        })
        .await
    }

    /// Call the leader; on a transport failure (a truncated body included)
    /// or a `409 not leader`, re-elect and try again until the retry budget runs out
    ///
    /// Every other answer, 4xx included, goes back to the client as is.
    async fn forward<F>(&self, what: &str, request: F) -> Result<Forwarded, GatewayError>
    where
        F: Fn(&RosterEntry) -> reqwest::RequestBuilder,
    {
        let attempts = self.retry.max_attempts();
        let mut stale: Option<NodeId> = None;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry.delay(attempt - 1)).await;
            }

            let leader = match self.directory.current_or_elect(stale).await {
                Ok(leader) => leader,
                Err(e) => {
                    tracing::warn!("Attempt {}/{} for {}: {}", attempt, attempts, what, e);
                    last_error = e.to_string();
                    continue;
                }
            };

            match request(&leader).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::CONFLICT => {
                    tracing::warn!(
                        "Order node {} says it is not the leader ({}/{})",
                        leader.instance_id,
                        attempt,
                        attempts
                    );
                    last_error = format!("order node {} is not the leader", leader.instance_id);
                    stale = Some(leader.instance_id);
                }
                Ok(response) => {
                    let status = StatusCode::from_u16(response.status().as_u16())
                        .map_err(|e| GatewayError::Upstream(e.to_string()))?;
                    match response.bytes().await {
                        Ok(body) => {
                            return Ok(Forwarded {
                                status,
                                body,
                                served_by: leader.instance_id,
                            })
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Leader {} dropped the {} response body ({}/{}): {}",
                                leader.instance_id,
                                what,
                                attempt,
                                attempts,
                                e
                            );
                            last_error = e.to_string();
                            stale = Some(leader.instance_id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Leader {} is unresponsive on {} ({}/{}): {}",
                        leader.instance_id,
                        what,
                        attempt,
                        attempts,
                        e
                    );
                    last_error = e.to_string();
                    stale = Some(leader.instance_id);
                }
            }
        }

        tracing::error!("Giving up on {} after {} attempts", what, attempts);
        Err(GatewayError::Exhausted {
            attempts,
            last_error,
        })
    }
}
