//! Leader election seams: candidate order, liveness and announcement

use crate::error::GatewayError;
use async_trait::async_trait;
use std::time::Duration;
use trade_types::{HealthStatus, NotifyRequest, Roster, RosterEntry};

/// Decides in which order candidates are probed; the first live one wins
pub trait ElectionPolicy: Send + Sync {
    fn candidates(&self, roster: &Roster) -> Vec<RosterEntry>;
}

/// Highest instance id first
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityElection;

impl ElectionPolicy for PriorityElection {
    fn candidates(&self, roster: &Roster) -> Vec<RosterEntry> {
        roster.values().rev().cloned().collect()
    }
}

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self, node: &RosterEntry) -> bool;
}

#[async_trait]
pub trait LeaderAnnouncer: Send + Sync {
    async fn notify(&self, node: &RosterEntry, notify: &NotifyRequest) -> Result<(), GatewayError>;
}

/// HTTP link to order nodes: `GET /isalive` and `POST /notify`
#[derive(Clone)]
pub struct HttpNodeLink {
    client: reqwest::Client,
}

impl HttpNodeLink {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LivenessProbe for HttpNodeLink {
    async fn is_alive(&self, node: &RosterEntry) -> bool {
        let url = format!("{}/isalive", node.base_url());
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthStatus>().await {
                    Ok(health) => {
                        tracing::debug!("Order node {} is {}", health.instance_id, health.status);
                        true
                    }
                    Err(e) => {
                        tracing::warn!("Order node {} sent a bad health answer: {}", node.instance_id, e);
                        false
                    }
                }
            }
            Ok(response) => {
                tracing::warn!("Order node {} answered {}", node.instance_id, response.status());
                false
            }
            Err(e) => {
                tracing::info!("Order node {} is not alive: {}", node.instance_id, e);
                false
            }
        }
    }
}

#[async_trait]
impl LeaderAnnouncer for HttpNodeLink {
    async fn notify(&self, node: &RosterEntry, notify: &NotifyRequest) -> Result<(), GatewayError> {
        let url = format!("{}/notify", node.base_url());
        let response = self
            .client
            .post(&url)
            .json(notify)
            .send()
            .await
            .map_err(|e| GatewayError::Notify {
                node: node.instance_id,
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::Notify {
                node: node.instance_id,
                reason: format!("answered {}", response.status()),
            });
        }
        Ok(())
    }
}
