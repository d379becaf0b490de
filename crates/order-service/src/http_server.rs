//! HTTP server for the order node

use crate::error::ApiError;
use crate::node::OrderNode;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use order_replication::{ReplicateUpdate, SyncRequest};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trade_types::{Envelope, NotifyRequest, TradeRequest, TxnNumber};

/// Order node HTTP server
pub struct OrderServer {
    node: Arc<OrderNode>,
}

impl OrderServer {
    pub fn new(node: Arc<OrderNode>) -> Self {
        Self { node }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        Router::new()
            .route("/isalive", get(handle_isalive))
            .route("/notify", post(handle_notify))
            .route("/trade", post(handle_trade))
            .route("/query/:number", get(handle_query))
            .route("/updateOrderLog", post(handle_update))
            .route("/syncOrderData", post(handle_sync))
            .layer(TraceLayer::new_for_http())
            .with_state(self.node)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Order node {} listening on {}", self.node.instance_id(), addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_until<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

async fn handle_isalive(State(node): State<Arc<OrderNode>>) -> impl IntoResponse {
    Json(node.health())
}

async fn handle_notify(
    State(node): State<Arc<OrderNode>>,
    Json(notify): Json<NotifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    node.notify(notify)?;
    Ok(Json(Envelope::new("OK")))
}

async fn handle_trade(
    State(node): State<Arc<OrderNode>>,
    Json(trade): Json<TradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = node.trade(trade).await?;
    Ok(Json(Envelope::new(receipt)))
}

async fn handle_query(
    State(node): State<Arc<OrderNode>>,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let number: TxnNumber = number
        .parse()
        .map_err(|_| ApiError::NotFound("invalid number".to_string()))?;
    let order = node.query(number)?;
    Ok(Json(Envelope::new(order)))
}

async fn handle_update(
    State(node): State<Arc<OrderNode>>,
    Json(update): Json<ReplicateUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let txn = update.successful_order_data.txn_number;
    let outcome = node.replicate(update).await?;
    tracing::debug!("Update {} applied: {:?}", txn, outcome);
    Ok(Json(Envelope::new(json!({ "message": "OK" }))))
}

async fn handle_sync(
    State(node): State<Arc<OrderNode>>,
    Json(request): Json<SyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = node.sync(&request)?;
    Ok(Json(response))
}
