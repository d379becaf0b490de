//! HTTP server for the catalog

use crate::error::CatalogError;
use crate::inventory::Inventory;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trade_types::{Envelope, ErrorBody, InvalidateRequest, OrderType, TradeRequest};

/// State shared by the catalog handlers
pub struct CatalogState {
    pub inventory: Arc<Inventory>,
    /// Gateway base URL to send cache invalidations to
    pub frontend_url: Option<String>,
    http: reqwest::Client,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::new(status.as_u16(), self.to_string()))).into_response()
    }
}

/// Catalog HTTP server
pub struct CatalogServer {
    state: Arc<CatalogState>,
}

impl CatalogServer {
    pub fn new(inventory: Arc<Inventory>, frontend_url: Option<String>) -> Self {
        Self {
            state: Arc::new(CatalogState {
                inventory,
                frontend_url,
                http: reqwest::Client::new(),
            }),
        }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        Router::new()
            .route("/lookup/:name", get(handle_lookup))
            .route("/trade", post(handle_trade))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Catalog server listening on {}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_lookup(
    State(state): State<Arc<CatalogState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, CatalogError> {
    let stock = state
        .inventory
        .lookup(&name)
        .ok_or(CatalogError::StockNotFound(name))?;
    Ok(Json(Envelope::new(stock)))
}

async fn handle_trade(
    State(state): State<Arc<CatalogState>>,
    Json(trade): Json<TradeRequest>,
) -> Result<impl IntoResponse, CatalogError> {
    state.inventory.trade(&trade)?;
    invalidate_frontend_cache(&state, &trade.name);

    let message = match trade.order_type {
        OrderType::Buy => "successfully bought",
        OrderType::Sell => "successfully sold",
    };
    Ok(Json(Envelope::new(json!({ "message": message }))))
}

/// Best-effort: the trade already succeeded whatever happens here
fn invalidate_frontend_cache(state: &CatalogState, name: &str) {
    let Some(frontend) = &state.frontend_url else {
        return;
    };
    let url = format!("{}/invalidate_cache", frontend);
    let body = InvalidateRequest {
        name: name.to_string(),
    };
    let http = state.http.clone();

    tokio::spawn(async move {
        match http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("Invalidated cached quote for {}", body.name);
            }
            Ok(resp) => tracing::warn!("Cache invalidation rejected: {}", resp.status()),
            Err(e) => tracing::warn!("Cache invalidation failed: {}", e),
        }
    });
}
