//! HTTP server for the gateway

use crate::cache::QuoteCache;
use crate::config::GatewayConfig;
use crate::directory::LeaderDirectory;
use crate::election::{HttpNodeLink, PriorityElection};
use crate::error::GatewayError;
use crate::failover::{Forwarded, OrderRouter};
use crate::retry::RetryPolicy;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use catalog::CatalogClient;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use trade_types::{Envelope, InvalidateRequest, TradeRequest};

/// State shared by the gateway handlers
pub struct GatewayState {
    pub orders: OrderRouter,
    pub catalog: CatalogClient,
    pub cache: QuoteCache,
}

impl GatewayState {
    pub fn from_config(config: &GatewayConfig) -> Result<Arc<Self>, GatewayError> {
        let link = Arc::new(HttpNodeLink::new(config.request_timeout())?);
        let directory = Arc::new(LeaderDirectory::new(
            config.roster()?,
            Box::new(PriorityElection),
            link.clone(),
            link,
        ));
        let orders = OrderRouter::new(
            directory,
            RetryPolicy::new(config.retry.clone()),
            config.request_timeout(),
        )?;
        let catalog = CatalogClient::new(&config.catalog_addr, config.request_timeout())?;

        Ok(Arc::new(Self {
            orders,
            catalog,
            cache: QuoteCache::new(config.enable_cache),
        }))
    }

    pub fn directory(&self) -> &Arc<LeaderDirectory> {
        self.orders.directory()
    }
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Gateway HTTP server
pub struct GatewayServer {
    state: Arc<GatewayState>,
}

impl GatewayServer {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        Router::new()
            .route("/orders", post(handle_trade))
            .route("/orders/:number", get(handle_query))
            .route("/stocks/:name", get(handle_lookup))
            .route("/invalidate_cache", post(handle_invalidate))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Gateway listening on {}", addr);

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

async fn handle_trade(
    State(state): State<Arc<GatewayState>>,
    Json(trade): Json<TradeRequest>,
) -> Result<Forwarded, GatewayError> {
    state.orders.forward_trade(&trade).await
}

async fn handle_query(
    State(state): State<Arc<GatewayState>>,
    Path(number): Path<String>,
) -> Result<Forwarded, GatewayError> {
    state.orders.forward_query(&number).await
}

async fn handle_lookup(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    if let Some(stock) = state.cache.get(&name) {
        tracing::debug!("Quote for {} served from cache", name);
        return Ok(Json(Envelope::new(stock)));
    }

    let stock = state.catalog.lookup(&name).await?;
    state.cache.insert(stock.clone());
    Ok(Json(Envelope::new(stock)))
}

async fn handle_invalidate(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<InvalidateRequest>,
) -> impl IntoResponse {
    if state.cache.invalidate(&request.name) {
        tracing::debug!("Dropped cached quote for {}", request.name);
    }
    Json(Envelope::new(json!({ "message": "stock removed from cache" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use catalog::Stock;
    use tower::ServiceExt;
    use trade_types::ErrorBody;

    fn state() -> Arc<GatewayState> {
        // Nothing listens on the discard port
        let config = GatewayConfig {
            catalog_addr: "127.0.0.1:9".to_string(),
            order_nodes: vec!["1=127.0.0.1:9".parse().unwrap()],
            request_timeout_ms: 200,
            retry: crate::retry::RetryConfig::default()
                .with_max_attempts(2)
                .with_initial_delay(std::time::Duration::from_millis(5)),
            ..GatewayConfig::default()
        };
        GatewayState::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_cached_quote_and_invalidation() {
        let state = state();
        state.cache.insert(Stock {
            name: "FishCo".to_string(),
            price: 12.5,
            quantity: 10,
        });
        let router = GatewayServer::new(state.clone()).router();

        let response = router
            .clone()
            .oneshot(Request::get("/stocks/FishCo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["data"]["quantity"], 10);

        let response = router
            .clone()
            .oneshot(
                Request::post("/invalidate_cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"FishCo"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.cache.get("FishCo").is_none());

        // Uncached and the catalog is down
        let response = router
            .oneshot(Request::get("/stocks/FishCo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_trade_without_live_nodes_is_terminal() {
        let router = GatewayServer::new(state()).router();

        let response = router
            .oneshot(
                Request::post("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"FishCo","type":"buy","quantity":1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error.code, 503);
        assert!(error.error.message.contains("after 2 attempts"));
    }
}
