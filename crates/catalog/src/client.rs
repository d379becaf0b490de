//! Client for the catalog service, used by order leaders and the gateway

use crate::error::CatalogError;
use crate::inventory::Stock;
use reqwest::StatusCode;
use std::time::Duration;
use trade_types::{Envelope, ErrorBody, TradeRequest};

#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

impl CatalogClient {
    /// `addr` is `host:port`
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: format!("http://{}", addr),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current price and quantity of `name`
    pub async fn lookup(&self, name: &str) -> Result<Stock, CatalogError> {
        let url = format!("{}/lookup/{}", self.base_url, name);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<Envelope<Stock>>()
                .await
                .map(|env| env.data)
                .map_err(|e| CatalogError::Unavailable(format!("Invalid lookup response: {e}"))),
            StatusCode::NOT_FOUND => Err(CatalogError::StockNotFound(name.to_string())),
            other => Err(unexpected(other, response).await),
        }
    }

    /// Execute a trade. Returns once the catalog has persisted it.
    pub async fn trade(&self, trade: &TradeRequest) -> Result<(), CatalogError> {
        let url = format!("{}/trade", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(trade)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(CatalogError::StockNotFound(trade.name.clone())),
            StatusCode::BAD_REQUEST => Err(refused(trade, response).await),
            other => Err(unexpected(other, response).await),
        }
    }
}

/// Map a 400 back to the catalog error that produced it
async fn refused(trade: &TradeRequest, response: reqwest::Response) -> CatalogError {
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_default();

    if message.starts_with("quantity overflow") {
        CatalogError::QuantityOverflow(trade.name.clone())
    } else {
        CatalogError::InsufficientQuantity {
            name: trade.name.clone(),
            available: 0,
            requested: trade.quantity,
        }
    }
}

async fn unexpected(status: StatusCode, response: reqwest::Response) -> CatalogError {
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| "no error body".to_string());
    CatalogError::Unavailable(format!("catalog answered {status}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Inventory;
    use crate::server::CatalogServer;
    use std::sync::Arc;
    use trade_types::OrderType;

    async fn spawn_catalog(quantity: u32) -> CatalogClient {
        let inventory = Arc::new(Inventory::in_memory(vec![Stock {
            name: "FishCo".to_string(),
            price: 20.0,
            quantity,
        }]));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = CatalogServer::new(inventory, None).router();
        tokio::spawn(async move { axum::serve(listener, router).await });
        CatalogClient::new(&addr.to_string(), Duration::from_secs(2)).unwrap()
    }

    fn trade(order_type: OrderType, name: &str, quantity: u32) -> TradeRequest {
        TradeRequest {
            name: name.to_string(),
            order_type,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_trade_errors_keep_their_kind() {
        let client = spawn_catalog(u32::MAX - 1).await;

        client.trade(&trade(OrderType::Sell, "FishCo", 1)).await.unwrap();

        let overflow = client.trade(&trade(OrderType::Sell, "FishCo", 1)).await;
        assert!(matches!(overflow, Err(CatalogError::QuantityOverflow(name)) if name == "FishCo"));

        let short = client.trade(&trade(OrderType::Buy, "FishCo", u32::MAX)).await;
        assert!(short.is_ok());
        let short = client.trade(&trade(OrderType::Buy, "FishCo", 1)).await;
        assert!(matches!(
            short,
            Err(CatalogError::InsufficientQuantity { requested: 1, .. })
        ));

        let unknown = client.trade(&trade(OrderType::Buy, "Nope", 1)).await;
        assert!(matches!(unknown, Err(CatalogError::StockNotFound(_))));
    }

    #[tokio::test]
    async fn test_lookup() {
        let client = spawn_catalog(10).await;
        assert_eq!(client.lookup("FishCo").await.unwrap().quantity, 10);
        assert!(matches!(
            client.lookup("Nope").await,
            Err(CatalogError::StockNotFound(_))
        ));
    }
}
