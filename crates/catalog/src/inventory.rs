//! In-memory stock table backed by a JSON file

use crate::error::CatalogError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trade_types::{OrderType, TradeRequest};

/// One catalog row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

struct InventoryInner {
    stocks: Vec<Stock>,
    path: Option<PathBuf>,
}

impl InventoryInner {
    fn persist(&self) -> Result<(), CatalogError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.stocks)
            .map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

/// The catalog table. One lock covers reads, writes and the file.
pub struct Inventory {
    inner: Mutex<InventoryInner>,
}

impl Inventory {
    /// Load the table from `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        let stocks: Vec<Stock> =
            serde_json::from_slice(&bytes).map_err(|e| CatalogError::Corrupt(e.to_string()))?;
        tracing::info!("Loaded {} stocks from {:?}", stocks.len(), path);

        Ok(Self {
            inner: Mutex::new(InventoryInner {
                stocks,
                path: Some(path),
            }),
        })
    }

    /// Table without a backing file
    pub fn in_memory(stocks: Vec<Stock>) -> Self {
        Self {
            inner: Mutex::new(InventoryInner { stocks, path: None }),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Stock> {
        self.inner
            .lock()
            .stocks
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Apply a trade and persist before returning the updated row
    pub fn trade(&self, trade: &TradeRequest) -> Result<Stock, CatalogError> {
        let mut inner = self.inner.lock();
        let index = inner
            .stocks
            .iter()
            .position(|s| s.name == trade.name)
            .ok_or_else(|| CatalogError::StockNotFound(trade.name.clone()))?;

        let current = inner.stocks[index].quantity;
        let updated = match trade.order_type {
            OrderType::Buy => {
                current
                    .checked_sub(trade.quantity)
                    .ok_or_else(|| CatalogError::InsufficientQuantity {
                        name: trade.name.clone(),
                        available: current,
                        requested: trade.quantity,
                    })?
            }
            OrderType::Sell => current
                .checked_add(trade.quantity)
                .ok_or_else(|| CatalogError::QuantityOverflow(trade.name.clone()))?,
        };

        inner.stocks[index].quantity = updated;
        if let Err(e) = inner.persist() {
            inner.stocks[index].quantity = current;
            return Err(e);
        }

        tracing::info!(
            "{} {} {}: quantity {} -> {}",
            trade.order_type,
            trade.quantity,
            trade.name,
            current,
            updated
        );
        Ok(inner.stocks[index].clone())
    }
}
