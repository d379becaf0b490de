//! Catalog errors

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("stock not found")]
    StockNotFound(String),

    #[error("insufficient quantity")]
    InsufficientQuantity {
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("quantity overflow for {0}")]
    QuantityOverflow(String),

    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt catalog file: {0}")]
    Corrupt(String),

    /// The catalog could not be reached or answered something unexpected
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// HTTP status the catalog answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::StockNotFound(_) => 404,
            CatalogError::InsufficientQuantity { .. } | CatalogError::QuantityOverflow(_) => 400,
            CatalogError::Unavailable(_) => 503,
            CatalogError::Io(_) | CatalogError::Corrupt(_) => 500,
        }
    }
}
