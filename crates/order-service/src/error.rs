//! API errors of the order node and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog::CatalogError;
use order_replication::{ReplicationError, DIVERGENCE_STATUS};
use trade_types::{ErrorBody, TxnNumber};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not leader")]
    NotLeader,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("inconsistent state: transaction {0} not in leader log")]
    Divergence(TxnNumber),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotLeader => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Divergence(_) => StatusCode::from_u16(DIVERGENCE_STATUS)
                .unwrap_or(StatusCode::UNPROCESSABLE_ENTITY),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody::new(status.as_u16(), self.to_string()))).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::StockNotFound(_) => ApiError::NotFound("stock not found".to_string()),
            CatalogError::InsufficientQuantity { .. } => {
                ApiError::BadRequest("insufficient quantity".to_string())
            }
            CatalogError::QuantityOverflow(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<ReplicationError> for ApiError {
    fn from(e: ReplicationError) -> Self {
        match e {
            ReplicationError::Divergence(txn) => ApiError::Divergence(txn),
            ReplicationError::NoLeader => ApiError::NotLeader,
            ReplicationError::UnknownLeader(_) => ApiError::BadRequest(e.to_string()),
            ReplicationError::Network { .. } | ReplicationError::Rejected { .. } => {
                ApiError::Unavailable(e.to_string())
            }
            ReplicationError::Ledger(_) => ApiError::Internal(e.to_string()),
        }
    }
}
