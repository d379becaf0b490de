//! Gateway errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog::CatalogError;
use trade_types::{ErrorBody, NodeId};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Every order node failed its liveness probe
    #[error("no order service instance is alive")]
    NoLiveNode,

    #[error("order service unavailable after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("could not notify order node {node}: {reason}")]
    Notify { node: NodeId, reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid answer from order node: {0}")]
    Upstream(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoLiveNode | GatewayError::Exhausted { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Catalog(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::Notify { .. } | GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody::new(status.as_u16(), self.to_string()))).into_response()
    }
}
