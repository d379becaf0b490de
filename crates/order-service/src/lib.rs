//! Order Service - one replica of the order ledger
//!
//! Exposes the order node over HTTP:
//! - `GET /isalive`, `POST /notify`: driven by the gateway's leader directory
//! - `POST /trade`, `GET /query/{n}`: served by the leader
//! - `POST /updateOrderLog`, `POST /syncOrderData`: replication traffic

pub mod config;
pub mod error;
pub mod http_server;
pub mod node;


pub use config::NodeConfig;
pub use error::ApiError;
pub use http_server::OrderServer;
pub use node::OrderNode;
