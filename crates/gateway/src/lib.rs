//! Gateway - the client-facing front of the trading backend
//!
//! Holds the only copy of the order leader reference:
//! - picks the leader by probing order nodes in priority order
//! - announces it to every node with the full roster
//! - forwards trades and queries, re-electing when the leader stops answering
//! - caches catalog quotes until the catalog invalidates them

pub mod cache;
pub mod config;
pub mod directory;
pub mod election;
pub mod error;
pub mod failover;
pub mod retry;
pub mod server;


pub use cache::QuoteCache;
pub use config::GatewayConfig;
pub use directory::LeaderDirectory;
pub use election::{ElectionPolicy, HttpNodeLink, LeaderAnnouncer, LivenessProbe, PriorityElection};
pub use error::GatewayError;
pub use failover::{Forwarded, OrderRouter};
pub use retry::{RetryConfig, RetryPolicy};
pub use server::{GatewayServer, GatewayState};
