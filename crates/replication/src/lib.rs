//! Order Replication - leader broadcast with follower catch-up
//!
//! Architecture:
//! - The gateway picks the leader and tells every node (see [`ClusterView`])
//! - The leader commits a trade locally, then queues it for broadcast
//! - Followers append when their tail matches the leader's previous number
//! - A follower that finds a gap pulls the missing suffix from the leader
//!
//! Delivery is best-effort: failed broadcasts are logged and dropped, and
//! the recovery sync is the backstop.

pub mod broadcast;
pub mod cluster;
pub mod error;
pub mod follower;
pub mod messages;
pub mod recovery;
pub mod transport;

#[cfg(test)]
mod tests;

pub use broadcast::{broadcast_trade, BroadcastReport, Replicator, ReplicationStats};
pub use cluster::ClusterView;
pub use error::ReplicationError;
pub use follower::{ApplyOutcome, Follower};
pub use messages::{ReplicateUpdate, SyncBaseline, SyncRequest, SyncResponse};
pub use recovery::{catch_up, serve_sync};
pub use transport::{HttpTransport, PeerTransport, DIVERGENCE_STATUS};
