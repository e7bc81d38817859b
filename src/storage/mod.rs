//! Distributed Cache Storage Module
//!
//! Implements the per-node request router and the node-local key-value store.
//!
//! ## Core Concepts
//! - **Routing**: `Coordinator` asks the ring for a key's owners on every request.
//! - **Replication**: Writes go to `replication_factor` distinct owners concurrently; each owner fails independently.
//! - **Reads**: Served by the primary owner only, locally or through a `PeerClient`.
//! - **Transport**: `HttpPeerClient` talks to peers over the same HTTP endpoints the handlers expose.

pub mod coordinator;
pub mod handlers;
pub mod peer;
pub mod protocol;
pub mod store;

pub use coordinator::{
    CacheSettings, Coordinator, DEFAULT_PEER_TIMEOUT, DEFAULT_REPLICATION_FACTOR, ReplicaFailure,
    WriteSummary,
};
pub use peer::{HttpPeerClient, PeerClient};
pub use store::LocalStore;
