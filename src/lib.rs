//! Distributed Cache Node Library
//!
//! This library crate defines the core modules of a consistent-hashing cache cluster.
//! It serves as the foundation for the node binary (`main.rs`).
//!
//! ## Architecture Modules
//! - **`ring`**: The consistent-hashing continuum. Places virtual-node points per member,
//!   answers "who owns this key" and walks the ring for replica owners.
//! - **`membership`**: Periodic reconciliation of ring membership against an external
//!   health authority (healthy members join, unhealthy members leave).
//! - **`storage`**: The per-node coordinator, its local key-value store and the peer
//!   transport used to replicate writes and delegate reads.
//! - **`config`**: Command line and environment configuration of a node process.
//! - **`error`**: Typed errors shared across the modules.

pub mod config;
pub mod error;
pub mod membership;
pub mod ring;
pub mod storage;
