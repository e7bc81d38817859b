//! Consistent Hashing Ring
//!
//! Maps keys onto a 128-bit continuum populated with virtual-node points.
//!
//! ## Core Concepts
//! - **Virtual nodes**: Each member contributes `vnodes * weight` points, hashed from `"{name}-{i}"`.
//! - **Lookup**: A key belongs to the first point at or after its hash, wrapping around at the top.
//! - **Replica walk**: `locate_many` walks clockwise from the owner, collecting distinct members.
//! - **Incremental updates**: Adding or removing a member only touches that member's points.

pub mod continuum;
pub mod hash_ring;
pub mod types;

pub use continuum::hash_key;
pub use hash_ring::{HashRing, RingSummary};
pub use types::{DEFAULT_VNODES, DEFAULT_WEIGHT, NodeSpec, RingPoint, WeightFn};

#[cfg(test)]
mod tests;
