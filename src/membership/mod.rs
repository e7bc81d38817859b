//! Membership Reconciliation Module
//!
//! Aligns ring membership with an external health authority by polling it on a fixed interval.
//!
//! ## Core Mechanisms
//! - **Health Sources**: A point-in-time report of healthy members (with addresses) and unhealthy ones.
//! - **Reconciliation**: Healthy members are added or refreshed, unhealthy ones removed; unknown members are untouched.
//! - **Eventual Consistency**: Every node converges on the authority's view within one polling interval.

pub mod reconciler;
pub mod source;
pub mod types;

pub use reconciler::{DEFAULT_RECONCILE_INTERVAL, Reconciler};
pub use source::{HealthSource, HttpHealthSource, StaticHealthSource};
pub use types::{HealthReport, HealthyMember, NodeDefaults, ReconcileOutcome};
