use serde::{Deserialize, Serialize};

use crate::ring::{DEFAULT_VNODES, DEFAULT_WEIGHT};

/// A member the health authority currently considers healthy.
///
/// `vnodes` and `weight` override the reconciler defaults when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthyMember {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub vnodes: Option<u32>,
    #[serde(default)]
    pub weight: Option<u32>,
}

impl HealthyMember {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            instance_id: None,
            vnodes: None,
            weight: None,
        }
    }
}

/// Point-in-time snapshot from the health authority.
///
/// Members missing from both lists are unknown, not unhealthy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    #[serde(default)]
    pub healthy: Vec<HealthyMember>,
    #[serde(default)]
    pub unhealthy: Vec<String>,
}

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_healthy(mut self, id: impl Into<String>, address: impl Into<String>) -> Self {
        self.healthy.push(HealthyMember::new(id, address));
        self
    }

    pub fn with_member(mut self, member: HealthyMember) -> Self {
        self.healthy.push(member);
        self
    }

    pub fn with_unhealthy(mut self, id: impl Into<String>) -> Self {
        self.unhealthy.push(id.into());
        self
    }
}

/// Placement used for members whose report entry carries no override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDefaults {
    pub vnodes: u32,
    pub weight: u32,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            vnodes: DEFAULT_VNODES,
            weight: DEFAULT_WEIGHT,
        }
    }
}

/// Ring changes applied by one reconciliation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}
