use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CacheError, CacheResult};

pub const DEFAULT_VNODES: u32 = 160;
pub const DEFAULT_WEIGHT: u32 = 1;

/// Configuration of a single cluster member.
///
/// `vnodes * weight` is the number of points the node contributes to the
/// continuum. `address` and `metadata` never influence point placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: String,
    pub vnodes: u32,
    pub weight: u32,
    pub address: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vnodes: DEFAULT_VNODES,
            weight: DEFAULT_WEIGHT,
            address: address.into(),
            instance_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_vnodes(mut self, vnodes: u32) -> Self {
        self.vnodes = vnodes;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Number of ring points this node owns.
    pub fn point_count(&self) -> CacheResult<u32> {
        self.vnodes.checked_mul(self.weight).ok_or_else(|| {
            CacheError::InvalidNodeConfig(format!(
                "node '{}': vnodes * weight overflows ({} * {})",
                self.name, self.vnodes, self.weight
            ))
        })
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.name.is_empty() {
            return Err(CacheError::InvalidNodeConfig(
                "node name must not be empty".to_string(),
            ));
        }
        if self.vnodes == 0 {
            return Err(CacheError::InvalidNodeConfig(format!(
                "node '{}': vnodes must be positive",
                self.name
            )));
        }
        if self.weight == 0 {
            return Err(CacheError::InvalidNodeConfig(format!(
                "node '{}': weight must be positive",
                self.name
            )));
        }
        self.point_count().map(|_| ())
    }

    /// True when `other` would place a different set of points on the ring.
    pub fn placement_differs(&self, other: &NodeSpec) -> bool {
        self.name != other.name || self.vnodes != other.vnodes || self.weight != other.weight
    }
}

/// A single position on the continuum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingPoint {
    pub hash: u128,
    pub node: String,
}

/// Derives a node's weight from the rest of its configuration.
#[derive(Clone)]
pub struct WeightFn(Arc<dyn Fn(&NodeSpec) -> u32 + Send + Sync>);

impl WeightFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&NodeSpec) -> u32 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn weigh(&self, spec: &NodeSpec) -> u32 {
        (self.0)(spec)
    }
}

impl fmt::Debug for WeightFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeightFn(..)")
    }
}
