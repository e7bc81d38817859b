use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use super::peer::PeerClient;
use super::store::LocalStore;
use crate::error::{CacheError, CacheResult, PeerError};
use crate::ring::{HashRing, NodeSpec};

pub const DEFAULT_REPLICATION_FACTOR: usize = 2;
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Number of distinct owners every key is written to.
    pub replication_factor: usize,
    /// Upper bound on any single peer call.
    pub peer_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
        }
    }
}

/// An owner that did not receive a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaFailure {
    pub node: String,
    pub address: String,
    pub error: PeerError,
}

/// Per-owner result of a `set`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<ReplicaFailure>,
}

impl WriteSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_accepted(&self) -> bool {
        !self.delivered.is_empty()
    }
}

/// Routes reads and writes for one cache node.
///
/// Owners are resolved from the shared ring on every request, so membership
/// changes made by the reconciler apply to the next request without any
/// coordination here.
pub struct Coordinator<P> {
    node_id: String,
    ring: Arc<HashRing>,
    peers: Arc<P>,
    store: Arc<LocalStore>,
    settings: CacheSettings,
}

impl<P: PeerClient> Coordinator<P> {
    pub fn new(
        node_id: impl Into<String>,
        ring: Arc<HashRing>,
        peers: Arc<P>,
        settings: CacheSettings,
    ) -> Self {
        Self::with_store(node_id, ring, peers, Arc::new(LocalStore::new()), settings)
    }

    pub fn with_store(
        node_id: impl Into<String>,
        ring: Arc<HashRing>,
        peers: Arc<P>,
        store: Arc<LocalStore>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            ring,
            peers,
            store,
            settings,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn ring(&self) -> &Arc<HashRing> {
        &self.ring
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Writes `value` to every owner of `key`.
    ///
    /// The local copy (if this node is an owner) is written first, then all
    /// remote owners are called concurrently. A failed owner is recorded in
    /// the summary and does not stop delivery to the rest.
    pub async fn set(&self, key: &str, value: Value) -> CacheResult<WriteSummary> {
        let owners = self
            .ring
            .owners(key, self.settings.replication_factor.max(1))?;
        let op_id = Uuid::new_v4();
        let span = tracing::debug_span!("set", %op_id, key);

        let mut summary = WriteSummary::default();
        let mut remote = Vec::with_capacity(owners.len());
        for owner in owners {
            if owner.name == self.node_id {
                self.store.insert(key, value.clone());
                summary.delivered.push(owner.name);
            } else {
                remote.push(owner);
            }
        }

        let results = join_all(
            remote
                .iter()
                .map(|owner| self.replicate_to(owner, key, &value)),
        )
        .instrument(span)
        .await;

        for (owner, result) in remote.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    tracing::debug!(
                        "[{}] Replicated to {} at {}",
                        op_id,
                        owner.name,
                        owner.address
                    );
                    summary.delivered.push(owner.name);
                }
                Err(error) => {
                    tracing::warn!(
                        "[{}] Replica {} missed write: {}",
                        op_id,
                        owner.name,
                        error
                    );
                    summary.failed.push(ReplicaFailure {
                        node: owner.name,
                        address: owner.address,
                        error,
                    });
                }
            }
        }

        Ok(summary)
    }

    async fn replicate_to(
        &self,
        owner: &NodeSpec,
        key: &str,
        value: &Value,
    ) -> Result<(), PeerError> {
        match tokio::time::timeout(
            self.settings.peer_timeout,
            self.peers.replicate(&owner.address, key, value),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                address: owner.address.clone(),
            }),
        }
    }

    /// Reads `key` from its primary owner. Replicas are never consulted.
    pub async fn get(&self, key: &str) -> CacheResult<Value> {
        let primary = self.ring.locate_spec(key)?;

        if primary.name == self.node_id {
            tracing::debug!("GET {}: served locally", key);
            return self.get_local(key);
        }

        tracing::debug!("GET {}: fetching from primary {}", key, primary.name);
        let fetched = tokio::time::timeout(
            self.settings.peer_timeout,
            self.peers.fetch(&primary.address, key),
        )
        .await
        .unwrap_or_else(|_| {
            Err(PeerError::Timeout {
                address: primary.address.clone(),
            })
        });

        match fetched {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(CacheError::KeyNotFound(key.to_string())),
            Err(e) => {
                tracing::warn!("GET {}: primary {} failed: {}", key, primary.name, e);
                Err(e.into())
            }
        }
    }

    /// Reads the local store without consulting the ring.
    pub fn get_local(&self, key: &str) -> CacheResult<Value> {
        self.store
            .get(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    /// Stores a write pushed by another coordinator. Never forwarded.
    pub fn apply_replica(&self, key: &str, value: Value) {
        self.store.insert(key, value);
    }

    pub fn dump(&self) -> BTreeMap<String, Value> {
        self.store.dump()
    }
}
