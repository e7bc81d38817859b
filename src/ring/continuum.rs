use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::{NodeSpec, RingPoint};
use crate::error::{CacheError, CacheResult};

/// Hashes a key onto the 128-bit continuum.
///
/// Uses the leading 16 bytes of the SHA-256 digest, so positions are stable
/// across processes and restarts.
pub fn hash_key(key: &str) -> u128 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(bytes)
}

/// Hashes of the points `spec` contributes: `hash("{name}-{i}")` for every
/// `i` in `0..vnodes * weight`.
pub fn node_points(spec: &NodeSpec) -> CacheResult<Vec<u128>> {
    let count = spec.point_count()?;
    Ok((0..count)
        .map(|i| hash_key(&format!("{}-{}", spec.name, i)))
        .collect())
}

/// Sorted hash positions, the node table and the points each node placed.
///
/// Not synchronised on its own; `HashRing` guards a whole `Continuum` behind a
/// single lock so the positions and the node table always change together.
#[derive(Debug, Default, Clone)]
pub struct Continuum {
    points: BTreeMap<u128, String>,
    nodes: HashMap<String, NodeSpec>,
    placed: HashMap<String, Vec<u128>>,
}

impl Continuum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Points actually owned by each node. A point lost to a collision is not
    /// counted for the node that lost it.
    pub fn distribution(&self) -> BTreeMap<String, usize> {
        self.placed
            .iter()
            .map(|(name, hashes)| (name.clone(), hashes.len()))
            .collect()
    }

    /// Replaces only the configuration of a node already on the ring,
    /// leaving its points where they are. Returns false if the node is absent.
    pub fn update_config(&mut self, spec: NodeSpec) -> bool {
        match self.nodes.get_mut(&spec.name) {
            Some(current) => {
                *current = spec;
                true
            }
            None => false,
        }
    }

    /// Installs `spec` with the given precomputed point hashes, dropping any
    /// points the node previously owned.
    pub fn insert_node(&mut self, spec: NodeSpec, hashes: &[u128]) {
        self.drop_points(&spec.name);

        let mut placed = Vec::with_capacity(hashes.len());
        for &hash in hashes {
            match self.points.get(&hash) {
                Some(owner) if owner != &spec.name => {
                    tracing::warn!(
                        "Ring point {:032x} of {} collides with {}, keeping existing owner",
                        hash,
                        spec.name,
                        owner
                    );
                }
                Some(_) => {}
                None => {
                    self.points.insert(hash, spec.name.clone());
                    placed.push(hash);
                }
            }
        }

        self.placed.insert(spec.name.clone(), placed);
        self.nodes.insert(spec.name.clone(), spec);
    }

    pub fn remove_node(&mut self, name: &str) -> CacheResult<NodeSpec> {
        let spec = self
            .nodes
            .remove(name)
            .ok_or_else(|| CacheError::NodeNotFound(name.to_string()))?;
        self.drop_points(name);
        Ok(spec)
    }

    /// Removes exactly the points `name` placed.
    fn drop_points(&mut self, name: &str) {
        for hash in self.placed.remove(name).unwrap_or_default() {
            self.points.remove(&hash);
        }
    }

    /// Recomputes every point from the node table.
    pub fn rebuild(&mut self) -> CacheResult<()> {
        let mut specs: Vec<NodeSpec> = self.nodes.values().cloned().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        let mut next = Continuum::new();
        for spec in specs {
            let hashes = node_points(&spec)?;
            next.insert_node(spec, &hashes);
        }
        *self = next;
        Ok(())
    }

    /// First point whose hash is `>= hash`, wrapping to the lowest point.
    pub fn point_at(&self, hash: u128) -> Option<(u128, &str)> {
        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(h, name)| (*h, name.as_str()))
    }

    /// Index of `point_at(hash)` within the sorted sequence.
    ///
    /// Diagnostic only: counting the preceding points is linear in the ring
    /// size. Routing goes through `point_at` and `walk`.
    pub fn position(&self, hash: u128) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let before = self.points.range(..hash).count();
        Some(if before == self.points.len() { 0 } else { before })
    }

    /// One clockwise traversal of the ring starting at `point_at(hash)`.
    pub fn walk(&self, hash: u128) -> impl Iterator<Item = (u128, &str)> {
        self.points
            .range(hash..)
            .chain(self.points.range(..hash))
            .map(|(h, name)| (*h, name.as_str()))
    }

    /// Owners encountered walking clockwise from `hash`.
    ///
    /// With `distinct`, repeated names are skipped and at most `count` names
    /// (default: every node) are returned. Without it every point counts and
    /// the walk ends after `count` names or one full traversal.
    pub fn owners(&self, hash: u128, count: Option<usize>, distinct: bool) -> Vec<&str> {
        let limit = match (count, distinct) {
            (Some(count), _) => count,
            (None, true) => self.nodes.len(),
            (None, false) => self.points.len(),
        };

        let mut owners = Vec::with_capacity(limit.min(self.nodes.len().max(1)));
        if limit == 0 {
            return owners;
        }

        let mut seen = HashSet::new();
        for (_, name) in self.walk(hash) {
            if distinct && !seen.insert(name) {
                continue;
            }
            owners.push(name);
            if owners.len() == limit {
                break;
            }
        }
        owners
    }

    pub fn points(&self) -> Vec<RingPoint> {
        self.points
            .iter()
            .map(|(hash, node)| RingPoint {
                hash: *hash,
                node: node.clone(),
            })
            .collect()
    }

    /// Every point belongs to a configured node and the per-node counts add
    /// up to the number of points.
    pub fn is_consistent(&self) -> bool {
        let owners_known = self.points.values().all(|name| self.nodes.contains_key(name));
        let tables_match = self.placed.len() == self.nodes.len()
            && self.nodes.keys().all(|name| self.placed.contains_key(name));
        let placed_match = self.placed.iter().all(|(name, hashes)| {
            hashes
                .iter()
                .all(|hash| self.points.get(hash).is_some_and(|owner| owner == name))
        });
        let counted: usize = self.placed.values().map(Vec::len).sum();
        owners_known && tables_match && placed_match && counted == self.points.len()
    }
}
