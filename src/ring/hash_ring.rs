use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

use super::continuum::{Continuum, hash_key, node_points};
use super::types::{NodeSpec, RingPoint, WeightFn};
use crate::error::{CacheError, CacheResult};

/// Shared consistent-hashing ring.
///
/// The reconciler is the only writer; request handlers read concurrently.
/// Every lookup runs under one read guard, so a reader never sees points
/// without their node configuration or the other way round. Point hashes for
/// a node are computed before the write guard is taken.
#[derive(Debug, Default)]
pub struct HashRing {
    continuum: RwLock<Continuum>,
    weight_fn: RwLock<Option<WeightFn>>,
}

/// Serializable view of ring membership, used by the `/ring` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RingSummary {
    pub size: usize,
    pub nodes: Vec<NodeSpec>,
    pub distribution: BTreeMap<String, usize>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight_fn(weight_fn: WeightFn) -> Self {
        Self {
            continuum: RwLock::new(Continuum::new()),
            weight_fn: RwLock::new(Some(weight_fn)),
        }
    }

    /// Builds a ring from a full node list in one pass.
    pub fn with_nodes(
        specs: impl IntoIterator<Item = NodeSpec>,
        weight_fn: Option<WeightFn>,
    ) -> CacheResult<Self> {
        let mut continuum = Continuum::new();
        for spec in specs {
            let spec = prepare(spec, weight_fn.as_ref())?;
            let hashes = node_points(&spec)?;
            continuum.insert_node(spec, &hashes);
        }
        Ok(Self {
            continuum: RwLock::new(continuum),
            weight_fn: RwLock::new(weight_fn),
        })
    }

    pub fn hash(&self, key: &str) -> u128 {
        hash_key(key)
    }

    /// Adds a node, or updates the configuration of an existing one.
    ///
    /// Points are regenerated only when the node is new or its name, vnodes
    /// or weight changed. Returns whether the continuum was touched.
    pub fn add_node(&self, spec: NodeSpec) -> CacheResult<bool> {
        let spec = self.resolve(spec)?;

        {
            let mut continuum = self.continuum.write();
            let unchanged = continuum
                .node(&spec.name)
                .is_some_and(|current| !current.placement_differs(&spec));
            if unchanged {
                tracing::debug!("Updating config of {} without touching its points", spec.name);
                continuum.update_config(spec);
                return Ok(false);
            }
        }

        // insert_node replaces whatever the node placed before, so a writer
        // running between the two guards cannot leave stale points behind
        let hashes = node_points(&spec)?;
        let name = spec.name.clone();
        let mut continuum = self.continuum.write();
        continuum.insert_node(spec, &hashes);
        tracing::info!(
            "Placed {} points for node {} (ring size {})",
            hashes.len(),
            name,
            continuum.size()
        );
        Ok(true)
    }

    /// The configuration `add_node` would store for `spec`: the weight
    /// function applied, then validated.
    pub fn resolve(&self, spec: NodeSpec) -> CacheResult<NodeSpec> {
        prepare(spec, self.weight_fn.read().as_ref())
    }

    pub fn remove_node(&self, name: &str) -> CacheResult<NodeSpec> {
        let mut continuum = self.continuum.write();
        let removed = continuum.remove_node(name)?;
        tracing::info!("Removed node {} (ring size {})", name, continuum.size());
        Ok(removed)
    }

    /// Replaces the weight function. Takes effect on the next `rebuild` or
    /// `add_node`.
    pub fn set_weight_fn(&self, weight_fn: Option<WeightFn>) {
        *self.weight_fn.write() = weight_fn;
    }

    /// Regenerates the whole continuum from the node table, re-applying the
    /// weight function. Meant for bulk reconfiguration only.
    pub fn rebuild(&self) -> CacheResult<()> {
        let weight_fn = self.weight_fn.read().clone();
        let mut continuum = self.continuum.write();
        let mut next = continuum.clone();
        if let Some(weight_fn) = weight_fn.as_ref() {
            let specs: Vec<NodeSpec> = next.nodes().cloned().collect();
            for spec in specs {
                next.update_config(prepare(spec, Some(weight_fn))?);
            }
        }
        next.rebuild()?;
        *continuum = next;
        tracing::info!("Rebuilt continuum with {} points", continuum.size());
        Ok(())
    }

    fn with_point<T>(
        &self,
        key: &str,
        f: impl FnOnce(u128, &str, &Continuum) -> T,
    ) -> CacheResult<T> {
        let hash = hash_key(key);
        let continuum = self.continuum.read();
        let (point, name) = continuum.point_at(hash).ok_or(CacheError::RingEmpty)?;
        Ok(f(point, name, &*continuum))
    }

    /// Name of the node owning `key`.
    pub fn locate(&self, key: &str) -> CacheResult<String> {
        self.with_point(key, |_, name, _| name.to_string())
    }

    /// Full configuration of the node owning `key`.
    pub fn locate_spec(&self, key: &str) -> CacheResult<NodeSpec> {
        self.with_point(key, |_, name, continuum| continuum.node(name).cloned())?
            .ok_or(CacheError::RingEmpty)
    }

    pub fn locate_address(&self, key: &str) -> CacheResult<String> {
        self.locate_spec(key).map(|spec| spec.address)
    }

    pub fn locate_weight(&self, key: &str) -> CacheResult<u32> {
        self.locate_spec(key).map(|spec| spec.weight)
    }

    /// Index of the owning point in the sorted continuum. Linear in the ring
    /// size; meant for diagnostics, not routing.
    pub fn locate_position(&self, key: &str) -> CacheResult<usize> {
        self.continuum
            .read()
            .position(hash_key(key))
            .ok_or(CacheError::RingEmpty)
    }

    pub fn locate_point(&self, key: &str) -> CacheResult<RingPoint> {
        self.with_point(key, |hash, name, _| RingPoint {
            hash,
            node: name.to_string(),
        })
    }

    /// Node names met walking clockwise from the owner of `key`.
    ///
    /// `count` defaults to the number of distinct nodes when `distinct` is
    /// set, and to one full traversal otherwise.
    pub fn locate_many(
        &self,
        key: &str,
        count: Option<usize>,
        distinct: bool,
    ) -> CacheResult<Vec<String>> {
        let continuum = self.continuum.read();
        if continuum.size() == 0 {
            return Err(CacheError::RingEmpty);
        }
        Ok(continuum
            .owners(hash_key(key), count, distinct)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Configurations of the first `count` distinct owners of `key`, taken
    /// from a single consistent view of the ring.
    pub fn owners(&self, key: &str, count: usize) -> CacheResult<Vec<NodeSpec>> {
        let continuum = self.continuum.read();
        if continuum.size() == 0 {
            return Err(CacheError::RingEmpty);
        }
        Ok(continuum
            .owners(hash_key(key), Some(count), true)
            .into_iter()
            .filter_map(|name| continuum.node(name).cloned())
            .collect())
    }

    pub fn node(&self, name: &str) -> Option<NodeSpec> {
        self.continuum.read().node(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.continuum.read().node(name).is_some()
    }

    pub fn nodes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .continuum
            .read()
            .nodes()
            .map(|spec| spec.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn node_count(&self) -> usize {
        self.continuum.read().node_count()
    }

    /// Instance identities of the nodes that carry one.
    pub fn instances(&self) -> Vec<String> {
        let mut instances: Vec<String> = self
            .continuum
            .read()
            .nodes()
            .filter_map(|spec| spec.instance_id.clone())
            .collect();
        instances.sort();
        instances
    }

    pub fn points(&self) -> Vec<RingPoint> {
        self.continuum.read().points()
    }

    pub fn distribution(&self) -> BTreeMap<String, usize> {
        self.continuum.read().distribution()
    }

    /// Number of points on the continuum.
    pub fn size(&self) -> usize {
        self.continuum.read().size()
    }

    pub fn is_consistent(&self) -> bool {
        self.continuum.read().is_consistent()
    }

    pub fn summary(&self) -> RingSummary {
        let continuum = self.continuum.read();
        let mut nodes: Vec<NodeSpec> = continuum.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        RingSummary {
            size: continuum.size(),
            nodes,
            distribution: continuum.distribution(),
        }
    }

    /// Ketama-style listing of every point on the continuum.
    pub fn continuum_report(&self) -> String {
        let points = self.points();
        let mut report = if points.is_empty() {
            "Continuum empty\n".to_string()
        } else {
            format!("Numpoints in continuum: {}\n", points.len())
        };
        for point in points {
            report.push_str(&format!("{} ({})\n", point.node, point.hash));
        }
        report
    }
}

fn prepare(mut spec: NodeSpec, weight_fn: Option<&WeightFn>) -> CacheResult<NodeSpec> {
    if let Some(weight_fn) = weight_fn {
        spec.weight = weight_fn.weigh(&spec);
    }
    spec.validate()?;
    Ok(spec)
}
