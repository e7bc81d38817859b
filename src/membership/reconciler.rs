use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::source::HealthSource;
use super::types::{HealthReport, HealthyMember, NodeDefaults, ReconcileOutcome};
use crate::error::CacheError;
use crate::ring::{HashRing, NodeSpec};

pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Keeps ring membership in line with an external health authority.
///
/// Staleness is bounded by `interval`; nothing is agreed between nodes.
pub struct Reconciler {
    ring: Arc<HashRing>,
    source: Arc<dyn HealthSource>,
    defaults: NodeDefaults,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        ring: Arc<HashRing>,
        source: Arc<dyn HealthSource>,
        defaults: NodeDefaults,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            ring,
            source,
            defaults,
            interval,
        })
    }

    /// Spawns the periodic reconciliation loop. A failed tick is logged and
    /// the loop carries on with the next one.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!("Starting reconciler (every {:?})", self.interval);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                match self.tick().await {
                    Ok(outcome) if !outcome.is_empty() => {
                        tracing::info!(
                            "Membership changed: added={:?} updated={:?} removed={:?} (ring has {} nodes)",
                            outcome.added,
                            outcome.updated,
                            outcome.removed,
                            self.ring.node_count()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("Reconciliation tick failed: {}", e);
                    }
                }
            }
        })
    }

    /// Fetches one health report and applies it.
    pub async fn tick(&self) -> Result<ReconcileOutcome> {
        let report = self.source.report().await?;
        Ok(self.apply(&report))
    }

    /// Adds or refreshes every healthy member, then removes every unhealthy
    /// member still on the ring. Members in neither list are left alone.
    pub fn apply(&self, report: &HealthReport) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for member in &report.healthy {
            let current = self.ring.node(&member.id);
            // Compare against what the ring would store, weight function included
            let desired = match self.ring.resolve(self.desired_spec(member, current.as_ref())) {
                Ok(desired) => desired,
                Err(e) => {
                    tracing::error!("Skipping healthy member {}: {}", member.id, e);
                    continue;
                }
            };

            if current.as_ref() == Some(&desired) {
                continue;
            }

            match self.ring.add_node(desired) {
                Ok(_) if current.is_some() => outcome.updated.push(member.id.clone()),
                Ok(_) => outcome.added.push(member.id.clone()),
                Err(e) => {
                    tracing::error!("Skipping healthy member {}: {}", member.id, e);
                }
            }
        }

        for id in &report.unhealthy {
            if !self.ring.contains(id) {
                tracing::debug!("Unhealthy member {} is not on the ring", id);
                continue;
            }
            match self.ring.remove_node(id) {
                Ok(_) => outcome.removed.push(id.clone()),
                Err(CacheError::NodeNotFound(_)) => {}
                Err(e) => {
                    tracing::error!("Failed to remove unhealthy member {}: {}", id, e);
                }
            }
        }

        outcome
    }

    fn desired_spec(&self, member: &HealthyMember, current: Option<&NodeSpec>) -> NodeSpec {
        let mut spec = match current {
            Some(current) => current.clone(),
            None => NodeSpec::new(member.id.clone(), member.address.clone())
                .with_vnodes(self.defaults.vnodes)
                .with_weight(self.defaults.weight),
        };

        spec.address = member.address.clone();
        if let Some(instance_id) = &member.instance_id {
            spec.instance_id = Some(instance_id.clone());
        }
        if let Some(vnodes) = member.vnodes {
            spec.vnodes = vnodes;
        }
        if let Some(weight) = member.weight {
            spec.weight = weight;
        }
        spec
    }
}
