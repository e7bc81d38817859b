use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::membership::{HealthReport, HealthyMember, NodeDefaults};
use crate::ring::DEFAULT_WEIGHT;
use crate::storage::CacheSettings;

/// Command line and environment configuration of a cache node.
#[derive(Debug, Clone, Parser)]
#[command(name = "ring-cache-node", about = "Consistent-hashing cache node")]
pub struct NodeConfig {
    /// Stable identity of this node, as reported by the health authority.
    #[arg(long, env = "NODE_ID")]
    pub node_id: String,

    #[arg(long, env = "CACHE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Address other nodes use to reach this one. Defaults to `--bind`.
    #[arg(long, env = "CACHE_ADVERTISE")]
    pub advertise: Option<String>,

    /// URL answering with a JSON health report. Without it the node uses a
    /// fixed membership made of itself and every `--peer`.
    #[arg(long, env = "CACHE_HEALTH_URL")]
    pub health_url: Option<String>,

    /// Static peer as `id=address`; may be repeated.
    #[arg(long = "peer", value_parser = parse_peer)]
    pub peers: Vec<HealthyMember>,

    #[arg(long, env = "CACHE_REPLICATION_FACTOR", default_value_t = 2)]
    pub replication_factor: usize,

    #[arg(long, env = "CACHE_VNODES", default_value_t = 160)]
    pub vnodes: u32,

    #[arg(long, env = "CACHE_RECONCILE_INTERVAL_SECS", default_value_t = 5)]
    pub reconcile_interval_secs: u64,

    #[arg(long, env = "CACHE_PEER_TIMEOUT_MS", default_value_t = 500)]
    pub peer_timeout_ms: u64,

    #[arg(long, env = "CACHE_PEER_ATTEMPTS", default_value_t = 3)]
    pub peer_attempts: usize,
}

impl NodeConfig {
    pub fn advertise_address(&self) -> String {
        self.advertise
            .clone()
            .unwrap_or_else(|| self.bind.to_string())
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            replication_factor: self.replication_factor.max(1),
            peer_timeout: self.peer_timeout(),
        }
    }

    pub fn node_defaults(&self) -> NodeDefaults {
        NodeDefaults {
            vnodes: self.vnodes,
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    /// Membership used when no health URL is configured.
    pub fn static_report(&self) -> HealthReport {
        let mut report = HealthReport::new().with_healthy(&self.node_id, self.advertise_address());
        for peer in &self.peers {
            if peer.id != self.node_id {
                report = report.with_member(peer.clone());
            }
        }
        report
    }
}

fn parse_peer(raw: &str) -> Result<HealthyMember, String> {
    let (id, address) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=address, got '{}'", raw))?;
    if id.is_empty() || address.is_empty() {
        return Err(format!("expected id=address, got '{}'", raw));
    }
    Ok(HealthyMember::new(id, address))
}
