use clap::Parser;
use ring_cache::config::NodeConfig;
use ring_cache::membership::{HealthSource, HttpHealthSource, Reconciler, StaticHealthSource};
use ring_cache::ring::HashRing;
use ring_cache::storage::handlers::router;
use ring_cache::storage::{Coordinator, HttpPeerClient};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = NodeConfig::parse();

    tracing::info!(
        "Starting cache node {} on {} (advertised as {})",
        config.node_id,
        config.bind,
        config.advertise_address()
    );

    // 1. Ring, empty until the first reconciliation:
    let ring = Arc::new(HashRing::new());

    // 2. Membership reconciliation:
    let source: Arc<dyn HealthSource> = match &config.health_url {
        Some(url) => {
            tracing::info!("Polling health reports from {}", url);
            Arc::new(HttpHealthSource::new(url.clone(), config.peer_timeout() * 4))
        }
        None => {
            tracing::info!("No health URL, using static membership");
            Arc::new(StaticHealthSource::new(config.static_report()))
        }
    };
    let reconciler = Reconciler::new(
        ring.clone(),
        source,
        config.node_defaults(),
        config.reconcile_interval(),
    );
    let _reconcile_handle = reconciler.start();

    // 3. Coordinator:
    let peers = Arc::new(HttpPeerClient::new(
        config.peer_timeout(),
        config.peer_attempts,
    ));
    let coordinator = Arc::new(Coordinator::new(
        config.node_id.clone(),
        ring,
        peers,
        config.cache_settings(),
    ));

    // 4. HTTP server:
    let app = router(coordinator);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("HTTP server listening on {}", config.bind);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
