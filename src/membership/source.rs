use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::Duration;

use super::types::HealthReport;

/// Where the reconciler gets its view of healthy and unhealthy members.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn report(&self) -> Result<HealthReport>;
}

/// A report held in memory and replaced by the owner.
///
/// Used for fixed peer lists and in tests.
#[derive(Debug, Default)]
pub struct StaticHealthSource {
    report: RwLock<HealthReport>,
}

impl StaticHealthSource {
    pub fn new(report: HealthReport) -> Self {
        Self {
            report: RwLock::new(report),
        }
    }

    pub fn set(&self, report: HealthReport) {
        *self.report.write() = report;
    }
}

#[async_trait]
impl HealthSource for StaticHealthSource {
    async fn report(&self) -> Result<HealthReport> {
        Ok(self.report.read().clone())
    }
}

/// Polls a URL that answers with a JSON `HealthReport`, such as a sidecar in
/// front of a load balancer's target-health API.
pub struct HttpHealthSource {
    url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpHealthSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            http_client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl HealthSource for HttpHealthSource {
    async fn report(&self) -> Result<HealthReport> {
        let response = self
            .http_client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Health report request failed {}",
                response.status()
            ));
        }

        Ok(response.json::<HealthReport>().await?)
    }
}
