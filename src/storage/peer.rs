use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::protocol::{ENDPOINT_GET_INTERNAL, ENDPOINT_SET_REPLICA, GetResponse, ReplicateRequest};
use crate::error::PeerError;

/// Calls into another node's local store.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Stores `value` under `key` on the node at `address`.
    async fn replicate(&self, address: &str, key: &str, value: &Value) -> Result<(), PeerError>;

    /// Reads `key` from the local store of the node at `address`.
    async fn fetch(&self, address: &str, key: &str) -> Result<Option<Value>, PeerError>;
}

/// `PeerClient` over the cache's own HTTP endpoints.
///
/// Refused connections are retried with exponential backoff and jitter;
/// timeouts and HTTP errors are returned straight away.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
    timeout: Duration,
    attempts: usize,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration, attempts: usize) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
            attempts: attempts.max(1),
        }
    }

    fn url(address: &str, endpoint: &str, key: Option<&str>) -> Result<reqwest::Url, PeerError> {
        let mut url = reqwest::Url::parse(&format!("http://{}{}", address, endpoint)).map_err(
            |e| PeerError::Unreachable {
                address: address.to_string(),
                reason: format!("invalid address: {}", e),
            },
        )?;
        if let Some(key) = key {
            url.path_segments_mut()
                .map_err(|_| PeerError::Unreachable {
                    address: address.to_string(),
                    reason: "address cannot carry a path".to_string(),
                })?
                .push(key);
        }
        Ok(url)
    }

    async fn send_with_retry<F>(
        &self,
        address: &str,
        build: F,
    ) -> Result<reqwest::Response, PeerError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut delay_ms = 50u64;

        for attempt in 0..self.attempts {
            match build().timeout(self.timeout).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() => {
                    return Err(PeerError::Timeout {
                        address: address.to_string(),
                    });
                }
                Err(e) => {
                    if !e.is_connect() || attempt + 1 == self.attempts {
                        return Err(PeerError::Unreachable {
                            address: address.to_string(),
                            reason: e.to_string(),
                        });
                    }
                    tracing::debug!(
                        "Peer {} refused attempt {}: {}, retrying",
                        address,
                        attempt + 1,
                        e
                    );
                    let jitter = rand::random::<u64>() % 25;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(400);
                }
            }
        }

        Err(PeerError::Unreachable {
            address: address.to_string(),
            reason: "retry attempts exhausted".to_string(),
        })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn replicate(&self, address: &str, key: &str, value: &Value) -> Result<(), PeerError> {
        let url = Self::url(address, ENDPOINT_SET_REPLICA, None)?;
        let payload = ReplicateRequest {
            key: key.to_string(),
            value: value.clone(),
        };

        let response = self
            .send_with_retry(address, || {
                self.http_client.post(url.clone()).json(&payload)
            })
            .await?;

        if !response.status().is_success() {
            return Err(PeerError::Application {
                address: address.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, address: &str, key: &str) -> Result<Option<Value>, PeerError> {
        let url = Self::url(address, ENDPOINT_GET_INTERNAL, Some(key))?;

        let response = self
            .send_with_retry(address, || self.http_client.get(url.clone()))
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PeerError::Application {
                address: address.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: GetResponse = response.json().await.map_err(|e| PeerError::Decode {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        Ok(body.value)
    }
}
