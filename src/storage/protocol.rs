//! Cache Network Protocol
//!
//! Endpoints and Data Transfer Objects (DTOs) shared by the HTTP handlers and
//! the peer client. Values travel as arbitrary JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- API Endpoints ---

/// Public endpoint for client writes; routed through the ring.
pub const ENDPOINT_SET: &str = "/set";
/// Endpoint a coordinator uses to push a write to another owner.
pub const ENDPOINT_SET_REPLICA: &str = "/set-replica";
/// Public endpoint for client reads; routed to the primary owner.
pub const ENDPOINT_GET: &str = "/get";
/// Internal endpoint reading the local store only (no routing).
pub const ENDPOINT_GET_INTERNAL: &str = "/internal/get";
/// Full local store contents.
pub const ENDPOINT_DUMP: &str = "/get-content";
pub const ENDPOINT_HEALTH: &str = "/health";
/// Ring membership and point distribution.
pub const ENDPOINT_RING: &str = "/ring";

// --- Data Transfer Objects ---

/// Client write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
}

/// Write pushed from the coordinator that accepted it to another owner.
/// Stored as-is by the receiver, never forwarded again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicateRequest {
    pub key: String,
    pub value: Value,
}

/// Delivery failure for one owner during a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedReplica {
    pub node: String,
    pub address: String,
    pub error: String,
    pub retryable: bool,
}

/// Write acknowledgment. `success` is true when at least one owner holds
/// the value; `failed` lists the owners that did not receive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResponse {
    pub success: bool,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedReplica>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read response. `value` is `None` when the key is absent or the read failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub retryable: bool,
}

impl GetResponse {
    pub fn found(key: String, value: Value) -> Self {
        Self {
            key,
            value: Some(value),
            error: None,
            retryable: false,
        }
    }

    pub fn failed(key: String, error: String, retryable: bool) -> Self {
        Self {
            key,
            value: None,
            error: Some(error),
            retryable,
        }
    }
}
