use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::coordinator::Coordinator;
use super::peer::PeerClient;
use super::protocol::{
    ENDPOINT_DUMP, ENDPOINT_GET, ENDPOINT_GET_INTERNAL, ENDPOINT_HEALTH, ENDPOINT_RING,
    ENDPOINT_SET, ENDPOINT_SET_REPLICA, FailedReplica, GetResponse, ReplicateRequest, SetRequest,
    SetResponse,
};
use crate::error::CacheError;
use crate::ring::RingSummary;

/// HTTP surface of one cache node.
pub fn router<P: PeerClient + 'static>(coordinator: Arc<Coordinator<P>>) -> Router {
    Router::new()
        .route(ENDPOINT_SET, post(handle_set::<P>))
        .route(ENDPOINT_SET_REPLICA, post(handle_set_replica::<P>))
        .route(&format!("{}/:key", ENDPOINT_GET), get(handle_get::<P>))
        .route(
            &format!("{}/:key", ENDPOINT_GET_INTERNAL),
            get(handle_get_internal::<P>),
        )
        .route(ENDPOINT_DUMP, get(handle_dump::<P>))
        .route(ENDPOINT_RING, get(handle_ring::<P>))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(coordinator))
}

pub async fn handle_set<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
    Json(req): Json<SetRequest>,
) -> (StatusCode, Json<SetResponse>) {
    match coordinator.set(&req.key, req.value).await {
        Ok(summary) => {
            let status = if summary.is_accepted() {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            let failed = summary
                .failed
                .into_iter()
                .map(|failure| FailedReplica {
                    retryable: failure.error.is_retryable(),
                    error: failure.error.to_string(),
                    node: failure.node,
                    address: failure.address,
                })
                .collect::<Vec<_>>();
            if !failed.is_empty() {
                tracing::warn!("SET {}: {} replica(s) missed the write", req.key, failed.len());
            }
            (
                status,
                Json(SetResponse {
                    success: status == StatusCode::OK,
                    delivered: summary.delivered,
                    failed,
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!("SET {} failed: {}", req.key, e);
            let status = match e {
                CacheError::RingEmpty => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(SetResponse {
                    success: false,
                    delivered: Vec::new(),
                    failed: Vec::new(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_set_replica<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
    Json(req): Json<ReplicateRequest>,
) -> StatusCode {
    coordinator.apply_replica(&req.key, req.value);
    tracing::debug!("Stored replica of {}", req.key);
    StatusCode::OK
}

pub async fn handle_get<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<GetResponse>) {
    match coordinator.get(&key).await {
        Ok(value) => (StatusCode::OK, Json(GetResponse::found(key, value))),
        Err(e) => error_response(key, e),
    }
}

pub async fn handle_get_internal<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<GetResponse>) {
    match coordinator.get_local(&key) {
        Ok(value) => (StatusCode::OK, Json(GetResponse::found(key, value))),
        Err(e) => error_response(key, e),
    }
}

pub async fn handle_dump<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
) -> Json<BTreeMap<String, Value>> {
    Json(coordinator.dump())
}

pub async fn handle_ring<P: PeerClient + 'static>(
    Extension(coordinator): Extension<Arc<Coordinator<P>>>,
) -> Json<RingSummary> {
    Json(coordinator.ring().summary())
}

pub async fn handle_health() -> &'static str {
    "Healthy"
}

/// Maps a read failure onto the status a client should see.
pub fn status_for(error: &CacheError) -> StatusCode {
    match error {
        CacheError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        CacheError::RingEmpty => StatusCode::SERVICE_UNAVAILABLE,
        CacheError::Peer(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        CacheError::Peer(_) => StatusCode::BAD_GATEWAY,
        CacheError::NodeNotFound(_) | CacheError::InvalidNodeConfig(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(key: String, error: CacheError) -> (StatusCode, Json<GetResponse>) {
    let status = status_for(&error);
    if status != StatusCode::NOT_FOUND {
        tracing::error!("GET {} failed: {}", key, error);
    }
    let retryable = status == StatusCode::SERVICE_UNAVAILABLE;
    (
        status,
        Json(GetResponse::failed(key, error.to_string(), retryable)),
    )
}
