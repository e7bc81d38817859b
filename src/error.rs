//! Error types shared by the ring, the coordinator and the peer transport.

use thiserror::Error;

/// Failure of a single call to a peer node.
///
/// Reported per target: a failed replica write never aborts delivery to the
/// other owners of a key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer {address} did not answer in time")]
    Timeout { address: String },

    #[error("peer {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("peer {address} answered with status {status}")]
    Application { address: String, status: u16 },

    #[error("peer {address} sent an undecodable response: {reason}")]
    Decode { address: String, reason: String },
}

impl PeerError {
    pub fn address(&self) -> &str {
        match self {
            PeerError::Timeout { address }
            | PeerError::Unreachable { address, .. }
            | PeerError::Application { address, .. }
            | PeerError::Decode { address, .. } => address,
        }
    }

    /// Whether a caller may reasonably retry the request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PeerError::Timeout { .. } | PeerError::Unreachable { .. })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("hash ring has no nodes")]
    RingEmpty,

    #[error("node '{0}' not found in ring")]
    NodeNotFound(String),

    #[error("invalid node configuration: {0}")]
    InvalidNodeConfig(String),

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
