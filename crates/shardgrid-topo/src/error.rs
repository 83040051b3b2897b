//! Error types for the topology store.

use thiserror::Error;

use crate::conn::Version;

/// Result type alias for topology operations.
pub type TopoResult<T> = Result<T, TopoError>;

/// Errors that can occur during topology operations.
///
/// `NoNode` is an ordinary outcome that callers are expected to match on;
/// `Unavailable` covers every failure of the underlying storage engine.
#[derive(Debug, Error)]
pub enum TopoError {
    #[error("node doesn't exist: {0}")]
    NoNode(String),

    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("bad node version for {path}: expected {expected}, found {actual}")]
    BadVersion {
        path: String,
        expected: Version,
        actual: Version,
    },

    #[error("topology store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error for {path}: {reason}")]
    Deserialize { path: String, reason: String },
}

impl TopoError {
    pub fn is_no_node(&self) -> bool {
        matches!(self, TopoError::NoNode(_))
    }

    pub fn is_node_exists(&self) -> bool {
        matches!(self, TopoError::NodeExists(_))
    }

    pub fn is_bad_version(&self) -> bool {
        matches!(self, TopoError::BadVersion { .. })
    }
}
