//! Error types for tablet calls.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for tablet operations.
pub type TabletResult<T> = Result<T, TabletError>;

#[derive(Debug, Error)]
pub enum TabletError {
    /// No action loop is reachable at the address.
    #[error("tablet at {0} is unavailable")]
    Unavailable(String),

    #[error("call to tablet at {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// The action loop exited before answering.
    #[error("action loop for tablet {0} has stopped")]
    Stopped(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl TabletError {
    /// Whether the failure means the tablet could not be reached at all,
    /// as opposed to answering with an error.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            TabletError::Unavailable(_) | TabletError::Timeout { .. } | TabletError::Stopped(_)
        )
    }
}
