//! Store error taxonomy shared by every adapter implementation.

use thiserror::Error;

/// Failure modes of a balance store call.
///
/// `NotFound` is benign (no row yet; callers default) and must never be
/// folded into the transport failures, which trigger the recovery path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,
    #[error("store call timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("store rejected the request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// True for failures handled locally by defaulting, never surfaced as
    /// errors to the user.
    pub fn is_benign(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// True when the blunt reconnect-and-reload recovery should run.
    pub fn needs_recovery(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Transport(_))
    }
}
