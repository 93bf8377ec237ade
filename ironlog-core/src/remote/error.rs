//! Remote error taxonomy.

use thiserror::Error;

/// Errors from the remote store, classed by how the sync engine must
/// react to them.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Transport failure, timeout, or transient server error. Aborts
    /// the drain pass; retried forever with no budget.
    #[error("network error: {0}")]
    Network(String),

    /// The server copy changed since this device last saw it. Held for
    /// manual resolution, never auto-retried.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unique-key violation on create. The record already exists, so
    /// the create is treated as having succeeded.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The server refused the mutation (validation, authorization).
    /// Retried on the backoff schedule up to the budget.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// The reaction class of a [`RemoteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Network,
    Conflict,
    Duplicate,
    Rejected,
}

impl RemoteError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RemoteError::Network(_) => ErrorClass::Network,
            RemoteError::Conflict(_) => ErrorClass::Conflict,
            RemoteError::Duplicate(_) => ErrorClass::Duplicate,
            RemoteError::Rejected(_) => ErrorClass::Rejected,
        }
    }

    pub fn is_network(&self) -> bool {
        self.class() == ErrorClass::Network
    }
}
