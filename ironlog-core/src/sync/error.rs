//! Sync engine error types.

use thiserror::Error;

use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Errors surfaced by the sync engine's public operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Durable storage failed; the queue may not have been persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A remote failure returned directly to the caller (immediate
    /// drain of a freshly enqueued operation).
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The referenced operation is not in the queue.
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    /// Queue state could not be encoded or decoded.
    #[error("queue state error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_is_transparent() {
        let err = SyncError::from(RemoteError::Rejected("bad reps".into()));
        assert_eq!(format!("{}", err), "rejected: bad reps");
    }

    #[test]
    fn test_not_found_display() {
        let err = SyncError::OperationNotFound("op-42".into());
        assert_eq!(format!("{}", err), "operation not found: op-42");
    }
}
