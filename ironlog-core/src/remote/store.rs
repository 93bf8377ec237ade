//! The remote store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::RemoteError;
use crate::record_id::RecordId;
use crate::sync::{EntityKind, Payload};

/// A record as returned by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    /// Server-assigned id (may equal the client-minted id).
    pub id: RecordId,
    /// Server-side last-modified timestamp, when reported.
    pub updated_at: Option<DateTime<Utc>>,
    /// Full record body as JSON.
    pub fields: Value,
}

/// Write access to the backend, one call per queued operation.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates a record, upserting by primary key so a replayed create
    /// is idempotent. Returns the stored record.
    async fn create(&self, entity: EntityKind, payload: &Payload) -> Result<RemoteRecord, RemoteError>;

    /// Applies a partial patch to a record. When `if_unmodified_since`
    /// is given and the server copy changed after that instant, the
    /// patch must not apply and the error must be conflict-classed.
    async fn update(
        &self,
        entity: EntityKind,
        id: &RecordId,
        patch: &Payload,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Deletes a record. Deleting a record that does not exist is a
    /// success.
    async fn delete(&self, entity: EntityKind, id: &RecordId) -> Result<(), RemoteError>;

    /// Point read, used to surface the server copy after a conflict.
    async fn fetch(&self, entity: EntityKind, id: &RecordId) -> Result<Option<RemoteRecord>, RemoteError>;
}
