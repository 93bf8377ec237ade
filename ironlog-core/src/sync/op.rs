//! Queued sync operations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::entity::{EntityKind, RecordRef};
use super::payload::Payload;
use crate::record_id::RecordId;

/// Backoff schedule between automatic retries, in seconds. Retries past
/// the end of the table reuse the last entry.
pub const RETRY_BACKOFF_SECS: [i64; 5] = [2, 5, 15, 30, 60];

/// Automatic retries per operation before it is held for manual retry.
pub const MAX_RETRIES: u32 = 8;

/// Delay before the next automatic retry after `retry_count` failures.
pub fn backoff_delay(retry_count: u32) -> Duration {
    let index = (retry_count.saturating_sub(1) as usize).min(RETRY_BACKOFF_SECS.len() - 1);
    Duration::seconds(RETRY_BACKOFF_SECS[index])
}

/// What a queued operation does to its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpAction {
    Create,
    Update,
    Delete,
}

impl OpAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpAction::Create => "create",
            OpAction::Update => "update",
            OpAction::Delete => "delete",
        }
    }
}

impl fmt::Display for OpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Queued,
    Syncing,
    Synced,
    Failed,
}

/// One durable entry in the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Queue-local operation id.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub action: OpAction,
    pub payload: Payload,
    pub idempotency_key: String,
    pub status: OpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Id the record has on this device. For creates this is the minted
    /// id; for updates and deletes the id being addressed (which the id
    /// map may translate before transmission).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<RecordId>,
    /// Server id learned when the operation executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<RecordId>,
    /// Records that must exist on the server before this operation may
    /// run. Derived from the payload's reference fields plus anything
    /// the caller adds.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<RecordRef>,
    /// When the record was last modified locally. Drives last-writer-
    /// wins conflict detection on updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_modified_at: Option<DateTime<Utc>>,
}

impl SyncOperation {
    /// The entity kind this operation touches.
    pub fn entity(&self) -> EntityKind {
        self.payload.entity()
    }

    /// The id the operation addresses, before id-map translation.
    pub fn target_id(&self) -> Option<&RecordId> {
        self.local_id.as_ref().or_else(|| self.payload.id())
    }

    /// Whether the operation may be attempted at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            OpStatus::Queued => true,
            OpStatus::Failed => {
                self.retry_count < MAX_RETRIES
                    && self.next_retry_at.map_or(false, |at| at <= now)
            }
            OpStatus::Syncing | OpStatus::Synced => false,
        }
    }

    /// Whether enqueue-time coalescing may merge a newer patch into
    /// this operation.
    pub fn can_absorb_update(&self) -> bool {
        matches!(self.status, OpStatus::Queued | OpStatus::Failed)
            && matches!(self.action, OpAction::Create | OpAction::Update)
    }
}

/// Derives a stable idempotency key for an operation.
pub fn derive_idempotency_key(
    action: OpAction,
    payload: &Payload,
    created_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(payload.entity().table().as_bytes());
    hasher.update(action.as_str().as_bytes());
    hasher.update(serde_json::to_vec(payload)?);
    hasher.update(created_at.timestamp_millis().to_be_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
