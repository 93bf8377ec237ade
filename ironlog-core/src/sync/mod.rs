//! Offline mutation queue.
//!
//! Writes made while offline (or before the server answers) are
//! captured as [`SyncOperation`]s in a durable queue and replayed
//! against the remote store in dependency order:
//!
//! 1. `enqueue` appends (or coalesces) an operation and, when online,
//!    immediately drains that one operation.
//! 2. `process_sync_queue` drains everything eligible, parents before
//!    children, rewriting locally minted foreign keys through the
//!    identifier map.
//! 3. Failures are classed: network errors abort the pass and flip the
//!    engine offline, rejections back off on a fixed schedule,
//!    conflicts are held for manual resolution, duplicate creates count
//!    as success.

mod engine;
mod entity;
mod error;
mod id_map;
mod op;
mod payload;

pub use engine::{DrainReport, EnqueueOptions, EnqueueOutcome, Mutation, SyncEngine, SyncState};
pub use entity::{EntityKind, RecordRef};
pub use error::SyncError;
pub use id_map::IdMap;
pub use op::{
    backoff_delay, derive_idempotency_key, OpAction, OpStatus, SyncOperation, MAX_RETRIES,
    RETRY_BACKOFF_SECS,
};
pub use payload::{
    ExercisePatch, ExerciseStatePatch, HealthAttachmentPatch, HealthEntryPatch, Payload,
    SessionExercisePatch, SessionPatch, SetPatch, TemplateItemPatch, WorkoutTemplatePatch,
};
