//! Ironlog Core Library
//!
//! Shared types and logic for Ironlog applications: workout and health
//! models, the offline mutation queue, and the progressive-overload
//! calculator.

pub mod models;
pub mod progression;
pub mod record_id;
pub mod remote;
pub mod storage;
pub mod sync;

pub use models::{
    Exercise, ExerciseState, HealthAttachment, HealthEntry, LoggedSet, Session, SessionExercise,
    TemplateItem, WorkoutTemplate,
};
pub use progression::{
    ProgressionError, ProgressionStore, Recommendation, RepRange, apply_recommendation,
    is_preview_different, preview, recommendations_for_session,
};
pub use record_id::RecordId;
pub use remote::{check_server, HttpRemote, RemoteError, RemoteRecord, RemoteStore};
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError};
pub use sync::{
    DrainReport, EnqueueOptions, EnqueueOutcome, EntityKind, IdMap, Mutation, OpAction, OpStatus,
    Payload, RecordRef, SyncEngine, SyncError, SyncOperation, SyncState,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
