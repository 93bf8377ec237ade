//! Storage contract the progression calculator reads and writes
//! through.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Exercise, ExerciseState, LoggedSet, SessionExercise};
use crate::record_id::RecordId;

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("exercise {0} not found")]
    ExerciseNotFound(RecordId),

    #[error("store error: {0}")]
    Store(String),
}

/// Reads and writes the records progression decisions depend on.
///
/// Backed by the SQLite cache in the CLI and by an in-memory fake in
/// tests.
#[async_trait]
pub trait ProgressionStore: Send + Sync {
    /// The exercise definition, carrying kind and increment step.
    async fn exercise(&self, id: &RecordId) -> Result<Option<Exercise>, ProgressionError>;

    /// The persisted training state for a user and exercise, if any.
    async fn state_for(
        &self,
        user_id: &str,
        exercise_id: &RecordId,
    ) -> Result<Option<ExerciseState>, ProgressionError>;

    /// Sets logged for one exercise performance, ordered by position.
    async fn sets_for_performance(
        &self,
        session_exercise_id: &RecordId,
    ) -> Result<Vec<LoggedSet>, ProgressionError>;

    /// Exercise performances recorded in a session.
    async fn performances_for_session(
        &self,
        session_id: &RecordId,
    ) -> Result<Vec<SessionExercise>, ProgressionError>;

    /// Upserts a training state record.
    async fn save_state(&self, state: &ExerciseState) -> Result<(), ProgressionError>;
}
