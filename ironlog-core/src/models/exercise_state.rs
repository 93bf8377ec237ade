use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// Per-user, per-exercise training state owned by the progression
/// calculator.
///
/// `base_sets` is the normal prescription; `current_sets` drops below it
/// only while `volume_reduced` is set. Nothing outside the progression
/// calculator should mutate these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseState {
    pub id: RecordId,
    pub user_id: String,
    pub exercise_id: RecordId,
    pub working_weight_kg: f64,
    pub current_sets: i64,
    pub base_sets: i64,
    pub volume_reduced: bool,
    pub success_streak: i64,
    pub fail_streak: i64,
    pub last_target_range: Option<String>,
    pub last_recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExerciseState {
    /// State for an exercise trained for the first time: three working
    /// sets, no streaks, weight picked up from the first logged session.
    pub fn new(user_id: impl Into<String>, exercise_id: RecordId) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            user_id: user_id.into(),
            exercise_id,
            working_weight_kg: 0.0,
            current_sets: 3,
            base_sets: 3,
            volume_reduced: false,
            success_streak: 0,
            fail_streak: 0,
            last_target_range: None,
            last_recommendation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_weight(mut self, working_weight_kg: f64) -> Self {
        self.working_weight_kg = working_weight_kg;
        self
    }

    pub fn with_sets(mut self, sets: i64) -> Self {
        self.current_sets = sets;
        self.base_sets = sets;
        self
    }

    /// True when the training prescription and streak bookkeeping match,
    /// ignoring identity and timestamps. Used to detect a no-op apply.
    pub fn same_prescription(&self, other: &ExerciseState) -> bool {
        self.working_weight_kg == other.working_weight_kg
            && self.current_sets == other.current_sets
            && self.base_sets == other.base_sets
            && self.volume_reduced == other.volume_reduced
            && self.success_streak == other.success_streak
            && self.fail_streak == other.fail_streak
            && self.last_target_range == other.last_target_range
            && self.last_recommendation == other.last_recommendation
    }
}

impl fmt::Display for ExerciseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kg x {} sets (streak +{}/-{})",
            self.working_weight_kg, self.current_sets, self.success_streak, self.fail_streak
        )?;
        if self.volume_reduced {
            write!(f, " [reduced from {}]", self.base_sets)?;
        }
        Ok(())
    }
}
