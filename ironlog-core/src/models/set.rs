use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// A single logged set: weight lifted for a number of reps, with an
/// optional RPE (rating of perceived exertion, 1-10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub id: RecordId,
    pub session_exercise_id: RecordId,
    pub position: i64,
    pub weight_kg: f64,
    pub reps: i64,
    pub rpe: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoggedSet {
    pub fn new(session_exercise_id: RecordId, position: i64, weight_kg: f64, reps: i64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            session_exercise_id,
            position,
            weight_kg,
            reps,
            rpe: None,
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_rpe(mut self, rpe: f64) -> Self {
        self.rpe = Some(rpe);
        self
    }
}

impl fmt::Display for LoggedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg x {}", self.weight_kg, self.reps)?;
        if let Some(rpe) = self.rpe {
            write!(f, " @ RPE {}", rpe)?;
        }
        Ok(())
    }
}
