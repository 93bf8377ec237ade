use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// A workout session (one visit to the gym).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: RecordId,
    pub user_id: String,
    /// Template this session was started from, if any. Soft reference:
    /// a session survives deletion of its template.
    pub template_id: Option<RecordId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            user_id: user_id.into(),
            template_id: None,
            started_at: now,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_template_id(mut self, template_id: RecordId) -> Self {
        self.template_id = Some(template_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_completed() { "completed" } else { "in progress" };
        write!(f, "Session {} ({})", self.started_at.format("%Y-%m-%d %H:%M"), status)?;
        if let Some(notes) = &self.notes {
            write!(f, " - {}", notes)?;
        }
        Ok(())
    }
}

/// One exercise performed within a session, in order.
///
/// Sets hang off this record, so the progression calculator reads a
/// "performance" as a session exercise plus its logged sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub id: RecordId,
    pub session_id: RecordId,
    pub exercise_id: RecordId,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionExercise {
    pub fn new(session_id: RecordId, exercise_id: RecordId, position: i64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            session_id,
            exercise_id,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}
