use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// A reusable workout plan (e.g. "Push Day A").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutTemplate {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            user_id: user_id.into(),
            name: name.into(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for WorkoutTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(notes) = &self.notes {
            write!(f, " - {}", notes)?;
        }
        Ok(())
    }
}

/// One exercise slot within a template, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: RecordId,
    pub template_id: RecordId,
    pub exercise_id: RecordId,
    pub position: i64,
    pub target_sets: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateItem {
    pub fn new(template_id: RecordId, exercise_id: RecordId, position: i64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            template_id,
            exercise_id,
            position,
            target_sets: 3,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_target_sets(mut self, target_sets: i64) -> Self {
        self.target_sets = target_sets;
        self
    }
}
