use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// An exercise definition (e.g. "Barbell Squat").
///
/// `kind` selects the rep-range policy used by the progression
/// calculator; `increment_kg` is the load added after a successful
/// session at this exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: RecordId,
    pub user_id: String,
    pub name: String,
    pub kind: i64,
    pub increment_kg: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exercise {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: i64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            user_id: user_id.into(),
            name: name.into(),
            kind,
            increment_kg: 2.5,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_increment(mut self, increment_kg: f64) -> Self {
        self.increment_kg = increment_kg;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (kind {}, +{} kg)", self.name, self.kind, self.increment_kg)?;
        if let Some(notes) = &self.notes {
            write!(f, " - {}", notes)?;
        }
        Ok(())
    }
}
