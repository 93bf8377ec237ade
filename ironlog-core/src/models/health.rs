use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// A daily health metric entry: bodyweight, sleep hours, resting heart
/// rate, or any other named metric with a numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    pub id: RecordId,
    pub user_id: String,
    pub metric: String,
    pub value: f64,
    pub unit: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthEntry {
    pub fn new(user_id: impl Into<String>, metric: impl Into<String>, value: f64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            user_id: user_id.into(),
            metric: metric.into(),
            value,
            unit: None,
            recorded_at: now,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl fmt::Display for HealthEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " {}", unit)?;
        }
        write!(f, " ({})", self.recorded_at.format("%Y-%m-%d"))
    }
}

/// A file attached to a health entry (photo, lab report).
///
/// Only the descriptor syncs through the queue; the file body is
/// uploaded out of band and referenced by `storage_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAttachment {
    pub id: RecordId,
    pub health_entry_id: RecordId,
    pub file_name: String,
    pub mime_type: String,
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthAttachment {
    pub fn new(
        health_entry_id: RecordId,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            health_entry_id,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            storage_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_storage_path(mut self, storage_path: impl Into<String>) -> Self {
        self.storage_path = Some(storage_path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_entry_new() {
        let entry = HealthEntry::new("user1", "bodyweight", 82.4).with_unit("kg");

        assert_eq!(entry.metric, "bodyweight");
        assert_eq!(entry.value, 82.4);
        assert_eq!(entry.unit, Some("kg".to_string()));
    }

    #[test]
    fn test_health_entry_display() {
        let entry = HealthEntry::new("user1", "sleep", 7.5).with_unit("h");
        let display = format!("{}", entry);
        assert!(display.starts_with("sleep: 7.5 h"));
    }

    #[test]
    fn test_attachment_new() {
        let entry_id = RecordId::generate();
        let attachment = HealthAttachment::new(entry_id.clone(), "bloodwork.pdf", "application/pdf")
            .with_storage_path("health/2025/bloodwork.pdf");

        assert_eq!(attachment.health_entry_id, entry_id);
        assert_eq!(attachment.file_name, "bloodwork.pdf");
        assert_eq!(
            attachment.storage_path,
            Some("health/2025/bloodwork.pdf".to_string())
        );
    }

    #[test]
    fn test_health_entry_json_roundtrip() {
        let entry = HealthEntry::new("user1", "resting_hr", 52.0).with_notes("morning");
        let json = serde_json::to_string(&entry).unwrap();
        let back: HealthEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
