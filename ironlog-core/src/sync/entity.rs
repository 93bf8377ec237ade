//! Entity kinds known to the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record_id::RecordId;

/// The nine synced entity kinds.
///
/// Each kind maps to one remote table and has a fixed position in the
/// drain order so parent records reach the server before the children
/// that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Exercise,
    Session,
    SessionExercise,
    Set,
    WorkoutTemplate,
    TemplateItem,
    ExerciseState,
    HealthEntry,
    HealthAttachment,
}

impl EntityKind {
    /// All kinds in sync order (parents before children).
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Exercise,
        EntityKind::Session,
        EntityKind::SessionExercise,
        EntityKind::Set,
        EntityKind::WorkoutTemplate,
        EntityKind::TemplateItem,
        EntityKind::ExerciseState,
        EntityKind::HealthEntry,
        EntityKind::HealthAttachment,
    ];

    /// Remote table name for this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Exercise => "exercises",
            EntityKind::Session => "sessions",
            EntityKind::SessionExercise => "session_exercises",
            EntityKind::Set => "sets",
            EntityKind::WorkoutTemplate => "workout_templates",
            EntityKind::TemplateItem => "template_items",
            EntityKind::ExerciseState => "exercise_state",
            EntityKind::HealthEntry => "health_entries",
            EntityKind::HealthAttachment => "health_attachments",
        }
    }

    /// Position in the drain order.
    pub fn sync_order(&self) -> u8 {
        match self {
            EntityKind::Exercise => 0,
            EntityKind::Session => 1,
            EntityKind::SessionExercise => 2,
            EntityKind::Set => 3,
            EntityKind::WorkoutTemplate => 4,
            EntityKind::TemplateItem => 5,
            EntityKind::ExerciseState => 6,
            EntityKind::HealthEntry => 7,
            EntityKind::HealthAttachment => 8,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// A reference to a record of a given kind, used for dependency
/// tracking between queued operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity: EntityKind,
    pub id: RecordId,
}

impl RecordRef {
    pub fn new(entity: EntityKind, id: RecordId) -> Self {
        Self { entity, id }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity.table(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(EntityKind::Exercise.table(), "exercises");
        assert_eq!(EntityKind::SessionExercise.table(), "session_exercises");
        assert_eq!(EntityKind::ExerciseState.table(), "exercise_state");
        assert_eq!(EntityKind::HealthAttachment.table(), "health_attachments");
    }

    #[test]
    fn test_sync_order_parents_first() {
        assert!(EntityKind::Exercise.sync_order() < EntityKind::Session.sync_order());
        assert!(EntityKind::Session.sync_order() < EntityKind::SessionExercise.sync_order());
        assert!(EntityKind::SessionExercise.sync_order() < EntityKind::Set.sync_order());
        assert!(EntityKind::WorkoutTemplate.sync_order() < EntityKind::TemplateItem.sync_order());
        assert!(EntityKind::HealthEntry.sync_order() < EntityKind::HealthAttachment.sync_order());
    }

    #[test]
    fn test_all_matches_sync_order() {
        for (i, kind) in EntityKind::ALL.iter().enumerate() {
            assert_eq!(kind.sync_order() as usize, i);
        }
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::SessionExercise).unwrap();
        assert_eq!(json, "\"session_exercise\"");
    }

    #[test]
    fn test_record_ref_display() {
        let r = RecordRef::new(EntityKind::Set, "abc".into());
        assert_eq!(format!("{}", r), "sets:abc");
    }
}
