//! Typed mutation payloads, one variant per entity kind.
//!
//! A payload carries the fields a mutation writes. Every field is
//! optional so the same shape serves full create drafts and partial
//! update patches. Foreign-key rewriting and dependency derivation
//! match on the variant, so a reference field can never be missed by a
//! misspelled key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{EntityKind, RecordRef};
use super::id_map::IdMap;
use crate::models::{
    Exercise, ExerciseState, HealthAttachment, HealthEntry, LoggedSet, Session, SessionExercise,
    TemplateItem, WorkoutTemplate,
};
use crate::record_id::RecordId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExercisePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub increment_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionExercisePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_exercise_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_reduced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_streak: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_streak: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_target_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthAttachmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_entry_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A mutation payload tagged with its entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "fields", rename_all = "snake_case")]
pub enum Payload {
    Exercise(ExercisePatch),
    Session(SessionPatch),
    SessionExercise(SessionExercisePatch),
    Set(SetPatch),
    WorkoutTemplate(WorkoutTemplatePatch),
    TemplateItem(TemplateItemPatch),
    ExerciseState(ExerciseStatePatch),
    HealthEntry(HealthEntryPatch),
    HealthAttachment(HealthAttachmentPatch),
}

impl Payload {
    /// An empty payload of the given kind (used for deletes).
    pub fn empty(entity: EntityKind) -> Self {
        match entity {
            EntityKind::Exercise => Payload::Exercise(ExercisePatch::default()),
            EntityKind::Session => Payload::Session(SessionPatch::default()),
            EntityKind::SessionExercise => Payload::SessionExercise(SessionExercisePatch::default()),
            EntityKind::Set => Payload::Set(SetPatch::default()),
            EntityKind::WorkoutTemplate => Payload::WorkoutTemplate(WorkoutTemplatePatch::default()),
            EntityKind::TemplateItem => Payload::TemplateItem(TemplateItemPatch::default()),
            EntityKind::ExerciseState => Payload::ExerciseState(ExerciseStatePatch::default()),
            EntityKind::HealthEntry => Payload::HealthEntry(HealthEntryPatch::default()),
            EntityKind::HealthAttachment => Payload::HealthAttachment(HealthAttachmentPatch::default()),
        }
    }

    /// The entity kind this payload mutates.
    pub fn entity(&self) -> EntityKind {
        match self {
            Payload::Exercise(_) => EntityKind::Exercise,
            Payload::Session(_) => EntityKind::Session,
            Payload::SessionExercise(_) => EntityKind::SessionExercise,
            Payload::Set(_) => EntityKind::Set,
            Payload::WorkoutTemplate(_) => EntityKind::WorkoutTemplate,
            Payload::TemplateItem(_) => EntityKind::TemplateItem,
            Payload::ExerciseState(_) => EntityKind::ExerciseState,
            Payload::HealthEntry(_) => EntityKind::HealthEntry,
            Payload::HealthAttachment(_) => EntityKind::HealthAttachment,
        }
    }

    /// The record id carried in the payload, if any.
    pub fn id(&self) -> Option<&RecordId> {
        match self {
            Payload::Exercise(p) => p.id.as_ref(),
            Payload::Session(p) => p.id.as_ref(),
            Payload::SessionExercise(p) => p.id.as_ref(),
            Payload::Set(p) => p.id.as_ref(),
            Payload::WorkoutTemplate(p) => p.id.as_ref(),
            Payload::TemplateItem(p) => p.id.as_ref(),
            Payload::ExerciseState(p) => p.id.as_ref(),
            Payload::HealthEntry(p) => p.id.as_ref(),
            Payload::HealthAttachment(p) => p.id.as_ref(),
        }
    }

    /// Sets the record id carried in the payload.
    pub fn set_id(&mut self, id: RecordId) {
        match self {
            Payload::Exercise(p) => p.id = Some(id),
            Payload::Session(p) => p.id = Some(id),
            Payload::SessionExercise(p) => p.id = Some(id),
            Payload::Set(p) => p.id = Some(id),
            Payload::WorkoutTemplate(p) => p.id = Some(id),
            Payload::TemplateItem(p) => p.id = Some(id),
            Payload::ExerciseState(p) => p.id = Some(id),
            Payload::HealthEntry(p) => p.id = Some(id),
            Payload::HealthAttachment(p) => p.id = Some(id),
        }
    }

    /// Field-wise merge for update coalescing: every field present in
    /// `newer` overwrites the older value, fields absent in `newer`
    /// survive. Mismatched kinds replace wholesale (the engine never
    /// merges across kinds).
    pub fn merge(&mut self, newer: &Payload) {
        match (self, newer) {
            (Payload::Exercise(a), Payload::Exercise(b)) => a.merge_from(b),
            (Payload::Session(a), Payload::Session(b)) => a.merge_from(b),
            (Payload::SessionExercise(a), Payload::SessionExercise(b)) => a.merge_from(b),
            (Payload::Set(a), Payload::Set(b)) => a.merge_from(b),
            (Payload::WorkoutTemplate(a), Payload::WorkoutTemplate(b)) => a.merge_from(b),
            (Payload::TemplateItem(a), Payload::TemplateItem(b)) => a.merge_from(b),
            (Payload::ExerciseState(a), Payload::ExerciseState(b)) => a.merge_from(b),
            (Payload::HealthEntry(a), Payload::HealthEntry(b)) => a.merge_from(b),
            (Payload::HealthAttachment(a), Payload::HealthAttachment(b)) => a.merge_from(b),
            (this, other) => *this = other.clone(),
        }
    }

    /// Parent records this payload references, for dependency tracking.
    ///
    /// A session's `template_id` is deliberately absent: it is a soft
    /// reference and must not hold a session back.
    pub fn references(&self) -> Vec<RecordRef> {
        let mut refs = Vec::new();
        match self {
            Payload::Exercise(_)
            | Payload::Session(_)
            | Payload::WorkoutTemplate(_)
            | Payload::HealthEntry(_) => {}
            Payload::SessionExercise(p) => {
                push_ref(&mut refs, EntityKind::Session, &p.session_id);
                push_ref(&mut refs, EntityKind::Exercise, &p.exercise_id);
            }
            Payload::Set(p) => {
                push_ref(&mut refs, EntityKind::SessionExercise, &p.session_exercise_id);
            }
            Payload::TemplateItem(p) => {
                push_ref(&mut refs, EntityKind::WorkoutTemplate, &p.template_id);
                push_ref(&mut refs, EntityKind::Exercise, &p.exercise_id);
            }
            Payload::ExerciseState(p) => {
                push_ref(&mut refs, EntityKind::Exercise, &p.exercise_id);
            }
            Payload::HealthAttachment(p) => {
                push_ref(&mut refs, EntityKind::HealthEntry, &p.health_entry_id);
            }
        }
        refs
    }

    /// Rewrites every foreign-key field through the identifier map,
    /// replacing local ids with their server-assigned counterparts.
    pub fn rewrite_refs(&mut self, map: &IdMap) {
        match self {
            Payload::Exercise(_) | Payload::WorkoutTemplate(_) | Payload::HealthEntry(_) => {}
            Payload::Session(p) => {
                rewrite(map, EntityKind::WorkoutTemplate, &mut p.template_id);
            }
            Payload::SessionExercise(p) => {
                rewrite(map, EntityKind::Session, &mut p.session_id);
                rewrite(map, EntityKind::Exercise, &mut p.exercise_id);
            }
            Payload::Set(p) => {
                rewrite(map, EntityKind::SessionExercise, &mut p.session_exercise_id);
            }
            Payload::TemplateItem(p) => {
                rewrite(map, EntityKind::WorkoutTemplate, &mut p.template_id);
                rewrite(map, EntityKind::Exercise, &mut p.exercise_id);
            }
            Payload::ExerciseState(p) => {
                rewrite(map, EntityKind::Exercise, &mut p.exercise_id);
            }
            Payload::HealthAttachment(p) => {
                rewrite(map, EntityKind::HealthEntry, &mut p.health_entry_id);
            }
        }
    }

    /// The payload fields as a JSON object, as sent on the wire.
    pub fn fields_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Payload::Exercise(p) => serde_json::to_value(p),
            Payload::Session(p) => serde_json::to_value(p),
            Payload::SessionExercise(p) => serde_json::to_value(p),
            Payload::Set(p) => serde_json::to_value(p),
            Payload::WorkoutTemplate(p) => serde_json::to_value(p),
            Payload::TemplateItem(p) => serde_json::to_value(p),
            Payload::ExerciseState(p) => serde_json::to_value(p),
            Payload::HealthEntry(p) => serde_json::to_value(p),
            Payload::HealthAttachment(p) => serde_json::to_value(p),
        }
    }
}

fn push_ref(refs: &mut Vec<RecordRef>, entity: EntityKind, id: &Option<RecordId>) {
    if let Some(id) = id {
        refs.push(RecordRef::new(entity, id.clone()));
    }
}

fn rewrite(map: &IdMap, entity: EntityKind, field: &mut Option<RecordId>) {
    if let Some(id) = field {
        *id = map.resolve(entity, id);
    }
}

impl ExercisePatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.user_id, &newer.user_id);
        merge_opt(&mut self.name, &newer.name);
        merge_opt(&mut self.kind, &newer.kind);
        merge_opt(&mut self.increment_kg, &newer.increment_kg);
        merge_opt(&mut self.notes, &newer.notes);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl SessionPatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.user_id, &newer.user_id);
        merge_opt(&mut self.template_id, &newer.template_id);
        merge_opt(&mut self.started_at, &newer.started_at);
        merge_opt(&mut self.completed_at, &newer.completed_at);
        merge_opt(&mut self.notes, &newer.notes);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl SessionExercisePatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.session_id, &newer.session_id);
        merge_opt(&mut self.exercise_id, &newer.exercise_id);
        merge_opt(&mut self.position, &newer.position);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl SetPatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.session_exercise_id, &newer.session_exercise_id);
        merge_opt(&mut self.position, &newer.position);
        merge_opt(&mut self.weight_kg, &newer.weight_kg);
        merge_opt(&mut self.reps, &newer.reps);
        merge_opt(&mut self.rpe, &newer.rpe);
        merge_opt(&mut self.completed_at, &newer.completed_at);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl WorkoutTemplatePatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.user_id, &newer.user_id);
        merge_opt(&mut self.name, &newer.name);
        merge_opt(&mut self.notes, &newer.notes);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl TemplateItemPatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.template_id, &newer.template_id);
        merge_opt(&mut self.exercise_id, &newer.exercise_id);
        merge_opt(&mut self.position, &newer.position);
        merge_opt(&mut self.target_sets, &newer.target_sets);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl ExerciseStatePatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.user_id, &newer.user_id);
        merge_opt(&mut self.exercise_id, &newer.exercise_id);
        merge_opt(&mut self.working_weight_kg, &newer.working_weight_kg);
        merge_opt(&mut self.current_sets, &newer.current_sets);
        merge_opt(&mut self.base_sets, &newer.base_sets);
        merge_opt(&mut self.volume_reduced, &newer.volume_reduced);
        merge_opt(&mut self.success_streak, &newer.success_streak);
        merge_opt(&mut self.fail_streak, &newer.fail_streak);
        merge_opt(&mut self.last_target_range, &newer.last_target_range);
        merge_opt(&mut self.last_recommendation, &newer.last_recommendation);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl HealthEntryPatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.user_id, &newer.user_id);
        merge_opt(&mut self.metric, &newer.metric);
        merge_opt(&mut self.value, &newer.value);
        merge_opt(&mut self.unit, &newer.unit);
        merge_opt(&mut self.recorded_at, &newer.recorded_at);
        merge_opt(&mut self.notes, &newer.notes);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

impl HealthAttachmentPatch {
    fn merge_from(&mut self, newer: &Self) {
        merge_opt(&mut self.id, &newer.id);
        merge_opt(&mut self.health_entry_id, &newer.health_entry_id);
        merge_opt(&mut self.file_name, &newer.file_name);
        merge_opt(&mut self.mime_type, &newer.mime_type);
        merge_opt(&mut self.storage_path, &newer.storage_path);
        merge_opt(&mut self.updated_at, &newer.updated_at);
    }
}

fn merge_opt<T: Clone>(older: &mut Option<T>, newer: &Option<T>) {
    if newer.is_some() {
        *older = newer.clone();
    }
}

impl From<&Exercise> for Payload {
    fn from(e: &Exercise) -> Self {
        Payload::Exercise(ExercisePatch {
            id: Some(e.id.clone()),
            user_id: Some(e.user_id.clone()),
            name: Some(e.name.clone()),
            kind: Some(e.kind),
            increment_kg: Some(e.increment_kg),
            notes: e.notes.clone(),
            updated_at: Some(e.updated_at),
        })
    }
}

impl From<&Session> for Payload {
    fn from(s: &Session) -> Self {
        Payload::Session(SessionPatch {
            id: Some(s.id.clone()),
            user_id: Some(s.user_id.clone()),
            template_id: s.template_id.clone(),
            started_at: Some(s.started_at),
            completed_at: s.completed_at,
            notes: s.notes.clone(),
            updated_at: Some(s.updated_at),
        })
    }
}

impl From<&SessionExercise> for Payload {
    fn from(se: &SessionExercise) -> Self {
        Payload::SessionExercise(SessionExercisePatch {
            id: Some(se.id.clone()),
            session_id: Some(se.session_id.clone()),
            exercise_id: Some(se.exercise_id.clone()),
            position: Some(se.position),
            updated_at: Some(se.updated_at),
        })
    }
}

impl From<&LoggedSet> for Payload {
    fn from(s: &LoggedSet) -> Self {
        Payload::Set(SetPatch {
            id: Some(s.id.clone()),
            session_exercise_id: Some(s.session_exercise_id.clone()),
            position: Some(s.position),
            weight_kg: Some(s.weight_kg),
            reps: Some(s.reps),
            rpe: s.rpe,
            completed_at: s.completed_at,
            updated_at: Some(s.updated_at),
        })
    }
}

impl From<&WorkoutTemplate> for Payload {
    fn from(t: &WorkoutTemplate) -> Self {
        Payload::WorkoutTemplate(WorkoutTemplatePatch {
            id: Some(t.id.clone()),
            user_id: Some(t.user_id.clone()),
            name: Some(t.name.clone()),
            notes: t.notes.clone(),
            updated_at: Some(t.updated_at),
        })
    }
}

impl From<&TemplateItem> for Payload {
    fn from(i: &TemplateItem) -> Self {
        Payload::TemplateItem(TemplateItemPatch {
            id: Some(i.id.clone()),
            template_id: Some(i.template_id.clone()),
            exercise_id: Some(i.exercise_id.clone()),
            position: Some(i.position),
            target_sets: Some(i.target_sets),
            updated_at: Some(i.updated_at),
        })
    }
}

impl From<&ExerciseState> for Payload {
    fn from(s: &ExerciseState) -> Self {
        Payload::ExerciseState(ExerciseStatePatch {
            id: Some(s.id.clone()),
            user_id: Some(s.user_id.clone()),
            exercise_id: Some(s.exercise_id.clone()),
            working_weight_kg: Some(s.working_weight_kg),
            current_sets: Some(s.current_sets),
            base_sets: Some(s.base_sets),
            volume_reduced: Some(s.volume_reduced),
            success_streak: Some(s.success_streak),
            fail_streak: Some(s.fail_streak),
            last_target_range: s.last_target_range.clone(),
            last_recommendation: s.last_recommendation.clone(),
            updated_at: Some(s.updated_at),
        })
    }
}

impl From<&HealthEntry> for Payload {
    fn from(h: &HealthEntry) -> Self {
        Payload::HealthEntry(HealthEntryPatch {
            id: Some(h.id.clone()),
            user_id: Some(h.user_id.clone()),
            metric: Some(h.metric.clone()),
            value: Some(h.value),
            unit: h.unit.clone(),
            recorded_at: Some(h.recorded_at),
            notes: h.notes.clone(),
            updated_at: Some(h.updated_at),
        })
    }
}

impl From<&HealthAttachment> for Payload {
    fn from(a: &HealthAttachment) -> Self {
        Payload::HealthAttachment(HealthAttachmentPatch {
            id: Some(a.id.clone()),
            health_entry_id: Some(a.health_entry_id.clone()),
            file_name: Some(a.file_name.clone()),
            mime_type: Some(a.mime_type.clone()),
            storage_path: a.storage_path.clone(),
            updated_at: Some(a.updated_at),
        })
    }
}
