//! Local-to-server identifier mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::entity::EntityKind;
use crate::record_id::RecordId;

/// Maps locally minted record ids to their server-assigned ids.
///
/// Keys are `"<table>:<local_id>"`. A create's local id is mapped to
/// itself as soon as the operation is enqueued, then overwritten with
/// the real server id once the create executes. Persisted beside the
/// sync queue so mappings survive restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdMap {
    entries: HashMap<String, RecordId>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(entity: EntityKind, local_id: &RecordId) -> String {
        format!("{}:{}", entity.table(), local_id)
    }

    /// Records a mapping from a local id to a server id.
    pub fn insert(&mut self, entity: EntityKind, local_id: RecordId, server_id: RecordId) {
        self.entries.insert(Self::key(entity, &local_id), server_id);
    }

    /// The server id mapped for a local id, if any.
    pub fn server_id(&self, entity: EntityKind, local_id: &RecordId) -> Option<&RecordId> {
        self.entries.get(&Self::key(entity, local_id))
    }

    /// Translates an id through the map, returning it unchanged when no
    /// mapping exists (already a server id, or never queued here).
    pub fn resolve(&self, entity: EntityKind, id: &RecordId) -> RecordId {
        self.server_id(entity, id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_resolve() {
        let mut map = IdMap::new();
        map.insert(EntityKind::Session, "local-1".into(), "srv-9".into());

        assert_eq!(map.server_id(EntityKind::Session, &"local-1".into()), Some(&"srv-9".into()));
        assert_eq!(map.resolve(EntityKind::Session, &"local-1".into()), "srv-9".into());
    }

    #[test]
    fn test_resolve_unmapped_returns_input() {
        let map = IdMap::new();
        assert_eq!(map.resolve(EntityKind::Set, &"abc".into()), "abc".into());
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let mut map = IdMap::new();
        map.insert(EntityKind::Session, "x".into(), "srv-session".into());
        map.insert(EntityKind::Exercise, "x".into(), "srv-exercise".into());

        assert_eq!(map.resolve(EntityKind::Session, &"x".into()), "srv-session".into());
        assert_eq!(map.resolve(EntityKind::Exercise, &"x".into()), "srv-exercise".into());
    }

    #[test]
    fn test_overwrite_optimistic_mapping() {
        let mut map = IdMap::new();
        map.insert(EntityKind::Session, "local-1".into(), "local-1".into());
        map.insert(EntityKind::Session, "local-1".into(), "srv-2".into());

        assert_eq!(map.resolve(EntityKind::Session, &"local-1".into()), "srv-2".into());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut map = IdMap::new();
        map.insert(EntityKind::HealthEntry, "a".into(), "b".into());

        let json = serde_json::to_value(&map).unwrap();
        let back: IdMap = serde_json::from_value(json).unwrap();
        assert_eq!(back.resolve(EntityKind::HealthEntry, &"a".into()), "b".into());
    }
}
