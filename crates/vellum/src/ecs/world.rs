//! # World — Entity Storage
//!
//! The [`World`] owns every entity record and the id index used for external
//! lookup. It knows nothing about the stage or the scheduler; the
//! [`App`](crate::app::App) keeps those in sync.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ World                                            │
//! │                                                  │
//! │  allocator: EntityAllocator                      │
//! │  records:   Vec<Option<EntityRecord>>            │
//! │             indexed by EntityId::index           │
//! │  ids:       HashMap<String, EntityId>            │
//! │             declared `id` → entity               │
//! └──────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use super::component::ComponentSlot;
use super::entity::{EntityAllocator, EntityId};
use super::event::EventTable;
use crate::error::{Result, SceneError};
use crate::stage::NodeId;

/// Everything an entity owns.
pub(crate) struct EntityRecord {
    pub id: Option<String>,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    /// Component name → slot, in first-declaration order.
    pub components: Vec<(String, ComponentSlot)>,
    pub events: EventTable,
    pub container: NodeId,
    pub object: Option<NodeId>,
}

impl EntityRecord {
    pub fn slot(&self, name: &str) -> Option<&ComponentSlot> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut ComponentSlot> {
        self.components
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
    }
}

/// Entity storage plus the id index.
pub(crate) struct World {
    allocator: EntityAllocator,
    records: Vec<Option<EntityRecord>>,
    ids: HashMap<String, EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            records: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Create an entity around an existing container node.
    ///
    /// Fails without allocating if `id` is already taken.
    pub fn spawn(&mut self, id: Option<&str>, container: NodeId) -> Result<EntityId> {
        if let Some(id) = id
            && self.ids.contains_key(id)
        {
            return Err(SceneError::DuplicateId(id.to_string()));
        }

        let entity = self.allocator.allocate();
        let record = EntityRecord {
            id: id.map(str::to_string),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            events: EventTable::new(),
            container,
            object: None,
        };
        let index = entity.index as usize;
        if index >= self.records.len() {
            self.records.resize_with(index + 1, || None);
        }
        self.records[index] = Some(record);
        if let Some(id) = id {
            self.ids.insert(id.to_string(), entity);
        }
        Ok(entity)
    }

    /// Remove an entity's record. Links to parent and children are the
    /// caller's business.
    pub fn despawn(&mut self, entity: EntityId) -> Option<EntityRecord> {
        if !self.allocator.deallocate(entity) {
            return None;
        }
        let record = self.records.get_mut(entity.index as usize)?.take()?;
        if let Some(id) = &record.id {
            self.ids.remove(id);
        }
        Some(record)
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&EntityRecord> {
        if !self.is_alive(entity) {
            return None;
        }
        self.records.get(entity.index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecord> {
        if !self.is_alive(entity) {
            return None;
        }
        self.records.get_mut(entity.index as usize)?.as_mut()
    }

    /// Like [`get`](Self::get) but as a `Result`.
    pub fn record(&self, entity: EntityId) -> Result<&EntityRecord> {
        self.get(entity).ok_or(SceneError::DeadEntity(entity))
    }

    pub fn record_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord> {
        self.get_mut(entity).ok_or(SceneError::DeadEntity(entity))
    }

    /// Look up an entity by declared id.
    pub fn find(&self, id: &str) -> Option<EntityId> {
        self.ids.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.allocator.alive_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{NodeKind, Stage};

    fn node(stage: &mut Stage) -> NodeId {
        stage.create(NodeKind::Container)
    }

    #[test]
    fn spawn_registers_id() {
        let mut stage = Stage::new();
        let mut world = World::new();
        let hero = world.spawn(Some("hero"), node(&mut stage)).unwrap();
        let anon = world.spawn(None, node(&mut stage)).unwrap();

        assert_eq!(world.find("hero"), Some(hero));
        assert_eq!(world.get(anon).unwrap().id, None);
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut stage = Stage::new();
        let mut world = World::new();
        world.spawn(Some("hero"), node(&mut stage)).unwrap();
        let err = world.spawn(Some("hero"), node(&mut stage)).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateId(id) if id == "hero"));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn despawn_frees_id_and_invalidates_handle() {
        let mut stage = Stage::new();
        let mut world = World::new();
        let hero = world.spawn(Some("hero"), node(&mut stage)).unwrap();
        assert!(world.despawn(hero).is_some());

        assert!(!world.is_alive(hero));
        assert!(world.get(hero).is_none());
        assert!(matches!(world.record(hero), Err(SceneError::DeadEntity(_))));
        assert_eq!(world.find("hero"), None);
        assert!(world.despawn(hero).is_none());

        let again = world.spawn(Some("hero"), node(&mut stage)).unwrap();
        assert_eq!(again.index(), hero.index());
        assert_ne!(again, hero);
    }
}
