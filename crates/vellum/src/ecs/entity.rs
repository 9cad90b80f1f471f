//! # Entity Handles
//!
//! An [`EntityId`] is just a number. The [`World`](super::world::World) maps it
//! to the entity's record (children, components, events, container node).
//!
//! ## Generational Indices
//!
//! Handles are captured by event handlers and tick entries, and those can
//! outlive the entity they point at:
//!
//! ```text
//! 1. Spawn entity #5, a sibling's "child" handler captures it
//! 2. Despawn entity #5
//! 3. Spawn a new entity, it gets recycled slot #5
//! 4. The handler fires with the captured handle: wrong entity!
//! ```
//!
//! Each slot carries a generation counter that is bumped on recycle, so the
//! stale handle still says `generation: 0` and lookups fail safely.
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← original
//! EntityId { index: 5, generation: 1 }  ← after recycle
//! ```

use std::fmt;

/// A lightweight handle to an entity in an [`App`](crate::app::App).
///
/// Only valid for the `App` that created it, and only while its generation
/// matches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl EntityId {
    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Manages entity slot allocation and recycling.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// free_list:   [1, 3]             ← slots available for reuse
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a handle, reusing a freed slot if one is available.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on deallocate.
            let generation = self.generations[index as usize];
            EntityId { index, generation }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            EntityId {
                index,
                generation: 0,
            }
        }
    }

    /// Free a slot. Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.generations[entity.index as usize] += 1;
        self.free_list.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&g| g == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }
}
