//! Per-entity event tables.
//!
//! Handlers are plain closures over `&mut App`. Emission is synchronous: every
//! handler registered at the moment of emission runs in registration order,
//! and the first `Err` stops the rest.

use std::collections::HashMap;
use std::rc::Rc;

use super::entity::EntityId;
use crate::app::App;
use crate::error::Result;
use crate::stage::NodeId;

/// Data passed along with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    /// Another entity, e.g. the child attached by `"child"`.
    Entity(EntityId),
    /// A drawable node, e.g. the other party of a collision.
    Node(NodeId),
    /// Free text, e.g. the resource URL of a `"load"`.
    Text(String),
}

impl Payload {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Payload::Entity(e) => Some(*e),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Payload::Node(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// An event handler. Receives the app, the entity the event was emitted on,
/// and the payload.
pub type Handler = Rc<dyn Fn(&mut App, EntityId, &Payload) -> Result<()>>;

/// Event name → handlers in registration order.
#[derive(Default, Clone)]
pub struct EventTable {
    handlers: HashMap<String, Vec<Handler>>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `event`.
    pub fn on(&mut self, event: &str, handler: Handler) {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Snapshot of the handlers for `event`. Cheap: clones `Rc`s.
    ///
    /// Emission works on the snapshot, so handlers registered while an event
    /// is being dispatched only see later emissions.
    pub fn handlers(&self, event: &str) -> Vec<Handler> {
        self.handlers.get(event).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (name, list) in &self.handlers {
            map.entry(name, &list.len());
        }
        map.finish()
    }
}
