//! # Collision Detection
//!
//! `collider="group: enemies"` puts the entity's container into a named group
//! (default `"default"`). Every frame, each collider tests its container
//! against every other member of its group and reports transitions:
//!
//! ```text
//!            overlaps                  stops overlapping
//!   apart ─────────────► overlapping ─────────────────► apart
//!         "collisionstart"              "collisionend"
//! ```
//!
//! Both events carry the other container as [`Payload::Node`]. Nothing is
//! emitted while a pair stays in the same state. Each collider keeps its own
//! list of containers it is currently overlapping.
//!
//! The test box is the container's position plus its scaled content size,
//! and edges that merely touch do not overlap. Overlap is only detected, never
//! resolved.

use std::collections::HashMap;

use crate::app::App;
use crate::attr::Record;
use crate::ecs::{Component, EntityId, Payload};
use crate::error::Result;
use crate::stage::NodeId;

/// Group name → member containers in registration order.
#[derive(Debug, Default)]
pub struct ColliderGroups {
    groups: HashMap<String, Vec<NodeId>>,
}

impl ColliderGroups {
    /// Add `node` to `group`. Returns `false` if it was already there.
    pub fn insert(&mut self, group: &str, node: NodeId) -> bool {
        let members = self.groups.entry(group.to_string()).or_default();
        if members.contains(&node) {
            return false;
        }
        members.push(node);
        true
    }

    pub fn remove(&mut self, group: &str, node: NodeId) {
        if let Some(members) = self.groups.get_mut(group) {
            members.retain(|&n| n != node);
        }
    }

    /// Remove `node` from every group.
    pub fn remove_node(&mut self, node: NodeId) {
        for members in self.groups.values_mut() {
            members.retain(|&n| n != node);
        }
    }

    pub fn members(&self, group: &str) -> &[NodeId] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
pub struct Collider {
    group: Option<String>,
    colliding: Vec<NodeId>,
}

impl Collider {
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Containers this collider currently overlaps.
    pub fn colliding(&self) -> &[NodeId] {
        &self.colliding
    }
}

impl Component for Collider {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let record = Record::parse(data);
        let group = record.get_non_empty("group").unwrap_or("default").to_string();
        let container = app.container(entity)?;

        if let Some(previous) = self.group.as_deref()
            && previous != group
        {
            app.colliders_mut().remove(previous, container);
            self.colliding.clear();
        }
        app.colliders_mut().insert(&group, container);
        self.group = Some(group);
        Ok(())
    }

    fn tick(&mut self, app: &mut App, entity: EntityId, _dt_ms: f32) -> Result<()> {
        let Some(group) = self.group.as_deref() else {
            return Ok(());
        };
        let container = app.container(entity)?;
        let members = app.colliders().members(group).to_vec();

        // Despawned partners leave without an end event.
        self.colliding.retain(|&n| app.stage().contains(n));

        for target in members {
            if target == container {
                continue;
            }
            let stage = app.stage();
            let (Some(own), Some(other)) = (stage.collision_box(container), stage.collision_box(target))
            else {
                continue;
            };
            let overlapping = own.overlaps(&other);

            match (self.colliding.iter().position(|&n| n == target), overlapping) {
                (None, true) => {
                    self.colliding.push(target);
                    app.emit(entity, "collisionstart", Payload::Node(target))?;
                }
                (Some(index), false) => {
                    self.colliding.remove(index);
                    app.emit(entity, "collisionend", Payload::Node(target))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn wants_tick(&self) -> bool {
        true
    }
}
