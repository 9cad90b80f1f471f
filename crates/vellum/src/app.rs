//! # App — the Per-Scene Context
//!
//! The [`App`] owns everything a scene needs: entity storage, the drawable
//! [`Stage`], the component registry, the frame scheduler, the resource
//! loader, collider groups, the declared asset table, and the viewport used by
//! attribute expressions. There are no process-wide singletons; two apps in
//! one process share nothing.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ App                                                      │
//! │                                                          │
//! │  world ─────── entity records + id index                 │
//! │  stage ─────── drawable tree (one container per entity)  │
//! │  registry ──── component name → constructor              │
//! │  scheduler ─── (entity, component) tick entries          │
//! │  loader ────── resource cache / pending / waiters        │
//! │  colliders ─── group name → tracked container nodes      │
//! │  assets ────── declared `#id` → resource URL             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Borrowing
//!
//! Lifecycle methods and event handlers get `&mut App`. To make that possible
//! the runtime uses the extract/reinsert pattern: a component instance is
//! taken out of its slot while it runs and put back afterwards, and event
//! handler lists are cloned (`Rc`) before dispatch. A component applied again
//! while it is already running is skipped with a warning.

use std::collections::HashMap;
use std::rc::Rc;

use crate::asset::{MemorySource, ResourceLoader, ResourceSource};
use crate::components::{self, collider::ColliderGroups};
use crate::ecs::component::{ComponentSlot, split_name};
use crate::ecs::world::World;
use crate::ecs::{Component, ComponentRegistry, EntityId, Payload};
use crate::error::{Result, SceneError};
use crate::expr::Viewport;
use crate::math::Vec2;
use crate::scheduler::{self, FrameScheduler};
use crate::stage::{Node, NodeId, NodeKind, Stage};

/// The runtime context of one scene.
pub struct App {
    pub(crate) world: World,
    stage: Stage,
    registry: ComponentRegistry,
    pub(crate) scheduler: FrameScheduler,
    loader: ResourceLoader,
    colliders: ColliderGroups,
    assets: HashMap<String, String>,
    viewport: Viewport,
}

impl App {
    /// An app with the built-in components and an empty in-memory resource
    /// source.
    pub fn new() -> Self {
        Self::with_source(Box::new(MemorySource::new()))
    }

    /// An app with the built-in components loading resources from `source`.
    pub fn with_source(source: Box<dyn ResourceSource>) -> Self {
        let mut registry = ComponentRegistry::new();
        components::register_builtins(&mut registry);
        Self {
            world: World::new(),
            stage: Stage::new(),
            registry,
            scheduler: FrameScheduler::new(),
            loader: ResourceLoader::new(source),
            colliders: ColliderGroups::default(),
            assets: HashMap::new(),
            viewport: Viewport::new(
                crate::config::DEFAULT_SCENE_WIDTH,
                crate::config::DEFAULT_SCENE_HEIGHT,
            ),
        }
    }

    // ── Context ──────────────────────────────────────────────────────

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Register `T` under `name`. Shorthand for `registry_mut().register`.
    pub fn register<T: Component + Default>(&mut self, name: &str) -> &mut Self {
        self.registry.register::<T>(name);
        self
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut ResourceLoader {
        &mut self.loader
    }

    pub fn colliders(&self) -> &ColliderGroups {
        &self.colliders
    }

    pub fn colliders_mut(&mut self) -> &mut ColliderGroups {
        &mut self.colliders
    }

    /// Size of the scene, as seen by `appWidth`/`appHeight`.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Declare a preloaded resource reachable as `#id`.
    pub fn declare_asset(&mut self, id: &str, src: &str) {
        self.assets.insert(id.to_string(), src.to_string());
    }

    /// The URL declared for `#id`.
    pub fn asset(&self, id: &str) -> Option<&str> {
        self.assets.get(id).map(String::as_str)
    }

    /// Resolve a resource reference: `#id` goes through the asset table,
    /// anything else is already a URL.
    pub fn resolve_src(&self, value: &str) -> Result<String> {
        match value.strip_prefix('#') {
            Some(id) => match self.asset(id) {
                Some(src) => Ok(src.to_string()),
                None => {
                    log::warn!("Reference '{value}' does not match any declared asset");
                    Err(SceneError::UnknownAsset(id.to_string()))
                }
            },
            None => Ok(value.to_string()),
        }
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create a detached entity with a fresh container. `id` must be unique
    /// within the app.
    pub fn spawn(&mut self, id: Option<&str>) -> Result<EntityId> {
        let container = self.stage.create(NodeKind::Container);
        match self.world.spawn(id, container) {
            Ok(entity) => {
                if let Some(node) = self.stage.get_mut(container) {
                    node.owner = Some(entity);
                }
                Ok(entity)
            }
            Err(e) => {
                self.stage.destroy(container);
                Err(e)
            }
        }
    }

    /// Destroy an entity and its whole subtree: records, tick entries,
    /// collider registrations, and drawables.
    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        self.remove(entity)?;
        let container = self.world.record(entity)?.container;

        let mut pending = vec![entity];
        while let Some(current) = pending.pop() {
            let Some(record) = self.world.despawn(current) else {
                continue;
            };
            pending.extend(record.children.iter().copied());
            self.scheduler.remove_entity(current);
            self.colliders.remove_node(record.container);
        }
        self.stage.destroy(container);
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.world.is_alive(entity)
    }

    /// Look up an entity by its declared id.
    pub fn find(&self, id: &str) -> Option<EntityId> {
        self.world.find(id)
    }

    /// The declared id of an entity.
    pub fn entity_id(&self, entity: EntityId) -> Option<&str> {
        self.world.get(entity)?.id.as_deref()
    }

    pub fn entity_count(&self) -> usize {
        self.world.len()
    }

    pub fn parent(&self, entity: EntityId) -> Option<EntityId> {
        self.world.get(entity)?.parent
    }

    /// Children in attachment order. Empty for a dead entity.
    pub fn children(&self, entity: EntityId) -> &[EntityId] {
        self.world
            .get(entity)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
    }

    /// Attach `child` as the last child of `parent`, moving it from any
    /// previous parent, then emit `"child"` on `parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<()> {
        let parent_container = self.world.record(parent)?.container;
        let child_container = self.world.record(child)?.container;

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::InvalidParent { parent, child });
            }
            ancestor = self.parent(current);
        }

        self.remove(child)?;
        self.world.record_mut(parent)?.children.push(child);
        self.world.record_mut(child)?.parent = Some(parent);
        self.stage.add_child(parent_container, child_container);

        self.emit(parent, "child", Payload::Entity(child))
    }

    /// Detach `child` from `parent`. Returns `false` if it wasn't a child.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> Result<bool> {
        let record = self.world.record_mut(parent)?;
        let Some(index) = record.children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        record.children.remove(index);
        let parent_container = record.container;

        let child_record = self.world.record_mut(child)?;
        child_record.parent = None;
        let child_container = child_record.container;
        self.stage.remove_child(parent_container, child_container);
        Ok(true)
    }

    /// Detach an entity from its parent, if it has one. The entity stays
    /// alive and keeps ticking.
    pub fn remove(&mut self, entity: EntityId) -> Result<()> {
        if let Some(parent) = self.world.record(entity)?.parent {
            self.remove_child(parent, entity)?;
        }
        Ok(())
    }

    // ── Drawables ────────────────────────────────────────────────────

    /// The entity's container node.
    pub fn container(&self, entity: EntityId) -> Result<NodeId> {
        Ok(self.world.record(entity)?.container)
    }

    /// The entity's payload node, if one is set.
    pub fn object(&self, entity: EntityId) -> Option<NodeId> {
        self.world.get(entity)?.object
    }

    pub fn container_node(&self, entity: EntityId) -> Option<&Node> {
        self.stage.get(self.world.get(entity)?.container)
    }

    pub fn container_node_mut(&mut self, entity: EntityId) -> Result<&mut Node> {
        let container = self.container(entity)?;
        self.stage
            .get_mut(container)
            .ok_or(SceneError::DeadEntity(entity))
    }

    pub fn object_node(&self, entity: EntityId) -> Option<&Node> {
        self.stage.get(self.object(entity)?)
    }

    pub fn object_node_mut(&mut self, entity: EntityId) -> Option<&mut Node> {
        let object = self.object(entity)?;
        self.stage.get_mut(object)
    }

    /// Make `node` the entity's payload, replacing (and destroying) the
    /// previous one, then emit `"objectset"`.
    pub fn set_object(&mut self, entity: EntityId, node: NodeId) -> Result<()> {
        let record = self.world.record_mut(entity)?;
        let container = record.container;
        let previous = record.object.replace(node);
        if let Some(previous) = previous
            && previous != node
        {
            self.stage.destroy(previous);
        }
        self.stage.add_child(container, node);
        self.emit(entity, "objectset", Payload::Node(node))
    }

    /// Create a node of `kind` and make it the entity's payload.
    pub fn create_object(&mut self, entity: EntityId, kind: NodeKind) -> Result<NodeId> {
        let node = self.stage.create(kind);
        self.set_object(entity, node)?;
        Ok(node)
    }

    // ── Components ───────────────────────────────────────────────────

    /// Apply a component declaration.
    ///
    /// `raw_name` may carry an instance suffix (`animation__fade`); only the
    /// part before `__` selects the component. Unregistered names are ignored.
    /// The first declaration constructs the instance and runs `init` then
    /// `update`; later ones run `update` only.
    pub fn set_component(&mut self, entity: EntityId, raw_name: &str, data: &str) -> Result<()> {
        let (name, _instance) = split_name(raw_name);
        let record = self.world.record_mut(entity)?;
        match record.slot_mut(name) {
            Some(slot) => {
                let Some(mut instance) = slot.take() else {
                    log::warn!("Component '{name}' on {entity} applied while running; skipped");
                    return Ok(());
                };
                slot.data = data.to_string();
                let result = instance.update(self, entity, data);
                self.restore(entity, name, instance);
                result
            }
            None => self.create_component(entity, name, data),
        }
    }

    fn create_component(&mut self, entity: EntityId, name: &str, data: &str) -> Result<()> {
        let Some(constructor) = self.registry.get(name) else {
            log::debug!("No component registered as '{name}'; ignored");
            return Ok(());
        };
        let mut instance = constructor();
        self.world
            .record_mut(entity)?
            .components
            .push((name.to_string(), ComponentSlot::busy(data)));

        let mut result = instance.init(self, entity, data);
        if result.is_ok() {
            result = instance.update(self, entity, data);
        }
        let ticks = instance.wants_tick();
        let restored = self.restore(entity, name, instance);
        result?;

        if ticks && restored {
            self.scheduler.add(entity, name);
        }
        Ok(())
    }

    /// Put an instance back in its slot. Returns `false` if the entity or slot
    /// went away while it was out.
    fn restore(&mut self, entity: EntityId, name: &str, instance: Box<dyn Component>) -> bool {
        match self.world.get_mut(entity).and_then(|r| r.slot_mut(name)) {
            Some(slot) => {
                slot.put(instance);
                true
            }
            None => false,
        }
    }

    /// Run `update` again with the last applied data.
    pub fn reapply(&mut self, entity: EntityId, name: &str) -> Result<()> {
        let Some(slot) = self.world.get_mut(entity).and_then(|r| r.slot_mut(name)) else {
            return Ok(());
        };
        let Some(mut instance) = slot.take() else {
            log::warn!("Component '{name}' on {entity} re-applied while running; skipped");
            return Ok(());
        };
        let data = slot.data.clone();
        let result = instance.update(self, entity, &data);
        self.restore(entity, name, instance);
        result
    }

    pub(crate) fn tick_component(&mut self, entity: EntityId, name: &str, dt_ms: f32) -> Result<()> {
        let Some(mut instance) = self
            .world
            .get_mut(entity)
            .and_then(|r| r.slot_mut(name))
            .and_then(ComponentSlot::take)
        else {
            return Ok(());
        };
        let result = instance.tick(self, entity, dt_ms);
        self.restore(entity, name, instance);
        result
    }

    /// Borrow a component instance as its concrete type, together with the
    /// app. Returns `None` if the entity has no such component, it is of
    /// another type, or it is currently running.
    pub fn with_component<T: Component, R>(
        &mut self,
        entity: EntityId,
        name: &str,
        f: impl FnOnce(&mut T, &mut App) -> R,
    ) -> Option<R> {
        let mut instance = self.world.get_mut(entity)?.slot_mut(name)?.take()?;
        let result = instance.downcast_mut::<T>().map(|typed| f(typed, self));
        self.restore(entity, name, instance);
        result
    }

    pub fn has_component(&self, entity: EntityId, name: &str) -> bool {
        self.world
            .get(entity)
            .is_some_and(|r| r.slot(name).is_some())
    }

    /// The last data applied to a component.
    pub fn component_data(&self, entity: EntityId, name: &str) -> Option<&str> {
        Some(self.world.get(entity)?.slot(name)?.data.as_str())
    }

    /// Component names in first-declaration order.
    pub fn component_names(&self, entity: EntityId) -> Vec<&str> {
        self.world
            .get(entity)
            .map(|r| r.components.iter().map(|(n, _)| n.as_str()).collect())
            .unwrap_or_default()
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Append a handler for `event` on `entity`.
    pub fn on(
        &mut self,
        entity: EntityId,
        event: &str,
        handler: impl Fn(&mut App, EntityId, &Payload) -> Result<()> + 'static,
    ) -> Result<()> {
        self.world
            .record_mut(entity)?
            .events
            .on(event, Rc::new(handler));
        Ok(())
    }

    /// Call every handler registered for `event` on `entity`, in order. The
    /// first `Err` stops dispatch and is returned. Emitting on a dead entity
    /// does nothing.
    pub fn emit(&mut self, entity: EntityId, event: &str, payload: Payload) -> Result<()> {
        let Some(record) = self.world.get(entity) else {
            return Ok(());
        };
        for handler in record.events.handlers(event) {
            handler(self, entity, &payload)?;
        }
        Ok(())
    }

    // ── Pointer ──────────────────────────────────────────────────────

    /// Emit `"mousedown"` on the entity owning the topmost interactive
    /// container under `point` (stage coordinates).
    pub fn pointer_down(&mut self, point: Vec2) -> Result<Option<EntityId>> {
        self.pointer("mousedown", point)
    }

    /// Emit `"mouseup"`, as [`pointer_down`](Self::pointer_down).
    pub fn pointer_up(&mut self, point: Vec2) -> Result<Option<EntityId>> {
        self.pointer("mouseup", point)
    }

    fn pointer(&mut self, event: &str, point: Vec2) -> Result<Option<EntityId>> {
        let mut current = self.stage.hit_test(point);
        let owner = loop {
            let Some(node) = current.and_then(|id| self.stage.get(id)) else {
                return Ok(None);
            };
            if let Some(owner) = node.owner {
                break owner;
            }
            current = node.parent();
        };
        self.emit(owner, event, Payload::None)?;
        Ok(Some(owner))
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Advance one frame: deliver finished loads as `"load"` events, then
    /// tick every registered component.
    pub fn update(&mut self, dt_ms: f32) -> Result<()> {
        self.deliver_loads()?;
        scheduler::run_frame(self, dt_ms)
    }

    pub(crate) fn deliver_loads(&mut self) -> Result<()> {
        for (src, waiters) in self.loader.poll() {
            for entity in waiters {
                self.emit(entity, "load", Payload::Text(src.clone()))?;
            }
        }
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    #[derive(Default)]
    struct Counter {
        inits: u32,
        updates: Vec<String>,
        ticks: u32,
    }

    impl Component for Counter {
        fn init(&mut self, _: &mut App, _: EntityId, _: &str) -> Result<()> {
            self.inits += 1;
            Ok(())
        }

        fn update(&mut self, _: &mut App, _: EntityId, data: &str) -> Result<()> {
            self.updates.push(data.to_string());
            Ok(())
        }

        fn tick(&mut self, _: &mut App, _: EntityId, _: f32) -> Result<()> {
            self.ticks += 1;
            Ok(())
        }

        fn wants_tick(&self) -> bool {
            true
        }
    }

    fn counts(app: &mut App, entity: EntityId) -> (u32, Vec<String>, u32) {
        app.with_component::<Counter, _>(entity, "counter", |p, _| {
            (p.inits, p.updates.clone(), p.ticks)
        })
        .unwrap()
    }

    #[test]
    fn reapplying_updates_without_reinit() {
        let mut app = App::new();
        app.register::<Counter>("counter");
        let e = app.spawn(None).unwrap();

        app.set_component(e, "counter", "a").unwrap();
        app.set_component(e, "counter", "b").unwrap();

        let (inits, updates, _) = counts(&mut app, e);
        assert_eq!(inits, 1);
        assert_eq!(updates, vec!["a", "b"]);
        assert_eq!(app.component_data(e, "counter"), Some("b"));
        assert_eq!(app.scheduler().len(), 1);
    }

    #[test]
    fn instance_suffix_shares_the_component() {
        let mut app = App::new();
        app.register::<Counter>("counter");
        let e = app.spawn(None).unwrap();

        app.set_component(e, "counter__one", "1").unwrap();
        app.set_component(e, "counter__two", "2").unwrap();

        assert_eq!(app.component_names(e), vec!["counter"]);
        let (inits, updates, _) = counts(&mut app, e);
        assert_eq!((inits, updates.len()), (1, 2));
    }

    #[test]
    fn unknown_component_is_ignored() {
        let mut app = App::new();
        let e = app.spawn(None).unwrap();
        app.set_component(e, "no-such-thing", "1").unwrap();
        assert!(!app.has_component(e, "no-such-thing"));
    }

    #[test]
    fn tick_runs_each_frame() {
        let mut app = App::new();
        app.register::<Counter>("counter");
        let e = app.spawn(None).unwrap();
        app.set_component(e, "counter", "").unwrap();

        app.update(16.0).unwrap();
        app.update(16.0).unwrap();
        assert_eq!(counts(&mut app, e).2, 2);
    }

    #[test]
    fn despawn_drops_ticks_and_subtree() {
        let mut app = App::new();
        app.register::<Counter>("counter");
        let root = app.spawn(Some("root")).unwrap();
        let child = app.spawn(Some("child")).unwrap();
        app.add_child(root, child).unwrap();
        app.set_component(child, "counter", "").unwrap();
        let container = app.container(child).unwrap();

        app.despawn(root).unwrap();
        assert!(!app.is_alive(child));
        assert_eq!(app.find("child"), None);
        assert!(app.scheduler().is_empty());
        assert!(!app.stage().contains(container));
        app.update(16.0).unwrap();
    }

    #[test]
    fn detached_entity_keeps_ticking() {
        let mut app = App::new();
        app.register::<Counter>("counter");
        let parent = app.spawn(None).unwrap();
        let child = app.spawn(None).unwrap();
        app.add_child(parent, child).unwrap();
        app.set_component(child, "counter", "").unwrap();

        app.remove(child).unwrap();
        assert_eq!(app.parent(child), None);
        assert!(app.children(parent).is_empty());
        let child_container = app.container(child).unwrap();
        assert_eq!(app.stage().parent(child_container), None);

        app.update(16.0).unwrap();
        assert_eq!(counts(&mut app, child).2, 1);
    }

    #[test]
    fn add_child_links_and_emits_on_parent() {
        let mut app = App::new();
        let parent = app.spawn(None).unwrap();
        let child = app.spawn(None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        app.on(parent, "child", move |_, target, payload| {
            log.borrow_mut().push((target, payload.entity()));
            Ok(())
        })
        .unwrap();

        app.add_child(parent, child).unwrap();
        assert_eq!(app.children(parent), &[child]);
        assert_eq!(app.parent(child), Some(parent));
        assert_eq!(
            app.stage().parent(app.container(child).unwrap()),
            Some(app.container(parent).unwrap())
        );
        assert_eq!(*seen.borrow(), vec![(parent, Some(child))]);
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut app = App::new();
        let a = app.spawn(None).unwrap();
        let b = app.spawn(None).unwrap();
        app.add_child(a, b).unwrap();
        assert!(matches!(
            app.add_child(b, a),
            Err(SceneError::InvalidParent { .. })
        ));
        assert!(app.add_child(a, a).is_err());
    }

    #[test]
    fn handler_error_stops_dispatch() {
        let mut app = App::new();
        let e = app.spawn(None).unwrap();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        app.on(e, "go", |_, _, _| Err(SceneError::NoScene)).unwrap();
        app.on(e, "go", move |_, _, _| {
            c.set(c.get() + 1);
            Ok(())
        })
        .unwrap();

        assert!(app.emit(e, "go", Payload::None).is_err());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn set_object_replaces_previous() {
        let mut app = App::new();
        let e = app.spawn(None).unwrap();
        let first = app.create_object(e, NodeKind::Container).unwrap();
        let second = app.create_object(e, NodeKind::Container).unwrap();

        let container = app.container(e).unwrap();
        assert_eq!(app.object(e), Some(second));
        assert!(!app.stage().contains(first));
        assert_eq!(app.stage().children(container), &[second]);
    }

    #[test]
    fn resolve_src_uses_asset_table() {
        let mut app = App::new();
        app.declare_asset("hero", "images/hero.png");
        assert_eq!(app.resolve_src("#hero").unwrap(), "images/hero.png");
        assert_eq!(app.resolve_src("plain.png").unwrap(), "plain.png");
        assert!(matches!(
            app.resolve_src("#villain"),
            Err(SceneError::UnknownAsset(id)) if id == "villain"
        ));
    }

    #[test]
    fn pointer_hits_interactive_owner() {
        let mut app = App::new();
        let root = app.stage().root();
        let e = app.spawn(None).unwrap();
        let container = app.container(e).unwrap();
        app.stage_mut().add_child(root, container);
        app.create_object(
            e,
            NodeKind::Rect {
                size: Vec2::new(10.0, 10.0),
                color: crate::stage::Color::WHITE,
            },
        )
        .unwrap();
        app.container_node_mut(e).unwrap().interactive = true;

        let downs = Rc::new(Cell::new(0));
        let d = downs.clone();
        app.on(e, "mousedown", move |_, _, _| {
            d.set(d.get() + 1);
            Ok(())
        })
        .unwrap();

        assert_eq!(app.pointer_down(Vec2::new(5.0, 5.0)).unwrap(), Some(e));
        assert_eq!(app.pointer_down(Vec2::new(50.0, 5.0)).unwrap(), None);
        assert_eq!(downs.get(), 1);
    }
}
