//! # Components and the Registry
//!
//! A component is a named behavior attached to an entity. Its declaration is a
//! raw attribute string; the runtime turns it into a live instance with a
//! lifecycle:
//!
//! ```text
//! first declaration   construct → init → update → (tick registration)
//! re-declaration      update
//! every frame         tick            (only if wants_tick())
//! ```
//!
//! Instances are stored per entity by name in a [`ComponentSlot`]. While a
//! lifecycle method runs, the instance is taken out of its slot so that the
//! method can freely borrow the whole [`App`]; it is put back afterwards.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use super::entity::EntityId;
use crate::app::App;
use crate::error::Result;

/// Upcast helper so boxed components can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behavior attached to an entity under a name.
///
/// Every method has a no-op default, so a component implements only the
/// phases it cares about. `data` is the raw attribute string of the latest
/// declaration.
pub trait Component: AsAny {
    /// Runs once, on the first declaration, before the first `update`.
    fn init(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let _ = (app, entity, data);
        Ok(())
    }

    /// Runs on every declaration, including the first.
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let _ = (app, entity, data);
        Ok(())
    }

    /// Runs once per frame with the elapsed milliseconds, if
    /// [`wants_tick`](Self::wants_tick) returned `true` after the first update.
    fn tick(&mut self, app: &mut App, entity: EntityId, dt_ms: f32) -> Result<()> {
        let _ = (app, entity, dt_ms);
        Ok(())
    }

    /// Whether this component should be registered with the frame scheduler.
    fn wants_tick(&self) -> bool {
        false
    }
}

impl dyn Component {
    /// Downcast to the concrete component type.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Builds a fresh instance of a component.
pub type Constructor = Rc<dyn Fn() -> Box<dyn Component>>;

/// Component name → constructor.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`, built with `T::default()`.
    pub fn register<T: Component + Default>(&mut self, name: &str) -> &mut Self {
        self.register_with(name, || Box::new(T::default()))
    }

    /// Register a constructor under `name`. A later registration under the
    /// same name replaces the earlier one.
    pub fn register_with(
        &mut self,
        name: &str,
        constructor: impl Fn() -> Box<dyn Component> + 'static,
    ) -> &mut Self {
        if self
            .constructors
            .insert(name.to_string(), Rc::new(constructor))
            .is_some()
        {
            log::debug!("Component '{name}' re-registered; the previous constructor is replaced");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Constructor> {
        self.constructors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A component instance plus the last attribute string applied to it.
pub(crate) struct ComponentSlot {
    /// `None` while the instance is taken out to run a lifecycle method.
    instance: Option<Box<dyn Component>>,
    pub(crate) data: String,
}

impl ComponentSlot {
    /// A slot whose instance is currently running its first lifecycle calls.
    pub fn busy(data: &str) -> Self {
        Self {
            instance: None,
            data: data.to_string(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.instance.is_none()
    }

    pub fn take(&mut self) -> Option<Box<dyn Component>> {
        self.instance.take()
    }

    pub fn put(&mut self, instance: Box<dyn Component>) {
        self.instance = Some(instance);
    }

    pub fn instance_mut(&mut self) -> Option<&mut dyn Component> {
        self.instance.as_deref_mut()
    }
}

/// Split a declared attribute name into `(component, instance)`.
///
/// `animation__fade` → `("animation", Some("fade"))`.
pub fn split_name(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once("__") {
        Some((name, instance)) => (name, Some(instance)),
        None => (raw, None),
    }
}
