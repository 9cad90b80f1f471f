//! # Entity-Component Runtime
//!
//! Entities here are scene-graph nodes, not archetype rows: each one owns an
//! ordered list of children, a set of named components, an event table, and a
//! container on the [`Stage`](crate::stage::Stage).
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational entity handles
//! - [`component`] — The `Component` trait, registry, and instance slots
//! - [`event`] — Per-entity event tables and payloads
//! - `world` — Entity record storage and the id index

pub mod component;
pub mod entity;
pub mod event;
pub(crate) mod world;

pub use component::{AsAny, Component, ComponentRegistry, Constructor};
pub use entity::EntityId;
pub use event::{EventTable, Handler, Payload};
