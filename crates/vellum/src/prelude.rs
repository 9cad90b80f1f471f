//! Convenience re-exports. `use vellum::prelude::*` for the common items.

// Core
pub use crate::app::App;
pub use crate::config::RenderOptions;
pub use crate::ecs::{Component, ComponentRegistry, EntityId, Payload};
pub use crate::error::{AssetError, Result, SceneError};
pub use crate::math::{Aabb, Vec2};
pub use crate::render::{RenderBackend, RenderHandle, Surface, render, render_with};
pub use crate::time::Time;

// Display tree
pub use crate::stage::{Color, Node, NodeId, NodeKind, Stage, TextStyle, TextureRef};

// Resources
pub use crate::asset::{LoadState, MemorySource, Resource, ResourceSource};
#[cfg(feature = "file-assets")]
pub use crate::asset::FileSource;

// Built-in components
pub use crate::components::{
    AnimatedProperty, Animation, Collider, ColliderGroups, Direction, EaseFunction, Layout,
    Repeat, Sprite,
};
