//! # Vellum — Declarative 2D Scenes
//!
//! Scenes are written as markup. Every element becomes an entity, every
//! attribute a component declaration, and the runtime keeps a retained
//! display tree (the [`Stage`](stage::Stage)) up to date for whatever backend
//! draws it.
//!
//! ```text
//! <scene>                                   App
//!   <asset id="hero" src="hero.png"/>        ├── ResourceLoader   (preloads)
//!   <entity id="player"                      ├── World            (entities)
//!           sprite="src: #hero"      ──►     ├── Stage            (display nodes)
//!           collider="players"               ├── FrameScheduler   (ticking components)
//!           position="appWidth/2 0"/>        └── ColliderGroups
//! </scene>
//! ```
//!
//! Start with [`render`] and drive frames with
//! [`RenderHandle::step`](render::RenderHandle::step), or build an [`App`]
//! directly. `use vellum::prelude::*` brings in the common items.

pub mod app;
pub mod asset;
pub mod attr;
pub mod components;
pub mod config;
pub mod ecs;
pub mod error;
pub mod expr;
pub mod markup;
pub mod math;
pub mod prelude;
pub mod render;
pub mod scene_builder;
pub mod scheduler;
pub mod stage;
pub mod time;

pub use app::App;
pub use config::RenderOptions;
pub use error::{AssetError, Result, SceneError};
pub use render::{RenderHandle, render, render_with};
