//! # Built-in Components
//!
//! Every component a scene can declare out of the box. [`register_builtins`]
//! adds them all to a registry; [`App::new`](crate::app::App::new) calls it.
//!
//! | name              | module        | ticks |
//! |-------------------|---------------|-------|
//! | `layout`          | [`layout`]    |       |
//! | `opacity`         | [`transform`] |       |
//! | `position`        | [`transform`] |       |
//! | `rotation`        | [`transform`] |       |
//! | `scale`           | [`transform`] |       |
//! | `position-object` | [`transform`] |       |
//! | `size`            | [`transform`] |       |
//! | `interactive`     | [`transform`] |       |
//! | `visible`         | [`transform`] |       |
//! | `rect`            | [`shapes`]    |       |
//! | `slice9`          | [`shapes`]    |       |
//! | `text`            | [`shapes`]    |       |
//! | `sprite`          | [`sprite`]    |       |
//! | `collider`        | [`collider`]  | yes   |
//! | `animation`       | [`animation`] | yes   |

pub mod animation;
pub mod collider;
pub mod layout;
pub mod shapes;
pub mod sprite;
pub mod transform;

use crate::attr::split_list;
use crate::ecs::ComponentRegistry;
use crate::error::{Result, SceneError};

pub use animation::{AnimatedProperty, Animation, Direction, EaseFunction, Repeat};
pub use collider::{Collider, ColliderGroups};
pub use layout::Layout;
pub use shapes::{Rect, Slice9, Text};
pub use sprite::Sprite;
pub use transform::{
    Interactive, Opacity, Position, PositionObject, Rotation, Scale, Size, Visible,
};

/// Register every built-in component.
pub fn register_builtins(registry: &mut ComponentRegistry) {
    registry
        .register::<Layout>("layout")
        .register::<Opacity>("opacity")
        .register::<Rect>("rect")
        .register::<Sprite>("sprite")
        .register::<Slice9>("slice9")
        .register::<Position>("position")
        .register::<Rotation>("rotation")
        .register::<Scale>("scale")
        .register::<PositionObject>("position-object")
        .register::<Size>("size")
        .register::<Interactive>("interactive")
        .register::<Text>("text")
        .register::<Visible>("visible")
        .register::<Collider>("collider")
        .register::<Animation>("animation");
}

/// The first two items of a positional list.
pub(crate) fn pair<'a>(component: &'static str, data: &'a str) -> Result<(&'a str, &'a str)> {
    match split_list(data).as_slice() {
        [a, b, ..] => Ok((*a, *b)),
        _ => Err(SceneError::invalid(component, data)),
    }
}
