//! `layout`: linear spacing of children.
//!
//! `layout="dx dy"` places child *i* at `(i * dx, i * dy)` inside the parent's
//! container. The layout re-runs whenever a child is attached.

use crate::app::App;
use crate::attr::parse_floats;
use crate::ecs::{Component, EntityId};
use crate::error::Result;
use crate::math::Vec2;

#[derive(Debug, Default)]
pub struct Layout;

impl Component for Layout {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        app.on(entity, "child", |app, entity, _| app.reapply(entity, "layout"))
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let spacing = parse_floats(data);
        let axis = |i: usize| {
            spacing
                .get(i)
                .copied()
                .filter(|v| !v.is_nan())
                .unwrap_or(0.0)
        };
        let step = Vec2::new(axis(0), axis(1));

        let children = app.children(entity).to_vec();
        for (i, child) in children.into_iter().enumerate() {
            app.container_node_mut(child)?.position = step * i as f32;
        }
        Ok(())
    }
}
