//! Components that only touch an entity's container (or its object's
//! placement): `opacity`, `position`, `rotation`, `scale`, `position-object`,
//! `size`, `interactive`, `visible`.
//!
//! `scale`, `position-object`, and `size` are relative to the entity's object,
//! so they do nothing until one is set and re-run on every `"objectset"`.

use crate::app::App;
use crate::attr::{parse_flag, parse_number};
use crate::ecs::{Component, EntityId};
use crate::error::{Result, SceneError};
use crate::expr;
use crate::math::Vec2;

use super::pair;

/// Re-run the named component whenever the entity's object changes.
fn follow_object(app: &mut App, entity: EntityId, component: &'static str) -> Result<()> {
    app.on(entity, "objectset", move |app, entity, _| {
        app.reapply(entity, component)
    })
}

/// Evaluate a two-item list of expressions.
fn eval_pair(app: &App, component: &'static str, data: &str) -> Result<Vec2> {
    let (x, y) = pair(component, data)?;
    let viewport = app.viewport();
    Ok(Vec2::new(
        expr::eval(x, &viewport)?,
        expr::eval(y, &viewport)?,
    ))
}

fn number(component: &'static str, data: &str) -> Result<f32> {
    parse_number(data).ok_or_else(|| SceneError::invalid(component, data))
}

/// `opacity="0.5"`: container alpha.
#[derive(Debug, Default)]
pub struct Opacity;

impl Component for Opacity {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let alpha = number("opacity", data)?;
        app.container_node_mut(entity)?.alpha = alpha;
        Ok(())
    }
}

/// `position="appWidth/2 100"`: container position, with expressions.
#[derive(Debug, Default)]
pub struct Position;

impl Component for Position {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let position = eval_pair(app, "position", data)?;
        app.container_node_mut(entity)?.position = position;
        Ok(())
    }
}

/// `rotation="45"`: container rotation in degrees.
#[derive(Debug, Default)]
pub struct Rotation;

impl Component for Rotation {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let degrees = number("rotation", data)?;
        app.container_node_mut(entity)?.rotation = degrees.to_radians();
        Ok(())
    }
}

/// `scale="2 2"`: sizes the container to the object's size times the factors.
#[derive(Debug, Default)]
pub struct Scale;

impl Component for Scale {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        follow_object(app, entity, "scale")
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let Some(object) = app.object(entity) else {
            return Ok(());
        };
        let (sx, sy) = pair("scale", data)?;
        let factor = Vec2::new(number("scale", sx)?, number("scale", sy)?);

        let container = app.container(entity)?;
        let stage = app.stage_mut();
        let size = Vec2::new(stage.width(object), stage.height(object));
        stage.set_height(container, size.y * factor.y);
        stage.set_width(container, size.x * factor.x);
        Ok(())
    }
}

/// `position-object="10 -5"`: offsets the object inside the container.
#[derive(Debug, Default)]
pub struct PositionObject;

impl Component for PositionObject {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        follow_object(app, entity, "position-object")
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        if app.object(entity).is_none() {
            return Ok(());
        }
        let position = eval_pair(app, "position-object", data)?;
        if let Some(object) = app.object_node_mut(entity) {
            object.position = position;
        }
        Ok(())
    }
}

/// `size="appWidth 300"`: shrinks the container so the object fits inside the
/// box, keeping its aspect ratio. Never enlarges.
#[derive(Debug, Default)]
pub struct Size;

impl Component for Size {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        follow_object(app, entity, "size")
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let Some(object) = app.object(entity) else {
            return Ok(());
        };
        let bounds = eval_pair(app, "size", data)?;

        let container = app.container(entity)?;
        let stage = app.stage_mut();
        let size = Vec2::new(stage.width(object), stage.height(object));
        let ratio = (bounds.y / size.y).min(bounds.x / size.x);
        // A zero-sized object yields NaN.
        if ratio >= 1.0 || ratio.is_nan() {
            return Ok(());
        }
        stage.set_height(container, size.y * ratio);
        stage.set_width(container, size.x * ratio);
        Ok(())
    }
}

/// `interactive`: makes the container a pointer target.
#[derive(Debug, Default)]
pub struct Interactive;

impl Component for Interactive {
    fn update(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        let container = app.container_node_mut(entity)?;
        container.interactive = true;
        container.cursor = Some("pointer".to_string());
        Ok(())
    }
}

/// `visible="false"`: hides the container. Anything else shows it.
#[derive(Debug, Default)]
pub struct Visible;

impl Component for Visible {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        app.container_node_mut(entity)?.visible = parse_flag(data);
        Ok(())
    }
}
