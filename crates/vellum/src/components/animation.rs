//! # Animation — Property Tweening
//!
//! `animation` interpolates one numeric property of an entity over time:
//!
//! ```text
//! animation="property: container.alpha; from: 0; to: 1; dur: 500;
//!            easing: easeOutQuad; dir: alternate; loop: true; autoplay: true"
//! ```
//!
//! | key           | meaning                                                |
//! |---------------|--------------------------------------------------------|
//! | `property`    | an [`AnimatedProperty`] path (required)                |
//! | `from`        | start value; empty or absent means "current value"     |
//! | `to`          | end value (required)                                   |
//! | `dur`         | duration of one iteration in ms (default 1000)         |
//! | `easing`      | [`EaseFunction`] name (default `linear`)               |
//! | `dir`         | [`Direction`]: `normal`, `reverse`, `alternate`        |
//! | `loop`        | [`Repeat`]: `true` forever, a number of iterations     |
//! | `autoplay`    | `true` starts playing immediately                      |
//! | `startEvents` | event names (space/comma separated) that (re)start it  |
//!
//! Rotation properties take degrees. The animation only advances while it is
//! playing, and writes the property only when the value actually changed, so
//! other components can still set the property between animations.
//!
//! Several `animation__name` attributes on one entity share a single instance;
//! the last declaration wins.

use std::f32::consts::{FRAC_PI_2, PI};

use crate::app::App;
use crate::attr::{Record, parse_number, split_list};
use crate::ecs::{Component, EntityId};
use crate::error::{Result, SceneError};

/// Standard easing curves.
///
/// Each variant maps `t` in \[0, 1\] to an eased value in roughly \[0, 1\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EaseFunction {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
}

impl EaseFunction {
    /// Parse an easing name as written in markup (`easeInOutCubic`).
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "linear" => Self::Linear,
            "easeInQuad" => Self::QuadIn,
            "easeOutQuad" => Self::QuadOut,
            "easeInOutQuad" => Self::QuadInOut,
            "easeInCubic" => Self::CubicIn,
            "easeOutCubic" => Self::CubicOut,
            "easeInOutCubic" => Self::CubicInOut,
            "easeInSine" => Self::SineIn,
            "easeOutSine" => Self::SineOut,
            "easeInOutSine" => Self::SineInOut,
            _ => return None,
        })
    }

    /// Evaluate the easing function at `t` (clamped to \[0, 1\]).
    pub fn sample(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Self::SineOut => (t * FRAC_PI_2).sin(),
            Self::SineInOut => -(PI * t).cos() / 2.0 + 0.5,
        }
    }
}

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Normal,
    Reverse,
    /// Every other iteration runs backwards.
    Alternate,
}

impl Direction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(Self::Normal),
            "reverse" => Some(Self::Reverse),
            "alternate" => Some(Self::Alternate),
            _ => None,
        }
    }

    fn backwards(self, iteration: u32) -> bool {
        match self {
            Self::Normal => false,
            Self::Reverse => true,
            Self::Alternate => iteration % 2 == 1,
        }
    }
}

/// How many iterations to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl Default for Repeat {
    fn default() -> Self {
        Self::Times(1)
    }
}

impl Repeat {
    /// `true` loops forever; a positive number plays that many iterations;
    /// anything else (absent, empty, `false`) plays once.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("true") => Self::Forever,
            Some(v) => match parse_number(v) {
                Some(n) if n >= 1.0 => Self::Times(n as u32),
                _ => Self::Times(1),
            },
            None => Self::Times(1),
        }
    }
}

/// A property the animation can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatedProperty {
    ContainerX,
    ContainerY,
    ContainerAlpha,
    /// Degrees.
    ContainerRotation,
    ContainerScaleX,
    ContainerScaleY,
    ContainerWidth,
    ContainerHeight,
    ObjectX,
    ObjectY,
    ObjectAlpha,
    /// Degrees.
    ObjectRotation,
}

impl AnimatedProperty {
    pub fn parse(path: &str) -> Option<Self> {
        Some(match path {
            "container.x" | "container.position.x" => Self::ContainerX,
            "container.y" | "container.position.y" => Self::ContainerY,
            "container.alpha" => Self::ContainerAlpha,
            "container.rotation" => Self::ContainerRotation,
            "container.scale.x" => Self::ContainerScaleX,
            "container.scale.y" => Self::ContainerScaleY,
            "container.width" => Self::ContainerWidth,
            "container.height" => Self::ContainerHeight,
            "object.x" | "object.position.x" => Self::ObjectX,
            "object.y" | "object.position.y" => Self::ObjectY,
            "object.alpha" => Self::ObjectAlpha,
            "object.rotation" => Self::ObjectRotation,
            _ => return None,
        })
    }

    fn on_object(self) -> bool {
        matches!(
            self,
            Self::ObjectX | Self::ObjectY | Self::ObjectAlpha | Self::ObjectRotation
        )
    }

    /// Read the current value. `None` if the property targets an object the
    /// entity doesn't have.
    pub fn get(self, app: &App, entity: EntityId) -> Option<f32> {
        let id = if self.on_object() {
            app.object(entity)?
        } else {
            app.container(entity).ok()?
        };
        let stage = app.stage();
        let node = stage.get(id)?;
        Some(match self {
            Self::ContainerX | Self::ObjectX => node.position.x,
            Self::ContainerY | Self::ObjectY => node.position.y,
            Self::ContainerAlpha | Self::ObjectAlpha => node.alpha,
            Self::ContainerRotation | Self::ObjectRotation => node.rotation.to_degrees(),
            Self::ContainerScaleX => node.scale.x,
            Self::ContainerScaleY => node.scale.y,
            Self::ContainerWidth => stage.width(id),
            Self::ContainerHeight => stage.height(id),
        })
    }

    /// Write a value. Silently does nothing if the target is gone.
    pub fn set(self, app: &mut App, entity: EntityId, value: f32) {
        let id = if self.on_object() {
            app.object(entity)
        } else {
            app.container(entity).ok()
        };
        let Some(id) = id else {
            return;
        };
        let stage = app.stage_mut();
        match self {
            Self::ContainerWidth => return stage.set_width(id, value),
            Self::ContainerHeight => return stage.set_height(id, value),
            _ => {}
        }
        let Some(node) = stage.get_mut(id) else {
            return;
        };
        match self {
            Self::ContainerX | Self::ObjectX => node.position.x = value,
            Self::ContainerY | Self::ObjectY => node.position.y = value,
            Self::ContainerAlpha | Self::ObjectAlpha => node.alpha = value,
            Self::ContainerRotation | Self::ObjectRotation => node.rotation = value.to_radians(),
            Self::ContainerScaleX => node.scale.x = value,
            Self::ContainerScaleY => node.scale.y = value,
            Self::ContainerWidth | Self::ContainerHeight => {}
        }
    }
}

/// Linearly interpolate between `a` and `b` at factor `t`.
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// One parsed animation declaration.
#[derive(Debug, Clone, PartialEq)]
struct Tween {
    property: AnimatedProperty,
    from: f32,
    to: f32,
    duration: f32,
    ease: EaseFunction,
    direction: Direction,
    repeat: Repeat,
}

impl Tween {
    /// Value at `elapsed` ms, and whether playback is over.
    fn sample(&self, elapsed: f32) -> (f32, bool) {
        let (iteration, raw, finished) = if self.duration <= 0.0 {
            (self.last_iteration(), 1.0, true)
        } else {
            let iteration = (elapsed / self.duration).floor() as u32;
            match self.repeat {
                Repeat::Times(n) if iteration >= n => (n.saturating_sub(1), 1.0, true),
                _ => (iteration, (elapsed % self.duration) / self.duration, false),
            }
        };
        let t = if self.direction.backwards(iteration) {
            1.0 - raw
        } else {
            raw
        };
        (lerp(self.from, self.to, self.ease.sample(t)), finished)
    }

    fn last_iteration(&self) -> u32 {
        match self.repeat {
            Repeat::Times(n) => n.saturating_sub(1),
            Repeat::Forever => 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Animation {
    tween: Option<Tween>,
    elapsed: f32,
    playing: bool,
    last_value: Option<f32>,
    start_events: Vec<String>,
    /// Event names a start handler is already registered for.
    hooked: Vec<String>,
}

impl Animation {
    /// Restart from the beginning.
    pub fn play(&mut self) {
        self.elapsed = 0.0;
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn property(&self) -> Option<AnimatedProperty> {
        self.tween.as_ref().map(|t| t.property)
    }

    fn parse(app: &App, entity: EntityId, record: &Record) -> Result<Tween> {
        let path = record
            .get_non_empty("property")
            .ok_or(SceneError::MissingAttribute {
                component: "animation",
                attribute: "property",
            })?;
        let property = AnimatedProperty::parse(path).ok_or_else(|| {
            log::warn!("Animation on {entity} targets unknown property '{path}'");
            SceneError::UnknownProperty(path.to_string())
        })?;

        let from = match record.get_non_empty("from") {
            Some(v) => parse_number(v).ok_or_else(|| SceneError::invalid("animation", v))?,
            None => property
                .get(app, entity)
                .ok_or_else(|| SceneError::UnknownProperty(path.to_string()))?,
        };
        let to = record
            .get_non_empty("to")
            .ok_or(SceneError::MissingAttribute {
                component: "animation",
                attribute: "to",
            })?;
        let to = parse_number(to).ok_or_else(|| SceneError::invalid("animation", to))?;

        let ease = match record.get_non_empty("easing") {
            Some(name) => {
                EaseFunction::parse(name).ok_or_else(|| SceneError::invalid("animation", name))?
            }
            None => EaseFunction::Linear,
        };
        let direction = match record.get_non_empty("dir") {
            Some(name) => {
                Direction::parse(name).ok_or_else(|| SceneError::invalid("animation", name))?
            }
            None => Direction::Normal,
        };

        Ok(Tween {
            property,
            from,
            to,
            duration: record.f32_or("dur", 1000.0),
            ease,
            direction,
            repeat: Repeat::parse(record.get("loop")),
        })
    }
}

impl Component for Animation {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let record = Record::parse(data);
        self.tween = Some(Self::parse(app, entity, &record)?);
        self.elapsed = 0.0;
        self.playing = false;
        self.last_value = None;

        if record.get("autoplay") == Some("true") {
            self.play();
        }

        self.start_events = record
            .get("startEvents")
            .map(|v| split_list(v).into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        for event in &self.start_events {
            if self.hooked.contains(event) {
                continue;
            }
            self.hooked.push(event.clone());
            let name = event.clone();
            app.on(entity, event, move |app, entity, _| {
                app.with_component::<Animation, _>(entity, "animation", |anim, _| {
                    if anim.start_events.contains(&name) {
                        anim.play();
                    }
                });
                Ok(())
            })?;
        }
        Ok(())
    }

    fn tick(&mut self, app: &mut App, entity: EntityId, dt_ms: f32) -> Result<()> {
        if !self.playing {
            return Ok(());
        }
        let Some(tween) = &self.tween else {
            return Ok(());
        };
        self.elapsed += dt_ms;
        let (value, finished) = tween.sample(self.elapsed);
        if self.last_value != Some(value) {
            self.last_value = Some(value);
            tween.property.set(app, entity, value);
        }
        if finished {
            self.playing = false;
        }
        Ok(())
    }

    fn wants_tick(&self) -> bool {
        true
    }
}
