//! Components that create an entity's object: `rect`, `slice9`, `text`.
//! (`sprite` lives in its own module because of its pointer handling.)

use crate::app::App;
use crate::asset::LoadState;
use crate::attr::{Record, parse_number};
use crate::ecs::{Component, EntityId, Payload};
use crate::error::{Result, SceneError};
use crate::math::Vec2;
use crate::stage::{Color, Insets, NodeId, NodeKind, TextRun, TextStyle};

/// Parse a color attribute, defaulting to white.
pub(crate) fn parse_color(component: &'static str, value: Option<&str>) -> Result<Color> {
    let value = value.unwrap_or("#fff");
    Color::parse(value).ok_or_else(|| SceneError::invalid(component, value))
}

/// `rect="color: #f00; width: 50; height: 20"`: a solid rectangle centered
/// on the container origin. Width and height default to 100.
#[derive(Debug, Default)]
pub struct Rect;

impl Component for Rect {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let record = Record::parse(data);
        let color = parse_color("rect", record.get_non_empty("color"))?;
        let dimension = |key: &str| match record.get_non_empty(key) {
            Some(v) => parse_number(v).ok_or_else(|| SceneError::invalid("rect", v)),
            None => Ok(100.0),
        };
        let size = Vec2::new(dimension("width")?, dimension("height")?);

        let node = app.stage_mut().create(NodeKind::Rect { size, color });
        if let Some(n) = app.stage_mut().get_mut(node) {
            n.position = -size / 2.0;
        }
        app.set_object(entity, node)
    }
}

/// What a nine-slice should look like once its texture is available.
#[derive(Debug, Clone, PartialEq)]
struct PendingSlice {
    src: String,
    frame: Option<String>,
    insets: Insets,
    size: Option<Vec2>,
}

/// `slice9="src: panel.png; left: 12; width: 300; height: 80"`: a texture
/// stretched with fixed borders. Borders default to 10.
#[derive(Debug, Default)]
pub struct Slice9 {
    /// Slices waiting for their resource, in request order.
    waiting: Vec<PendingSlice>,
}

impl Slice9 {
    fn build(app: &mut App, entity: EntityId, slice: &PendingSlice) -> Result<()> {
        let texture = app.loader().texture(&slice.src, slice.frame.as_deref())?;
        let size = slice.size.unwrap_or(texture.size);
        app.create_object(
            entity,
            NodeKind::NineSlice {
                texture,
                insets: slice.insets,
                size,
            },
        )?;
        Ok(())
    }

    fn on_load(&mut self, app: &mut App, entity: EntityId, src: &str) -> Result<()> {
        let (ready, waiting): (Vec<_>, Vec<_>) =
            self.waiting.drain(..).partition(|slice| slice.src == src);
        self.waiting = waiting;
        for slice in &ready {
            Self::build(app, entity, slice)?;
        }
        Ok(())
    }
}

impl Component for Slice9 {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        app.on(entity, "load", |app, entity, payload| {
            let Payload::Text(src) = payload else {
                return Ok(());
            };
            app.with_component::<Slice9, _>(entity, "slice9", |slice, app| {
                slice.on_load(app, entity, src)
            })
            .unwrap_or(Ok(()))
        })
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let record = Record::parse(data);
        let src = record
            .get_non_empty("src")
            .ok_or(SceneError::MissingAttribute {
                component: "slice9",
                attribute: "src",
            })?;
        let src = app.resolve_src(src)?;

        let border = |key: &str| {
            record
                .get_f32(key)
                .map(f32::trunc)
                .filter(|v| *v != 0.0)
                .unwrap_or(10.0)
        };
        let insets = Insets {
            left: border("left"),
            top: border("top"),
            right: border("right"),
            bottom: border("bottom"),
        };
        let size = match (record.get_f32("width"), record.get_f32("height")) {
            (Some(w), Some(h)) => Some(Vec2::new(w.trunc(), h.trunc())),
            _ => None,
        };

        let slice = PendingSlice {
            src: src.clone(),
            frame: record.get_non_empty("texture").map(str::to_string),
            insets,
            size,
        };
        match app.loader_mut().request(&src, Some(entity)) {
            LoadState::Ready => Self::build(app, entity, &slice),
            LoadState::Pending => {
                self.waiting.push(slice);
                Ok(())
            }
            LoadState::Failed => Ok(()),
        }
    }
}

/// `text="text: Hello; color: #fff; fontSize: 48"`: a text run.
///
/// Style keys accumulate across updates; keys other than `text`, `color`,
/// `fontSize`, `fontFamily`, and `align` are kept for the render backend.
#[derive(Debug, Default)]
pub struct Text {
    run: TextRun,
    node: Option<NodeId>,
}

impl Text {
    fn apply(&mut self, record: &Record) -> Result<()> {
        let style: &mut TextStyle = &mut self.run.style;
        for (key, value) in record.iter() {
            match key {
                "text" => self.run.content = value.to_string(),
                "color" => style.fill = parse_color("text", Some(value))?,
                "fontSize" => {
                    style.font_size =
                        parse_number(value).ok_or_else(|| SceneError::invalid("text", value))?;
                }
                "fontFamily" => style.font_family = value.to_string(),
                "align" if !value.is_empty() => style.align = value.to_string(),
                "align" => {}
                other => match style.extra.iter_mut().find(|(k, _)| k == other) {
                    Some(entry) => entry.1 = value.to_string(),
                    None => style.extra.push((other.to_string(), value.to_string())),
                },
            }
        }
        Ok(())
    }
}

impl Component for Text {
    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        self.apply(&Record::parse(data))?;

        let kind = NodeKind::Text(self.run.clone());
        let node = match self.node.filter(|&n| app.object(entity) == Some(n)) {
            Some(node) => {
                if let Some(n) = app.stage_mut().get_mut(node) {
                    n.kind = kind;
                }
                node
            }
            None => app.stage_mut().create(kind),
        };
        self.node = Some(node);
        app.set_object(entity, node)
    }
}
