//! `sprite`: a textured quad centered on the container.
//!
//! ```text
//! sprite="src: #atlas; texture: idle; click: pressed"
//! ```
//!
//! `src` may be a URL or a `#id` reference to a declared asset. `texture`
//! names a frame inside an atlas; without it the whole image is used. When
//! `click` is set, the sprite shows that frame while the pointer is down.
//!
//! If the resource isn't loaded yet the sprite requests it and draws once the
//! `"load"` event arrives. The frame to show is remembered per request, so a
//! late completion still shows what was asked for at the time.

use crate::app::App;
use crate::asset::LoadState;
use crate::attr::Record;
use crate::ecs::{Component, EntityId, Payload};
use crate::error::{Result, SceneError};
use crate::stage::{NodeId, NodeKind};

#[derive(Debug, Default)]
pub struct Sprite {
    node: Option<NodeId>,
    src: Option<String>,
    texture: Option<String>,
    click: Option<String>,
    /// Requested URL → frame to show once it resolves.
    waiting: Vec<(String, Option<String>)>,
}

impl Sprite {
    /// Point the sprite node at `src`/`frame` and make it the entity's object.
    fn show(&mut self, app: &mut App, entity: EntityId, src: &str, frame: Option<&str>) -> Result<()> {
        let texture = app.loader().texture(src, frame)?;
        let size = texture.size;

        let node = match self.node.filter(|&n| app.stage().contains(n)) {
            Some(node) => node,
            None => app.stage_mut().create(NodeKind::Sprite { texture: None }),
        };
        self.node = Some(node);
        if let Some(n) = app.stage_mut().get_mut(node) {
            n.kind = NodeKind::Sprite {
                texture: Some(texture),
            };
            n.position = size / 2.0;
            n.pivot = size;
        }
        app.set_object(entity, node)
    }

    fn on_load(&mut self, app: &mut App, entity: EntityId, src: &str) -> Result<()> {
        // One event covers every request for `src`; the latest one wins.
        let (ready, waiting): (Vec<_>, Vec<_>) =
            self.waiting.drain(..).partition(|(s, _)| s == src);
        self.waiting = waiting;
        for (src, frame) in &ready {
            self.show(app, entity, src, frame.as_deref())?;
        }
        Ok(())
    }

    /// Swap to `frame` of the current source, if it is loaded.
    fn swap(&mut self, app: &mut App, entity: EntityId, frame: Option<String>) -> Result<()> {
        let Some(src) = self.src.clone() else {
            return Ok(());
        };
        if app.loader().get(&src).is_none() {
            return Ok(());
        }
        self.show(app, entity, &src, frame.as_deref())
    }
}

impl Component for Sprite {
    fn init(&mut self, app: &mut App, entity: EntityId, _data: &str) -> Result<()> {
        app.on(entity, "load", |app, entity, payload| {
            let Payload::Text(src) = payload else {
                return Ok(());
            };
            app.with_component::<Sprite, _>(entity, "sprite", |sprite, app| {
                sprite.on_load(app, entity, src)
            })
            .unwrap_or(Ok(()))
        })?;
        app.on(entity, "mousedown", |app, entity, _| {
            app.with_component::<Sprite, _>(entity, "sprite", |sprite, app| {
                match sprite.click.clone() {
                    Some(click) => sprite.swap(app, entity, Some(click)),
                    None => Ok(()),
                }
            })
            .unwrap_or(Ok(()))
        })?;
        app.on(entity, "mouseup", |app, entity, _| {
            app.with_component::<Sprite, _>(entity, "sprite", |sprite, app| {
                if sprite.click.is_none() {
                    return Ok(());
                }
                let frame = sprite.texture.clone();
                sprite.swap(app, entity, frame)
            })
            .unwrap_or(Ok(()))
        })
    }

    fn update(&mut self, app: &mut App, entity: EntityId, data: &str) -> Result<()> {
        let record = Record::parse(data);
        let src = record
            .get_non_empty("src")
            .ok_or(SceneError::MissingAttribute {
                component: "sprite",
                attribute: "src",
            })?;
        let src = app.resolve_src(src)?;
        let frame = record.get_non_empty("texture").map(str::to_string);

        self.src = Some(src.clone());
        self.texture = frame.clone();
        self.click = record.get_non_empty("click").map(str::to_string);

        match app.loader_mut().request(&src, Some(entity)) {
            LoadState::Ready => self.show(app, entity, &src, frame.as_deref()),
            LoadState::Pending => {
                self.waiting.push((src, frame));
                Ok(())
            }
            LoadState::Failed => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{MemorySource, Resource};
    use crate::math::{Aabb, Vec2};

    fn app_with_atlas() -> App {
        let atlas = Resource::image("sheet.json", 64.0, 64.0)
            .with_frame("idle", Aabb::new(0.0, 0.0, 20.0, 10.0))
            .with_frame("pressed", Aabb::new(20.0, 0.0, 30.0, 12.0));
        let mut app = App::with_source(Box::new(MemorySource::new().with(atlas)));
        app.declare_asset("sheet", "sheet.json");
        app
    }

    fn frame(app: &App, entity: EntityId) -> Option<String> {
        match &app.object_node(entity)?.kind {
            NodeKind::Sprite { texture } => texture.as_ref()?.frame.clone(),
            _ => None,
        }
    }

    #[test]
    fn loads_then_centers() {
        let mut app = app_with_atlas();
        let e = app.spawn(None).unwrap();
        app.set_component(e, "sprite", "src: #sheet; texture: idle").unwrap();
        assert!(app.object(e).is_none());

        app.update(16.0).unwrap();
        let node = app.object_node(e).unwrap();
        assert_eq!(node.position, Vec2::new(10.0, 5.0));
        assert_eq!(node.pivot, Vec2::new(20.0, 10.0));
        let container = app.container(e).unwrap();
        assert_eq!(
            app.stage().local_bounds(container),
            Some(Aabb::new(-10.0, -5.0, 20.0, 10.0))
        );
    }

    #[test]
    fn redeclared_while_loading_shows_latest_frame() {
        let mut app = app_with_atlas();
        let e = app.spawn(None).unwrap();
        app.set_component(e, "sprite", "src: sheet.json; texture: idle").unwrap();
        app.set_component(e, "sprite", "src: sheet.json; texture: pressed").unwrap();
        app.update(16.0).unwrap();
        app.update(16.0).unwrap();

        assert_eq!(frame(&app, e).as_deref(), Some("pressed"));
        let waiting = app
            .with_component::<Sprite, _>(e, "sprite", |sprite, _| sprite.waiting.len())
            .unwrap();
        assert_eq!(waiting, 0);
    }

    #[test]
    fn cached_resource_applies_immediately() {
        let mut app = app_with_atlas();
        let first = app.spawn(None).unwrap();
        app.set_component(first, "sprite", "src: sheet.json; texture: idle").unwrap();
        app.update(16.0).unwrap();

        let second = app.spawn(None).unwrap();
        app.set_component(second, "sprite", "src: sheet.json; texture: pressed").unwrap();
        assert_eq!(frame(&app, second).as_deref(), Some("pressed"));
    }

    #[test]
    fn click_swaps_frames() {
        let mut app = app_with_atlas();
        let e = app.spawn(None).unwrap();
        let container = app.container(e).unwrap();
        let root = app.stage().root();
        app.stage_mut().add_child(root, container);
        app.set_component(e, "sprite", "src: #sheet; texture: idle; click: pressed").unwrap();
        app.set_component(e, "interactive", "").unwrap();
        app.update(16.0).unwrap();

        app.pointer_down(Vec2::new(0.0, 0.0)).unwrap();
        assert_eq!(frame(&app, e).as_deref(), Some("pressed"));
        app.pointer_up(Vec2::new(0.0, 0.0)).unwrap();
        assert_eq!(frame(&app, e).as_deref(), Some("idle"));
    }

    #[test]
    fn unknown_asset_reference_fails() {
        let mut app = app_with_atlas();
        let e = app.spawn(None).unwrap();
        assert!(matches!(
            app.set_component(e, "sprite", "src: #missing"),
            Err(SceneError::UnknownAsset(_))
        ));
    }

    #[test]
    fn failed_load_never_draws() {
        let mut app = App::new();
        let e = app.spawn(None).unwrap();
        app.set_component(e, "sprite", "src: nowhere.png").unwrap();
        app.update(16.0).unwrap();
        app.update(16.0).unwrap();
        assert!(app.object(e).is_none());
        assert!(app.loader().failure("nowhere.png").is_some());
    }
}
