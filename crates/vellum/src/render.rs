//! # Render Entry Point
//!
//! [`render`] turns scene markup into a running [`App`] wrapped in a
//! [`RenderHandle`]. Drawing is delegated to a [`RenderBackend`]; this crate
//! only maintains the [`Stage`] the backend reads.
//!
//! ## Startup
//!
//! ```text
//! render(source, options)
//!   1. parse markup, find <scene>
//!   2. size the Surface (fixed, or the scene's width/height letterboxed)
//!   3. declare every <asset>, request its src
//!   4. build the entity tree now if nothing is pending,
//!      otherwise on the first frame where the assets have resolved
//!   5. ready = tree built and no loads pending → on_ready callbacks
//! ```
//!
//! A preloaded asset that fails to load keeps the tree from being built, and a
//! failed load anywhere keeps the handle from becoming ready. A build that
//! returns an error is discarded and not attempted again.

use crate::app::App;
use crate::asset::ResourceSource;
use crate::attr::parse_number;
use crate::config::{DEFAULT_SCENE_HEIGHT, DEFAULT_SCENE_WIDTH, RenderOptions};
use crate::ecs::EntityId;
use crate::error::{Result, SceneError};
use crate::expr::Viewport;
use crate::markup::{Document, Element};
use crate::math::Vec2;
use crate::scene_builder::{self, collect_assets};
use crate::stage::{Color, Stage};
use crate::time::Time;

/// Consumes the stage once per presented frame.
pub trait RenderBackend {
    fn present(&mut self, surface: &Surface, stage: &Stage) -> Result<()>;
}

/// The drawing area.
///
/// `width`/`height` are in scene units. A dynamic surface is scaled by
/// `scale` and centered inside the viewport (`offset`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub offset: Vec2,
    pub clear: Color,
    pub fixed: bool,
}

impl Surface {
    fn fixed(width: f32, height: f32, clear: Color) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            offset: Vec2::ZERO,
            clear,
            fixed: true,
        }
    }

    fn letterboxed(width: f32, height: f32, viewport: Vec2, clear: Color) -> Self {
        let mut surface = Self {
            fixed: false,
            ..Self::fixed(width, height, clear)
        };
        surface.fit(viewport);
        surface
    }

    /// Uniformly scale into `viewport`, centered.
    fn fit(&mut self, viewport: Vec2) {
        let scale = (viewport.x / self.width).min(viewport.y / self.height);
        self.scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        self.offset = (viewport - Vec2::new(self.width, self.height) * self.scale) / 2.0;
    }

    /// Map a viewport point to scene coordinates.
    pub fn to_scene(&self, point: Vec2) -> Vec2 {
        (point - self.offset) / self.scale
    }
}

type ReadyCallback = Box<dyn FnOnce(&mut App)>;

/// A running scene.
pub struct RenderHandle {
    app: App,
    surface: Surface,
    scene: Element,
    root: Option<EntityId>,
    /// Set once a build has failed; the tree is not built again.
    build_failed: bool,
    ready: bool,
    on_ready: Vec<ReadyCallback>,
    time: Time,
}

/// Render `source` with the default resource source: files relative to the
/// working directory when the `file-assets` feature is on, otherwise an empty
/// in-memory source.
pub fn render(source: &str, options: RenderOptions) -> Result<RenderHandle> {
    #[cfg(feature = "file-assets")]
    let resources: Box<dyn ResourceSource> = Box::new(crate::asset::FileSource::new("."));
    #[cfg(not(feature = "file-assets"))]
    let resources: Box<dyn ResourceSource> = Box::new(crate::asset::MemorySource::new());
    render_with(source, options, resources)
}

/// Render `source`, loading resources from `resources`.
pub fn render_with(
    source: &str,
    options: RenderOptions,
    resources: Box<dyn ResourceSource>,
) -> Result<RenderHandle> {
    let document = Document::parse(source)?;
    let scene = document.find("scene").cloned().ok_or(SceneError::NoScene)?;

    let clear = options.clear_color()?;
    let scene_size = |name: &str, default: f32| {
        scene
            .attr(name)
            .and_then(parse_number)
            .filter(|v| *v > 0.0)
            .unwrap_or(default)
    };
    let width = scene_size("width", DEFAULT_SCENE_WIDTH);
    let height = scene_size("height", DEFAULT_SCENE_HEIGHT);
    let surface = if options.is_fixed() {
        Surface::fixed(
            options.width.unwrap_or(width),
            options.height.unwrap_or(height),
            clear,
        )
    } else {
        Surface::letterboxed(width, height, Vec2::new(width, height), clear)
    };

    let mut app = App::with_source(resources);
    app.set_viewport(Viewport::new(surface.width, surface.height));

    for asset in collect_assets(&scene) {
        if let Some(id) = &asset.id {
            app.declare_asset(id, &asset.src);
        }
        app.loader_mut().request(&asset.src, None);
    }

    let mut handle = RenderHandle {
        app,
        surface,
        scene,
        root: None,
        build_failed: false,
        ready: false,
        on_ready: Vec::new(),
        time: Time::new(),
    };
    handle.settle()?;
    Ok(handle)
}

impl RenderHandle {
    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The scene entity, once the tree is built.
    pub fn root(&self) -> Option<EntityId> {
        self.root
    }

    /// `true` if building the tree returned an error. Such a handle never
    /// becomes ready.
    pub fn build_failed(&self) -> bool {
        self.build_failed
    }

    /// `true` once the tree is built and every load it started has resolved.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Run `f` when the handle becomes ready, or right away if it already is.
    pub fn on_ready(&mut self, f: impl FnOnce(&mut App) + 'static) {
        if self.ready {
            f(&mut self.app);
        } else {
            self.on_ready.push(Box::new(f));
        }
    }

    /// Advance one frame by `dt_ms` milliseconds.
    pub fn step(&mut self, dt_ms: f32) -> Result<()> {
        self.app.update(dt_ms)?;
        self.settle()
    }

    /// Advance one frame by the wall-clock time since the previous one.
    pub fn frame(&mut self) -> Result<()> {
        self.time.update();
        self.step(self.time.delta_ms())
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// The viewport changed. Fixed surfaces ignore this.
    pub fn resize(&mut self, viewport_width: f32, viewport_height: f32) {
        if !self.surface.fixed {
            self.surface.fit(Vec2::new(viewport_width, viewport_height));
        }
    }

    /// Hand the stage to a backend.
    pub fn present(&self, backend: &mut dyn RenderBackend) -> Result<()> {
        backend.present(&self.surface, self.app.stage())
    }

    /// Pointer pressed at a viewport position.
    pub fn pointer_down(&mut self, point: Vec2) -> Result<Option<EntityId>> {
        let point = self.surface.to_scene(point);
        self.app.pointer_down(point)
    }

    /// Pointer released at a viewport position.
    pub fn pointer_up(&mut self, point: Vec2) -> Result<Option<EntityId>> {
        let point = self.surface.to_scene(point);
        self.app.pointer_up(point)
    }

    /// Build the tree once preloads are done, then check readiness.
    fn settle(&mut self) -> Result<()> {
        let loader = self.app.loader();
        let loads_clear = loader.pending_count() == 0 && loader.failure_count() == 0;

        if self.root.is_none() && !self.build_failed && loads_clear {
            let root = match scene_builder::build(&mut self.app, &self.scene) {
                Ok(root) => root,
                Err(e) => {
                    self.build_failed = true;
                    log::error!("Scene build failed: {e}");
                    return Err(e);
                }
            };
            let container = self.app.container(root)?;
            let stage_root = self.app.stage().root();
            self.app.stage_mut().add_child(stage_root, container);
            self.root = Some(root);
        }

        let loader = self.app.loader();
        let loads_clear = loader.pending_count() == 0 && loader.failure_count() == 0;
        if !self.ready && self.root.is_some() && loads_clear {
            self.ready = true;
            log::info!(
                "Scene ready: {} entities, {} nodes",
                self.app.entity_count(),
                self.app.stage().len()
            );
            for callback in std::mem::take(&mut self.on_ready) {
                callback(&mut self.app);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::asset::{MemorySource, Resource};

    #[test]
    fn no_scene_is_an_error() {
        let result = render_with("<div></div>", RenderOptions::new(), Box::new(MemorySource::new()));
        assert!(matches!(result, Err(SceneError::NoScene)));
    }

    #[test]
    fn ready_immediately_without_assets() {
        let handle = render_with(
            r#"<scene><entity id="a" opacity="0.5"></entity></scene>"#,
            RenderOptions::new(),
            Box::new(MemorySource::new()),
        )
        .unwrap();
        assert!(handle.is_ready());
        assert!(handle.app().find("a").is_some());
    }

    #[test]
    fn waits_for_preloaded_assets() {
        let source = MemorySource::new().with(Resource::image("hero.png", 8.0, 8.0));
        let mut handle = render_with(
            r#"<scene><asset id="hero" src="hero.png"></asset>
                 <entity id="h" sprite="src: #hero"></entity></scene>"#,
            RenderOptions::new(),
            Box::new(source),
        )
        .unwrap();

        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        handle.on_ready(move |_| flag.set(true));
        assert!(!handle.is_ready());
        assert!(handle.root().is_none());

        handle.step(16.0).unwrap();
        assert!(handle.is_ready());
        assert!(fired.get());
        let hero = handle.app().find("h").unwrap();
        assert!(handle.app().object(hero).is_some());
    }

    #[test]
    fn failed_asset_never_ready() {
        let mut handle = render_with(
            r#"<scene><asset src="gone.png"></asset></scene>"#,
            RenderOptions::new(),
            Box::new(MemorySource::new()),
        )
        .unwrap();
        handle.step(16.0).unwrap();
        handle.step(16.0).unwrap();
        assert!(!handle.is_ready());
        assert!(handle.root().is_none());
    }

    #[test]
    fn failed_deferred_build_is_not_retried() {
        let source = MemorySource::new().with(Resource::image("bg.png", 4.0, 4.0));
        let mut handle = render_with(
            r#"<scene><asset src="bg.png"></asset>
                 <entity id="a"></entity>
                 <entity sprite="texture: x"></entity></scene>"#,
            RenderOptions::new(),
            Box::new(source),
        )
        .unwrap();

        let first = handle.step(16.0);
        assert!(matches!(first, Err(SceneError::MissingAttribute { .. })));
        assert!(handle.build_failed());
        assert_eq!(handle.app().entity_count(), 0);

        handle.step(16.0).unwrap();
        assert_eq!(handle.app().entity_count(), 0);
        assert!(handle.root().is_none());
        assert!(!handle.is_ready());
    }

    #[test]
    fn surface_sizing() {
        let fixed = render_with(
            "<scene width='100' height='100'></scene>",
            RenderOptions::new().with_size(640.0, 360.0),
            Box::new(MemorySource::new()),
        )
        .unwrap();
        assert_eq!((fixed.surface().width, fixed.surface().height), (640.0, 360.0));
        assert_eq!(fixed.app().viewport(), Viewport::new(640.0, 360.0));

        let mut dynamic = render_with(
            "<scene></scene>",
            RenderOptions::new(),
            Box::new(MemorySource::new()),
        )
        .unwrap();
        assert_eq!(dynamic.surface().clear.to_hex(), 0x111111);
        dynamic.resize(540.0, 1920.0);
        let surface = *dynamic.surface();
        assert_eq!(surface.scale, 0.5);
        assert_eq!(surface.offset, Vec2::new(0.0, 480.0));
        assert_eq!(surface.to_scene(Vec2::new(270.0, 960.0)), Vec2::new(540.0, 960.0));

        // Fixed surfaces ignore resize.
        let mut fixed = fixed;
        fixed.resize(10.0, 10.0);
        assert_eq!(fixed.surface().scale, 1.0);
    }

    #[test]
    fn present_hands_over_the_stage() {
        struct Counting(usize);
        impl RenderBackend for Counting {
            fn present(&mut self, _surface: &Surface, stage: &Stage) -> Result<()> {
                self.0 = stage.len();
                Ok(())
            }
        }

        let handle = render_with(
            r#"<scene><entity rect=""></entity></scene>"#,
            RenderOptions::new(),
            Box::new(MemorySource::new()),
        )
        .unwrap();
        let mut backend = Counting(0);
        handle.present(&mut backend).unwrap();
        // stage root, scene container, entity container, rect
        assert_eq!(backend.0, 4);
    }
}
