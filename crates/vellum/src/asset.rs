//! # Resource Loading
//!
//! Components never block on I/O. They ask the [`ResourceLoader`] for a URL;
//! if it is already resolved they use it right away, otherwise the entity is
//! recorded as a *waiter* and the request goes to a [`ResourceSource`].
//! Completions are polled at the start of every frame and each waiter gets a
//! `"load"` event carrying the URL.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  ResourceLoader (owned by App)                            │
//! │                                                           │
//! │  resolved ── src → Resource       (cache, never evicted)  │
//! │  pending ─── srcs requested, not yet completed            │
//! │  waiters ─── src → entities to notify                     │
//! │  failed ──── src → error message  (never retried)         │
//! │                                                           │
//! │  source ──► Box<dyn ResourceSource>                       │
//! │              request(src)  /  poll() → completions        │
//! └───────────────────────────────────────────────────────────┘
//!
//! Per-frame: App::update
//!   1. loader.poll()  → (src, waiters) for each success
//!   2. emit "load" on every live waiter
//! ```
//!
//! ## Failures
//!
//! A failed load is logged at `error` and recorded. Waiters are dropped
//! without notification; anything waiting on the resource (the render
//! handle's ready signal included) stays waiting.
//!
//! ## No Cancellation
//!
//! A completion is delivered even if the waiting entity changed its mind in
//! the meantime. Components compare the URL in the payload against what they
//! currently want.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::ecs::EntityId;
use crate::error::{AssetError, Result, SceneError};
use crate::math::{Aabb, Vec2};
use crate::stage::TextureRef;

/// A record of one completed load (diagnostics only).
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadEvent {
    pub src: String,
    pub success: bool,
    pub error: Option<String>,
}

/// A named region inside an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Pixel rectangle in the atlas image.
    pub region: Aabb,
    /// Untrimmed size of the frame.
    pub size: Vec2,
    pub rotated: bool,
}

/// A loaded image or atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub src: String,
    /// Size of the whole image.
    pub size: Vec2,
    /// Atlas frames by name. Empty for plain images.
    pub frames: HashMap<String, Frame>,
    /// Decoded RGBA8 pixels, if the source decodes images.
    pub pixels: Option<Rc<[u8]>>,
}

impl Resource {
    /// A plain image of the given size with no pixel data.
    pub fn image(src: &str, width: f32, height: f32) -> Self {
        Self {
            src: src.to_string(),
            size: Vec2::new(width, height),
            frames: HashMap::new(),
            pixels: None,
        }
    }

    /// Add an atlas frame.
    pub fn with_frame(mut self, name: &str, region: Aabb) -> Self {
        self.frames.insert(
            name.to_string(),
            Frame {
                region,
                size: Vec2::new(region.width, region.height),
                rotated: false,
            },
        );
        self
    }

    /// The texture for `frame`, or for the whole image when `frame` is `None`.
    pub fn texture(&self, frame: Option<&str>) -> Result<TextureRef> {
        let size = match frame {
            None => self.size,
            Some(name) => {
                self.frames
                    .get(name)
                    .ok_or_else(|| SceneError::UnknownFrame {
                        src: self.src.clone(),
                        frame: name.to_string(),
                    })?
                    .size
            }
        };
        Ok(TextureRef {
            src: self.src.clone(),
            frame: frame.map(str::to_string),
            size,
        })
    }
}

/// Where resources come from.
///
/// `request` starts a load; `poll` returns every load that finished since the
/// last poll. Sources never call back into the app.
pub trait ResourceSource {
    fn request(&mut self, src: &str);
    fn poll(&mut self) -> Vec<(String, std::result::Result<Resource, AssetError>)>;
}

/// In-memory resources, resolved on the poll after they are requested.
///
/// Useful for tests and for embedding: fill it up front, hand it to
/// [`render_with`](crate::render::render_with).
#[derive(Debug, Default)]
pub struct MemorySource {
    resources: HashMap<String, Resource>,
    requested: Vec<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: Resource) -> Self {
        self.insert(resource);
        self
    }

    pub fn insert(&mut self, resource: Resource) {
        self.resources.insert(resource.src.clone(), resource);
    }
}

impl ResourceSource for MemorySource {
    fn request(&mut self, src: &str) {
        self.requested.push(src.to_string());
    }

    fn poll(&mut self) -> Vec<(String, std::result::Result<Resource, AssetError>)> {
        self.requested
            .drain(..)
            .map(|src| {
                let result = self
                    .resources
                    .get(&src)
                    .cloned()
                    .ok_or_else(|| AssetError::NotFound(src.clone()));
                (src, result)
            })
            .collect()
    }
}

#[cfg(feature = "file-assets")]
pub use file::FileSource;

#[cfg(feature = "file-assets")]
mod file {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use serde::Deserialize;

    use super::{Frame, Resource, ResourceSource};
    use crate::error::AssetError;
    use crate::math::{Aabb, Vec2};

    #[derive(Deserialize)]
    struct AtlasFile {
        frames: HashMap<String, AtlasFrame>,
        meta: AtlasMeta,
    }

    #[derive(Deserialize)]
    struct AtlasFrame {
        frame: AtlasRect,
        #[serde(default)]
        rotated: bool,
        #[serde(rename = "sourceSize")]
        source_size: Option<AtlasSize>,
    }

    #[derive(Deserialize)]
    struct AtlasMeta {
        image: String,
        size: AtlasSize,
    }

    #[derive(Deserialize)]
    struct AtlasRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    }

    #[derive(Deserialize)]
    struct AtlasSize {
        w: f32,
        h: f32,
    }

    /// Loads images and TexturePacker JSON atlases from a directory.
    ///
    /// Loading happens on `poll`, so a request always resolves one frame
    /// later, the same as a network-backed source would at best.
    pub struct FileSource {
        root: PathBuf,
        queue: Vec<String>,
    }

    impl FileSource {
        /// Resolve resource URLs relative to `root`.
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self {
                root: root.into(),
                queue: Vec::new(),
            }
        }

        fn load(&self, src: &str) -> Result<Resource, AssetError> {
            let path = self.root.join(src);
            if path.extension().is_some_and(|ext| ext == "json") {
                self.load_atlas(src, &path)
            } else {
                let (size, pixels) = decode(&path)?;
                Ok(Resource {
                    src: src.to_string(),
                    size,
                    frames: HashMap::new(),
                    pixels: Some(pixels),
                })
            }
        }

        fn load_atlas(&self, src: &str, path: &Path) -> Result<Resource, AssetError> {
            let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let atlas: AtlasFile =
                serde_json::from_str(&text).map_err(|source| AssetError::Atlas {
                    path: path.display().to_string(),
                    source,
                })?;

            let image_path = path
                .parent()
                .map_or_else(|| PathBuf::from(&atlas.meta.image), |dir| dir.join(&atlas.meta.image));
            let (_, pixels) = decode(&image_path)?;

            let frames = atlas
                .frames
                .into_iter()
                .map(|(name, f)| {
                    let region = Aabb::new(f.frame.x, f.frame.y, f.frame.w, f.frame.h);
                    let size = f
                        .source_size
                        .map_or(Vec2::new(f.frame.w, f.frame.h), |s| Vec2::new(s.w, s.h));
                    let frame = Frame {
                        region,
                        size,
                        rotated: f.rotated,
                    };
                    (name, frame)
                })
                .collect();

            Ok(Resource {
                src: src.to_string(),
                size: Vec2::new(atlas.meta.size.w, atlas.meta.size.h),
                frames,
                pixels: Some(pixels),
            })
        }
    }

    fn decode(path: &Path) -> Result<(Vec2, Rc<[u8]>), AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|source| AssetError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();
        let size = Vec2::new(image.width() as f32, image.height() as f32);
        Ok((size, Rc::from(image.into_raw())))
    }

    impl ResourceSource for FileSource {
        fn request(&mut self, src: &str) {
            self.queue.push(src.to_string());
        }

        fn poll(&mut self) -> Vec<(String, Result<Resource, AssetError>)> {
            let queue = std::mem::take(&mut self.queue);
            queue
                .into_iter()
                .map(|src| {
                    let result = self.load(&src);
                    (src, result)
                })
                .collect()
        }
    }
}

/// Where a requested resource stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Ready,
    Pending,
    Failed,
}

/// Request/cache front-end over a [`ResourceSource`].
pub struct ResourceLoader {
    source: Box<dyn ResourceSource>,
    resolved: HashMap<String, Resource>,
    pending: HashSet<String>,
    waiters: HashMap<String, Vec<EntityId>>,
    failed: HashMap<String, String>,
    #[cfg(feature = "diagnostics")]
    load_log: Vec<LoadEvent>,
}

impl ResourceLoader {
    pub fn new(source: Box<dyn ResourceSource>) -> Self {
        Self {
            source,
            resolved: HashMap::new(),
            pending: HashSet::new(),
            waiters: HashMap::new(),
            failed: HashMap::new(),
            #[cfg(feature = "diagnostics")]
            load_log: Vec::new(),
        }
    }

    /// Ask for `src`. If it isn't resolved yet, `waiter` (when given) will get
    /// a `"load"` event once it is. A URL is only ever requested from the
    /// source once.
    pub fn request(&mut self, src: &str, waiter: Option<EntityId>) -> LoadState {
        if self.resolved.contains_key(src) {
            return LoadState::Ready;
        }
        if self.failed.contains_key(src) {
            return LoadState::Failed;
        }
        if let Some(entity) = waiter {
            let list = self.waiters.entry(src.to_string()).or_default();
            if !list.contains(&entity) {
                list.push(entity);
            }
        }
        if self.pending.insert(src.to_string()) {
            log::debug!("Requesting resource '{src}'");
            self.source.request(src);
        }
        LoadState::Pending
    }

    pub fn get(&self, src: &str) -> Option<&Resource> {
        self.resolved.get(src)
    }

    /// The texture for `src` (and optional atlas frame), if resolved.
    pub fn texture(&self, src: &str, frame: Option<&str>) -> Result<TextureRef> {
        self.resolved
            .get(src)
            .ok_or_else(|| SceneError::NotLoaded(src.to_string()))?
            .texture(frame)
    }

    pub fn is_pending(&self, src: &str) -> bool {
        self.pending.contains(src)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The recorded error message for a failed URL.
    pub fn failure(&self, src: &str) -> Option<&str> {
        self.failed.get(src).map(String::as_str)
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Drain completions from the source. Returns, for each success, the URL
    /// and the entities that were waiting for it.
    pub fn poll(&mut self) -> Vec<(String, Vec<EntityId>)> {
        let mut delivered = Vec::new();
        for (src, result) in self.source.poll() {
            if !self.pending.remove(&src) {
                continue;
            }
            let waiters = self.waiters.remove(&src).unwrap_or_default();
            match result {
                Ok(resource) => {
                    #[cfg(feature = "diagnostics")]
                    self.load_log.push(LoadEvent {
                        src: src.clone(),
                        success: true,
                        error: None,
                    });
                    self.resolved.insert(src.clone(), resource);
                    delivered.push((src, waiters));
                }
                Err(e) => {
                    log::error!("Failed to load '{src}': {e}");
                    #[cfg(feature = "diagnostics")]
                    self.load_log.push(LoadEvent {
                        src: src.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                    self.failed.insert(src, e.to_string());
                }
            }
        }
        delivered
    }

    /// Every completed load, oldest first.
    #[cfg(feature = "diagnostics")]
    pub fn load_log(&self) -> &[LoadEvent] {
        &self.load_log
    }
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new(Box::new(MemorySource::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::EntityAllocator;

    fn loader_with(resources: &[Resource]) -> ResourceLoader {
        let mut source = MemorySource::new();
        for r in resources {
            source.insert(r.clone());
        }
        ResourceLoader::new(Box::new(source))
    }

    #[test]
    fn request_resolves_on_poll() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        let mut loader = loader_with(&[Resource::image("a.png", 4.0, 2.0)]);

        assert_eq!(loader.request("a.png", Some(e)), LoadState::Pending);
        assert!(loader.is_pending("a.png"));
        assert!(loader.get("a.png").is_none());

        let delivered = loader.poll();
        assert_eq!(delivered, vec![("a.png".to_string(), vec![e])]);
        assert_eq!(loader.request("a.png", Some(e)), LoadState::Ready);
        assert_eq!(loader.texture("a.png", None).unwrap().size, Vec2::new(4.0, 2.0));
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn duplicate_requests_share_one_load() {
        let mut alloc = EntityAllocator::new();
        let (a, b) = (alloc.allocate(), alloc.allocate());
        let mut loader = loader_with(&[Resource::image("a.png", 1.0, 1.0)]);

        loader.request("a.png", Some(a));
        loader.request("a.png", Some(b));
        loader.request("a.png", Some(a));

        let delivered = loader.poll();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1, vec![a, b]);
    }

    #[test]
    fn failures_are_recorded_and_waiters_dropped() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        let mut loader = loader_with(&[]);

        loader.request("missing.png", Some(e));
        assert!(loader.poll().is_empty());
        assert!(loader.failure("missing.png").is_some());
        assert_eq!(loader.request("missing.png", Some(e)), LoadState::Failed);
        assert_eq!(loader.pending_count(), 0);
        assert!(matches!(
            loader.texture("missing.png", None),
            Err(SceneError::NotLoaded(_))
        ));
    }

    #[test]
    fn atlas_frames() {
        let atlas = Resource::image("sheet.json", 64.0, 64.0)
            .with_frame("idle", Aabb::new(0.0, 0.0, 16.0, 24.0));
        assert_eq!(atlas.texture(Some("idle")).unwrap().size, Vec2::new(16.0, 24.0));
        assert!(matches!(
            atlas.texture(Some("run")),
            Err(SceneError::UnknownFrame { .. })
        ));
    }
}
