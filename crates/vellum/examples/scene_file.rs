//! Scene File — loading a scene and its assets from disk.
//!
//! Reads `assets/scene.html` (or the path given as the first argument),
//! waits for its atlas to load, presses the first button, and prints the
//! stage as JSON through a headless backend.
//!
//! Run with: `cargo run -p vellum --example scene_file`

use std::path::Path;

use vellum::prelude::*;

/// Prints the stage instead of drawing it.
struct JsonBackend;

impl RenderBackend for JsonBackend {
    fn present(&mut self, surface: &Surface, stage: &Stage) -> Result<()> {
        println!(
            "surface {}x{} (scale {:.2}), clear #{:06x}",
            surface.width,
            surface.height,
            surface.scale,
            surface.clear.to_hex()
        );
        let tree = stage.snapshot(stage.root());
        println!("{}", serde_json::to_string_pretty(&tree).unwrap_or_default());
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/assets/scene.html").to_string());
    let path = Path::new(&path);
    let markup = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut handle = render_with(
        &markup,
        RenderOptions::new(),
        Box::new(FileSource::new(dir)),
    )?;
    handle.on_ready(|app| log::info!("{} entities ready", app.entity_count()));
    handle.resize(720.0, 1280.0);

    while !handle.is_ready() {
        handle.frame()?;
        if handle.time().frame_count() > 10 {
            log::error!("assets did not load");
            return Ok(());
        }
    }

    // Press the play button; its sprite swaps to the pressed frame.
    let play = handle.app().find("play").expect("play is declared in the scene");
    if let Some(node) = handle.app().container(play).ok().and_then(|c| handle.app().stage().world_bounds(c)) {
        let center = node.min() + Vec2::new(node.width, node.height) / 2.0;
        let viewport = center * handle.surface().scale + handle.surface().offset;
        handle.pointer_down(viewport)?;
    }

    handle.present(&mut JsonBackend)
}
