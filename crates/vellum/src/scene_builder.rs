//! Building entities from markup.
//!
//! Each element becomes an entity. Its attributes are applied as component
//! declarations in source order, then its `<entity>` children are built
//! recursively and attached in document order:
//!
//! ```text
//! <scene layout="0 10">           entity(scene)   layout
//!   <entity rect="..."/>     ──►  ├── entity      rect
//!   <asset .../>                  │               (assets are not entities)
//!   <entity text="..."/>          └── entity      text
//! </scene>
//! ```
//!
//! A child is fully built (all its components initialized, its own children
//! attached) before it is attached to its parent. Any error stops the build.

use crate::app::App;
use crate::ecs::EntityId;
use crate::error::Result;
use crate::markup::Element;

/// Build `element` and its entity descendants, returning the root entity.
///
/// The element's `id` attribute, if any, becomes the entity's lookup id.
/// Attributes that don't name a registered component (`id`, `width`, ...) are
/// ignored.
///
/// On error, every entity spawned by this call is despawned again, so a
/// failed build leaves nothing behind.
pub fn build(app: &mut App, element: &Element) -> Result<EntityId> {
    let entity = app.spawn(element.attr("id").filter(|id| !id.is_empty()))?;
    if let Err(e) = populate(app, entity, element) {
        if let Err(cleanup) = app.despawn(entity) {
            log::warn!("Failed to discard partial entity {entity}: {cleanup}");
        }
        return Err(e);
    }
    Ok(entity)
}

fn populate(app: &mut App, entity: EntityId, element: &Element) -> Result<()> {
    for (name, value) in &element.attributes {
        app.set_component(entity, name, value)?;
    }

    for child in element.children.iter().filter(|c| c.is("entity")) {
        let child_entity = build(app, child)?;
        if let Err(e) = app.add_child(entity, child_entity) {
            // Not attached yet, so the parent's cleanup would miss it.
            if app.parent(child_entity) != Some(entity) {
                app.despawn(child_entity)?;
            }
            return Err(e);
        }
    }
    Ok(())
}

/// A declared `<asset>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDecl {
    pub id: Option<String>,
    pub src: String,
}

/// Every `<asset>` element under `scene`, in document order. Assets without a
/// `src` are skipped with a warning.
pub fn collect_assets(scene: &Element) -> Vec<AssetDecl> {
    let mut elements = Vec::new();
    scene.find_all("asset", &mut elements);
    elements
        .into_iter()
        .filter_map(|el| {
            let Some(src) = el.attr("src").filter(|s| !s.is_empty()) else {
                log::warn!("<asset> at {}:{} has no src; skipped", el.line, el.col);
                return None;
            };
            Some(AssetDecl {
                id: el.attr("id").filter(|id| !id.is_empty()).map(str::to_string),
                src: src.to_string(),
            })
        })
        .collect()
}
