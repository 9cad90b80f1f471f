//! Scene Hierarchy — nested entities and their stage containers.
//!
//! Builds a menu from markup, then adds and removes entities at runtime and
//! prints the stage after each change.
//!
//! Run with: `cargo run -p vellum --example scene_hierarchy`

use vellum::prelude::*;

const SCENE: &str = r#"
<scene id="root">
  <entity id="menu" position="appWidth/2 100" layout="0 50">
    <entity id="play" text="text: Play"></entity>
    <entity id="options" text="text: Options"></entity>
  </entity>
  <entity id="footer" position="0 appHeight-40" rect="color: #333; width: 1080; height: 80"></entity>
</scene>
"#;

fn print_tree(app: &App, entity: EntityId, depth: usize) {
    let id = app.entity_id(entity).unwrap_or("-");
    let position = app.container_node(entity).map(|n| n.position).unwrap_or_default();
    println!(
        "{:indent$}{id} ({entity}) at ({:.0}, {:.0}) [{}]",
        "",
        position.x,
        position.y,
        app.component_names(entity).join(", "),
        indent = depth * 2
    );
    for &child in app.children(entity) {
        print_tree(app, child, depth + 1);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut handle = render(SCENE, RenderOptions::new())?;
    let root = handle.root().expect("no preloads, so the tree is built right away");

    println!("── built ──");
    print_tree(handle.app(), root, 0);

    // New children are laid out as they arrive.
    let app = handle.app_mut();
    let menu = app.find("menu").expect("menu is declared in the scene");
    let quit = app.spawn(Some("quit"))?;
    app.set_component(quit, "text", "text: Quit; color: #f44")?;
    app.add_child(menu, quit)?;

    println!("── quit added ──");
    print_tree(app, root, 0);

    // Despawning takes the subtree and its containers with it.
    app.despawn(menu)?;
    println!("── menu despawned ──");
    print_tree(app, root, 0);
    println!("entities: {}, stage nodes: {}", app.entity_count(), app.stage().len());
    Ok(())
}
