//! Collisions — two boxes sliding through each other.
//!
//! A ticking `mover` component pushes the left box to the right every frame;
//! the `collider` on it reports when the boxes start and stop overlapping.
//!
//! Run with: `cargo run -p vellum --example collisions`

use vellum::attr::parse_number;
use vellum::prelude::*;

// ── Mover component ─────────────────────────────────────────────────────

/// `mover="0.1"`: moves the container right by `speed` units per millisecond.
#[derive(Default)]
struct Mover {
    speed: f32,
}

impl Component for Mover {
    fn update(&mut self, _app: &mut App, _entity: EntityId, data: &str) -> Result<()> {
        self.speed = parse_number(data).unwrap_or(0.0);
        Ok(())
    }

    fn tick(&mut self, app: &mut App, entity: EntityId, dt_ms: f32) -> Result<()> {
        app.container_node_mut(entity)?.position.x += self.speed * dt_ms;
        Ok(())
    }

    fn wants_tick(&self) -> bool {
        true
    }
}

const SCENE: &str = r#"
<scene width="400" height="200">
  <entity id="runner" position="0 80" collider="group: boxes"
          rect="color: #e04040; width: 40; height: 40"></entity>
  <entity id="wall" position="200 80" collider="group: boxes"
          rect="color: #4060e0; width: 40; height: 40"></entity>
</scene>
"#;

fn main() -> Result<()> {
    env_logger::init();

    let mut handle = render_with(
        SCENE,
        RenderOptions::new().with_size(400.0, 200.0),
        Box::new(MemorySource::new()),
    )?;

    // Custom components can be attached after the build.
    let app = handle.app_mut();
    app.register::<Mover>("mover");
    let runner = app.find("runner").expect("runner is declared in the scene");
    app.set_component(runner, "mover", "0.1")?;

    for event in ["collisionstart", "collisionend"] {
        app.on(runner, event, move |app, entity, payload| {
            let x = app.container_node(entity).map_or(0.0, |n| n.position.x);
            println!("{event:<15} x = {x:>6.1}  other = {:?}", payload.node());
            Ok(())
        })?;
    }

    for _ in 0..300 {
        handle.step(16.0)?;
    }
    Ok(())
}
