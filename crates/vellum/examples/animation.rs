//! Animation — tweens started by autoplay and by events.
//!
//! The panel fades in on its own; the badge spins once a `"reveal"` event is
//! emitted on it.
//!
//! Run with: `cargo run -p vellum --example animation`

use vellum::prelude::*;

const SCENE: &str = r#"
<scene>
  <entity id="panel" opacity="0" rect="color: #2a2a40; width: 600; height: 300"
          animation="property: container.alpha; from: 0; to: 1; dur: 400; easing: easeOutCubic; autoplay: true">
  </entity>
  <entity id="badge" position="appWidth/2 appHeight/2" rect="color: #f0c040; width: 80; height: 80"
          animation="property: container.rotation; from: 0; to: 360; dur: 800; easing: easeInOutSine; startEvents: reveal">
  </entity>
</scene>
"#;

fn main() -> Result<()> {
    env_logger::init();

    let mut handle = render(SCENE, RenderOptions::new())?;
    let panel = handle.app().find("panel").expect("panel is declared in the scene");
    let badge = handle.app().find("badge").expect("badge is declared in the scene");

    for frame in 0..90 {
        if frame == 30 {
            handle.app_mut().emit(badge, "reveal", Payload::None)?;
        }
        handle.step(16.0)?;

        if frame % 10 == 0 {
            let app = handle.app();
            let alpha = app.container_node(panel).map_or(0.0, |n| n.alpha);
            let degrees = app.container_node(badge).map_or(0.0, |n| n.rotation.to_degrees());
            println!("frame {frame:>2}: panel alpha {alpha:.2}, badge rotation {degrees:>6.1}°");
        }
    }
    Ok(())
}
