//! End-to-end behavior of scenes built from markup.

use std::cell::RefCell;
use std::rc::Rc;

use vellum::prelude::*;

type CallLog = Rc<RefCell<Vec<String>>>;

/// Records every lifecycle call into a shared log.
struct Recorder {
    name: &'static str,
    log: CallLog,
}

impl Component for Recorder {
    fn init(&mut self, _app: &mut App, _entity: EntityId, data: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("{}.init({data})", self.name));
        Ok(())
    }

    fn update(&mut self, _app: &mut App, _entity: EntityId, data: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("{}.update({data})", self.name));
        Ok(())
    }
}

fn register_recorder(app: &mut App, name: &'static str, log: &CallLog) {
    let log = log.clone();
    app.registry_mut().register_with(name, move || {
        Box::new(Recorder {
            name,
            log: log.clone(),
        })
    });
}

fn render_memory(markup: &str) -> RenderHandle {
    render_with(markup, RenderOptions::new(), Box::new(MemorySource::new())).unwrap()
}

// ── Components ──────────────────────────────────────────────────────

#[test]
fn reapplying_a_component_keeps_one_instance() {
    let log = CallLog::default();
    let mut app = App::new();
    register_recorder(&mut app, "opacity", &log);
    let entity = app.spawn(None).unwrap();

    app.set_component(entity, "opacity", "0.5").unwrap();
    app.set_component(entity, "opacity", "0.5").unwrap();

    assert_eq!(app.component_names(entity), vec!["opacity"]);
    assert_eq!(
        *log.borrow(),
        vec!["opacity.init(0.5)", "opacity.update(0.5)", "opacity.update(0.5)"]
    );
}

#[test]
fn builtin_opacity_is_idempotent() {
    let mut app = App::new();
    let entity = app.spawn(None).unwrap();
    app.set_component(entity, "opacity", "0.5").unwrap();
    app.set_component(entity, "opacity", "0.5").unwrap();
    assert_eq!(app.component_names(entity), vec!["opacity"]);
    assert_eq!(app.container_node(entity).unwrap().alpha, 0.5);
}

#[test]
fn attributes_apply_left_to_right() {
    let log = CallLog::default();
    let mut app = App::new();
    register_recorder(&mut app, "a", &log);
    register_recorder(&mut app, "b", &log);

    let document = vellum::markup::Document::parse(r#"<scene a="1" b="2"></scene>"#).unwrap();
    vellum::scene_builder::build(&mut app, document.find("scene").unwrap()).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["a.init(1)", "a.update(1)", "b.init(2)", "b.update(2)"]
    );
}

#[test]
fn unknown_components_are_ignored() {
    let handle = render_memory(r#"<scene><entity id="e" sparkle="lots" opacity="1"></entity></scene>"#);
    let entity = handle.app().find("e").unwrap();
    assert!(!handle.app().has_component(entity, "sparkle"));
    assert_eq!(handle.app().component_names(entity), vec!["opacity"]);
}

#[test]
fn component_errors_stop_the_build() {
    let result = render_with(
        r#"<scene><entity sprite="texture: idle"></entity></scene>"#,
        RenderOptions::new(),
        Box::new(MemorySource::new()),
    );
    assert!(matches!(result, Err(SceneError::MissingAttribute { .. })));
}

// ── Events ──────────────────────────────────────────────────────────

#[test]
fn handlers_run_in_registration_order() {
    let mut app = App::new();
    let entity = app.spawn(None).unwrap();
    let log = CallLog::default();
    for name in ["h1", "h2"] {
        let log = log.clone();
        app.on(entity, "ping", move |_, _, payload| {
            log.borrow_mut()
                .push(format!("{name}:{}", payload.text().unwrap_or("")));
            Ok(())
        })
        .unwrap();
    }

    app.emit(entity, "ping", Payload::Text("x".into())).unwrap();
    assert_eq!(*log.borrow(), vec!["h1:x", "h2:x"]);
}

// ── Collisions ──────────────────────────────────────────────────────

fn collision_scene() -> (RenderHandle, EntityId, CallLog) {
    let mut handle = render_memory(
        r#"<scene>
             <entity id="a" rect="width: 10; height: 10" position="0 0" collider></entity>
             <entity id="b" rect="width: 10; height: 10" position="5 5" collider></entity>
           </scene>"#,
    );
    let a = handle.app().find("a").unwrap();
    let log = CallLog::default();
    for event in ["collisionstart", "collisionend"] {
        let log = log.clone();
        handle
            .app_mut()
            .on(a, event, move |app, _, payload| {
                let other = payload
                    .node()
                    .and_then(|node| app.stage().get(node))
                    .and_then(|node| node.owner)
                    .and_then(|owner| app.entity_id(owner))
                    .unwrap_or("?");
                log.borrow_mut().push(format!("{event}:{other}"));
                Ok(())
            })
            .unwrap();
    }
    (handle, a, log)
}

#[test]
fn collision_start_and_end_fire_once() {
    let (mut handle, _, log) = collision_scene();
    let b = handle.app().find("b").unwrap();

    // Boxes (0,0,10,10) and (5,5,10,10).
    handle.step(16.0).unwrap();
    handle.step(16.0).unwrap();
    assert_eq!(*log.borrow(), vec!["collisionstart:b"]);

    // Second box moves to (20,20,10,10).
    handle.app_mut().set_component(b, "position", "20 20").unwrap();
    handle.step(16.0).unwrap();
    handle.step(16.0).unwrap();
    assert_eq!(*log.borrow(), vec!["collisionstart:b", "collisionend:b"]);

    // The payload is the other entity's container.
    let b_container = handle.app().container(b).unwrap();
    let a = handle.app().find("a").unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    handle
        .app_mut()
        .on(a, "collisionstart", move |_, _, payload| {
            sink.borrow_mut().push(payload.clone());
            Ok(())
        })
        .unwrap();
    handle.app_mut().set_component(b, "position", "5 5").unwrap();
    handle.step(16.0).unwrap();
    handle.step(16.0).unwrap();
    assert_eq!(*seen.borrow(), vec![Payload::Node(b_container)]);
}

#[test]
fn touching_edges_do_not_collide() {
    assert!(!Aabb::new(0.0, 0.0, 10.0, 10.0).overlaps(&Aabb::new(10.0, 0.0, 10.0, 10.0)));

    let (mut handle, _, log) = collision_scene();
    let b = handle.app().find("b").unwrap();
    handle.app_mut().set_component(b, "position", "10 0").unwrap();
    handle.step(16.0).unwrap();
    assert!(log.borrow().is_empty());
}

// ── Tree ────────────────────────────────────────────────────────────

#[test]
fn tree_matches_declaration() {
    let handle = render_memory(
        r#"<scene id="root" position="0 0">
             <entity id="outer" position="10 0">
               <entity id="inner" position="0 10"></entity>
             </entity>
             <entity id="sibling" position="20 0"></entity>
           </scene>"#,
    );
    let app = handle.app();
    let root = handle.root().unwrap();
    let outer = app.find("outer").unwrap();
    let inner = app.find("inner").unwrap();
    let sibling = app.find("sibling").unwrap();

    assert_eq!(app.children(root), &[outer, sibling]);
    assert_eq!(app.children(outer), &[inner]);
    assert_eq!(app.parent(inner), Some(outer));

    let container = |e| app.container(e).unwrap();
    assert_eq!(app.stage().children(container(root)), &[container(outer), container(sibling)]);
    assert_eq!(app.stage().parent(container(inner)), Some(container(outer)));
    assert_eq!(app.stage().parent(container(root)), Some(app.stage().root()));
    assert_eq!(app.container_node(inner).unwrap().position, Vec2::new(0.0, 10.0));
}

#[test]
fn layout_places_children_as_they_arrive() {
    let handle = render_memory(
        r#"<scene layout="0 30">
             <entity id="a"></entity><entity id="b"></entity><entity id="c"></entity>
           </scene>"#,
    );
    let app = handle.app();
    let y = |id| app.container_node(app.find(id).unwrap()).unwrap().position.y;
    assert_eq!((y("a"), y("b"), y("c")), (0.0, 30.0, 60.0));
}

// ── Assets and readiness ────────────────────────────────────────────

#[test]
fn sprites_wait_for_preloaded_atlases() {
    let atlas = Resource::image("ui.json", 64.0, 64.0)
        .with_frame("button", Aabb::new(0.0, 0.0, 32.0, 16.0))
        .with_frame("button-down", Aabb::new(0.0, 16.0, 32.0, 16.0));
    let mut handle = render_with(
        r#"<scene>
             <asset id="ui" src="ui.json"></asset>
             <entity id="btn" sprite="src: #ui; texture: button; click: button-down" interactive></entity>
           </scene>"#,
        RenderOptions::new().with_size(200.0, 200.0),
        Box::new(MemorySource::new().with(atlas)),
    )
    .unwrap();
    assert!(!handle.is_ready());

    handle.step(16.0).unwrap();
    assert!(handle.is_ready());

    let btn = handle.app().find("btn").unwrap();
    let frame = |handle: &RenderHandle| match &handle.app().object_node(btn).unwrap().kind {
        NodeKind::Sprite {
            texture: Some(texture),
        } => texture.frame.clone(),
        other => panic!("expected a textured sprite, got {other:?}"),
    };
    assert_eq!(frame(&handle).as_deref(), Some("button"));

    let hit = handle.pointer_down(Vec2::new(5.0, 5.0)).unwrap();
    assert_eq!(hit, Some(btn));
    assert_eq!(frame(&handle).as_deref(), Some("button-down"));

    handle.pointer_up(Vec2::new(5.0, 5.0)).unwrap();
    assert_eq!(frame(&handle).as_deref(), Some("button"));
}

#[test]
fn ready_callbacks_run_once() {
    let source = MemorySource::new().with(Resource::image("bg.png", 4.0, 4.0));
    let mut handle = render_with(
        r#"<scene><asset src="bg.png"></asset></scene>"#,
        RenderOptions::new(),
        Box::new(source),
    )
    .unwrap();

    let count = Rc::new(RefCell::new(0));
    let counter = count.clone();
    handle.on_ready(move |_| *counter.borrow_mut() += 1);
    for _ in 0..3 {
        handle.step(16.0).unwrap();
    }
    assert_eq!(*count.borrow(), 1);

    // Registering after readiness runs right away.
    let counter = count.clone();
    handle.on_ready(move |_| *counter.borrow_mut() += 1);
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn animations_play_to_completion() {
    let mut handle = render_memory(
        r#"<scene>
             <entity id="fade" opacity="0"
                     animation="property: container.alpha; from: 0; to: 1; dur: 100; easing: linear; autoplay: true">
             </entity>
           </scene>"#,
    );
    let fade = handle.app().find("fade").unwrap();
    handle.step(50.0).unwrap();
    let alpha = handle.app().container_node(fade).unwrap().alpha;
    assert!((alpha - 0.5).abs() < 1e-4, "alpha = {alpha}");

    handle.step(100.0).unwrap();
    assert_eq!(handle.app().container_node(fade).unwrap().alpha, 1.0);
    let playing = handle
        .app_mut()
        .with_component::<Animation, _>(fade, "animation", |a, _| a.is_playing())
        .unwrap();
    assert!(!playing);
}
