use std::time::Duration;

use bevy::{
    prelude::*,
    state::app::StatesPlugin,
    time::TimeUpdateStrategy,
    transform::TransformPlugin,
    MinimalPlugins,
};

use bevy_avatar_guide::{
    anchor::ScreenAnchor,
    camera::{
        AvatarCamera,
        CameraView,
        SceneViewport,
    },
    gesture::{
        AnimationState,
        Gesture,
    },
    pointer::{
        AvatarInteraction,
        InteractionKind,
        PointerAffordance,
        PointerInput,
        PointerState,
    },
    pose::{
        Page,
        ViewContext,
    },
    rig::{
        AvatarRig,
        AvatarRigSettings,
        RigPart,
    },
    scene::{
        start_avatar_loop,
        stop_avatar_loop,
        AvatarLoop,
        AvatarSceneSettings,
    },
    BevyAvatarGuidePlugin,
};


#[derive(Resource, Default)]
struct Recorded(Vec<AvatarInteraction>);

fn record_interactions(
    mut interactions: EventReader<AvatarInteraction>,
    mut recorded: ResMut<Recorded>,
) {
    recorded.0.extend(interactions.read().cloned());
}

fn avatar_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, AssetPlugin::default(), TransformPlugin, StatesPlugin));
    app.init_asset::<Mesh>();
    app.init_asset::<StandardMaterial>();
    app.init_asset::<Image>();

    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(1.0 / 60.0)));
    app.insert_resource(AvatarSceneSettings {
        headless: true,
        surface_size: Vec2::new(800.0, 600.0),
        ..default()
    });
    app.insert_resource(AvatarRigSettings {
        texture_seed: Some(7),
        ..default()
    });

    app.add_plugins(BevyAvatarGuidePlugin);

    app.init_resource::<Recorded>();
    app.add_systems(Last, record_interactions);

    app.update();
    app.update();
    app
}

fn view(app: &mut App) -> CameraView {
    let viewport = *app.world().resource::<SceneViewport>();
    let world = app.world_mut();
    let (projection, transform) = world
        .query_filtered::<(&Projection, &GlobalTransform), With<AvatarCamera>>()
        .single(world)
        .unwrap();
    CameraView::new(projection, transform, viewport).unwrap()
}

fn pixel_of(app: &mut App, entity: Entity) -> Vec2 {
    let position = app.world().get::<GlobalTransform>(entity).unwrap().translation();
    view(app).world_to_screen(position).unwrap()
}

fn send(app: &mut App, inputs: &[PointerInput]) {
    for input in inputs {
        app.world_mut().send_event(*input);
    }
    app.update();
}

fn touches(app: &App) -> Vec<AvatarInteraction> {
    app.world()
        .resource::<Recorded>()
        .0
        .iter()
        .filter(|interaction| interaction.kind == InteractionKind::Touch)
        .cloned()
        .collect()
}

fn named(app: &mut App, name: &str) -> Entity {
    let world = app.world_mut();
    world
        .query::<(Entity, &Name)>()
        .iter(world)
        .find(|(_, entity_name)| entity_name.as_str() == name)
        .map(|(entity, _)| entity)
        .unwrap()
}

fn click(app: &mut App, entity: Entity) {
    let position = pixel_of(app, entity);
    send(
        app,
        &[
            PointerInput::Pressed { position },
            PointerInput::Released { position },
        ],
    );
}

fn offset_x(app: &App) -> f32 {
    let rig = *app.world().resource::<AvatarRig>();
    app.world().get::<Transform>(rig.offset).unwrap().translation.x
}


#[test]
fn headless_surface_sizes_viewport() {
    let app = avatar_app();
    assert_eq!(app.world().resource::<SceneViewport>().size, Vec2::new(800.0, 600.0));
}

#[test]
fn clicks_on_head_each_emit_one_touch() {
    let mut app = avatar_app();
    let head = app.world().resource::<AvatarRig>().part(RigPart::Head);

    for _ in 0..3 {
        let position = pixel_of(&mut app, head);
        send(
            &mut app,
            &[
                PointerInput::Pressed { position },
                PointerInput::Released { position },
            ],
        );
    }

    let touches = touches(&app);
    assert_eq!(touches.len(), 3);
    for touch in touches {
        assert_eq!(touch.part, Some(RigPart::Head));
        assert_eq!(touch.message.as_deref(), Some("You touched my head!"));
    }

    assert_eq!(app.world().resource::<AnimationState>().gesture, Gesture::Wave);
    assert!(!app.world().resource::<PointerState>().dragging);
}

#[test]
fn release_over_left_hand_emits_one_left_hand_touch() {
    let mut app = avatar_app();
    let hand = app.world().resource::<AvatarRig>().part(RigPart::LeftHand);

    click(&mut app, hand);

    let parts: Vec<_> = touches(&app).into_iter().map(|touch| touch.part).collect();
    assert_eq!(parts, vec![Some(RigPart::LeftHand)]);
    assert_eq!(app.world().resource::<AnimationState>().gesture, Gesture::Wave);
}

#[test]
fn release_over_untagged_mesh_is_silent() {
    let mut app = avatar_app();

    for name in ["left_eye", "logo"] {
        let entity = named(&mut app, name);
        click(&mut app, entity);
        assert!(touches(&app).is_empty(), "{name} emitted a touch");
    }
    assert_eq!(app.world().resource::<AnimationState>().gesture, Gesture::Idle);
}

#[test]
fn release_over_empty_space_is_silent() {
    let mut app = avatar_app();
    let position = Vec2::new(8.0, 8.0);

    send(
        &mut app,
        &[
            PointerInput::Pressed { position },
            PointerInput::Released { position },
        ],
    );

    assert!(touches(&app).is_empty());
    assert_eq!(app.world().resource::<AnimationState>().gesture, Gesture::Idle);
    assert_eq!(*app.world().resource::<PointerAffordance>(), PointerAffordance::Default);
}

#[test]
fn hover_affordance_tracks_hits() {
    let mut app = avatar_app();
    let body = app.world().resource::<AvatarRig>().part(RigPart::Body);

    let position = pixel_of(&mut app, body);
    send(&mut app, &[PointerInput::Moved { position }]);
    assert_eq!(*app.world().resource::<PointerAffordance>(), PointerAffordance::Grab);

    send(&mut app, &[PointerInput::Moved { position: Vec2::new(790.0, 590.0) }]);
    assert_eq!(*app.world().resource::<PointerAffordance>(), PointerAffordance::Default);

    send(&mut app, &[PointerInput::Pressed { position }]);
    assert_eq!(*app.world().resource::<PointerAffordance>(), PointerAffordance::Grabbing);
}

#[test]
fn drag_accumulates_yaw_and_leave_cancels() {
    let mut app = avatar_app();

    send(
        &mut app,
        &[
            PointerInput::Pressed { position: Vec2::new(100.0, 300.0) },
            PointerInput::Moved { position: Vec2::new(130.0, 300.0) },
            PointerInput::Moved { position: Vec2::new(160.0, 300.0) },
        ],
    );
    let state = *app.world().resource::<PointerState>();
    assert!(state.dragging);
    assert!((state.target_yaw - 60.0 * 0.005).abs() < 1e-5);

    send(&mut app, &[PointerInput::Left]);
    send(&mut app, &[PointerInput::Moved { position: Vec2::new(400.0, 300.0) }]);

    let state = *app.world().resource::<PointerState>();
    assert!(!state.dragging);
    assert!((state.target_yaw - 60.0 * 0.005).abs() < 1e-5);
}

#[test]
fn page_switch_glides_without_jumping() {
    let mut app = avatar_app();
    assert!(offset_x(&app).abs() < 1e-6);

    app.world_mut().resource_mut::<ViewContext>().page = Page::Schools;

    let mut previous = offset_x(&app);
    for _ in 0..150 {
        app.update();
        let current = offset_x(&app);

        assert!(current <= previous);
        assert!((current - previous).abs() <= (-2.8 - previous).abs() * 0.08 + 1e-5);
        previous = current;
    }
    assert!((previous + 2.8).abs() < 1e-3);

    app.world_mut().resource_mut::<ViewContext>().page = Page::Home;
    app.world_mut().resource_mut::<ViewContext>().chat_open = true;
    for _ in 0..150 {
        app.update();
    }
    assert!((offset_x(&app) + 2.0).abs() < 1e-3);
}

#[test]
fn stopping_freezes_pose_and_cancels_drag() {
    let mut app = avatar_app();

    send(&mut app, &[PointerInput::Pressed { position: Vec2::new(400.0, 300.0) }]);
    assert!(app.world().resource::<PointerState>().dragging);

    stop_avatar_loop(&mut app.world_mut().resource_mut::<NextState<AvatarLoop>>());
    app.update();
    assert_eq!(*app.world().resource::<State<AvatarLoop>>().get(), AvatarLoop::Stopped);
    assert!(!app.world().resource::<PointerState>().dragging);
    assert_eq!(*app.world().resource::<PointerAffordance>(), PointerAffordance::Default);

    app.world_mut().resource_mut::<ViewContext>().page = Page::About;
    let frozen = offset_x(&app);
    for _ in 0..10 {
        app.update();
    }
    assert_eq!(offset_x(&app), frozen);

    start_avatar_loop(&mut app.world_mut().resource_mut::<NextState<AvatarLoop>>());
    app.update();
    app.update();
    assert!(offset_x(&app) < frozen);
}

#[test]
fn anchored_node_follows_emitter() {
    let mut app = avatar_app();
    let anchor = app.world_mut().spawn(ScreenAnchor::default()).id();

    app.update();

    let emitter = app.world().resource::<AvatarRig>().emitter;
    let emitter_position = app.world().get::<GlobalTransform>(emitter).unwrap().translation();
    let offset = app.world().get::<ScreenAnchor>(anchor).unwrap().offset;
    let expected = view(&mut app).world_to_screen(emitter_position + offset).unwrap();

    let node = app.world().get::<Node>(anchor).unwrap();
    let (Val::Px(left), Val::Px(top)) = (node.left, node.top) else {
        panic!("anchor did not position the node: {node:?}");
    };
    assert!((Vec2::new(left, top) - expected).length() < 1e-2);
}
