use bevy::{
    prelude::*,
    window::{
        PrimaryWindow,
        SystemCursorIcon,
    },
    winit::cursor::CursorIcon,
};

use bevy_avatar_guide::{
    anchor::ScreenAnchor,
    app::{
        viewer_app,
        AvatarGuideConfig,
    },
    pointer::{
        AvatarInteraction,
        InteractionKind,
        PointerAffordance,
    },
    pose::{
        Page,
        ViewContext,
    },
    scene::{
        start_avatar_loop,
        stop_avatar_loop,
        AvatarLoop,
    },
};


#[derive(Component)]
struct HoloMenu;

#[derive(Component)]
struct ToastText;

#[derive(Resource, Default)]
struct Toast {
    timer: Timer,
}


fn main() -> anyhow::Result<()> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let mut app = viewer_app(None, None)?;

    let keybinds = app
        .world()
        .get_resource::<AvatarGuideConfig>()
        .is_some_and(|config| config.keybinds);

    app.init_resource::<Toast>();
    app.add_systems(Startup, setup_overlay);
    app.add_systems(
        Update,
        (
            handle_interactions,
            fade_toast,
            show_holo_menu,
            sync_cursor_icon,
        ),
    );

    if keybinds {
        app.add_systems(PreUpdate, press_keys);
    }

    match app.run() {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("viewer exited with code {code}"),
    }
}


fn setup_overlay(mut commands: Commands) {
    commands
        .spawn((
            Name::new("holo_menu"),
            HoloMenu,
            ScreenAnchor::default(),
            Node {
                position_type: PositionType::Absolute,
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(6.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0, 0.8)),
        ))
        .with_children(|menu| {
            for page in [Page::Schools, Page::Process, Page::Packages] {
                menu.spawn((
                    Text::new(format!("{page:?}")),
                    TextFont {
                        font_size: 16.0,
                        ..default()
                    },
                    TextColor(Color::srgb_u8(0xfc, 0xa5, 0xa5)),
                ));
            }
        });

    commands.spawn((
        Name::new("toast"),
        ToastText,
        Text::default(),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(32.0),
            left: Val::Px(32.0),
            ..default()
        },
    ));
}


fn press_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut view: ResMut<ViewContext>,
    loop_state: Res<State<AvatarLoop>>,
    mut next_loop: ResMut<NextState<AvatarLoop>>,
    mut interactions: EventWriter<AvatarInteraction>,
) {
    let pages = [
        (KeyCode::Digit1, Page::Home),
        (KeyCode::Digit2, Page::Schools),
        (KeyCode::Digit3, Page::Process),
        (KeyCode::Digit4, Page::Packages),
        (KeyCode::Digit5, Page::News),
        (KeyCode::Digit6, Page::About),
    ];
    for (key, page) in pages {
        if keys.just_pressed(key) && view.page != page {
            info!("page {page:?}");
            view.page = page;
        }
    }

    if keys.just_pressed(KeyCode::KeyC) {
        interactions.write(AvatarInteraction::chat_toggle());
    }

    if keys.just_pressed(KeyCode::Space) {
        match loop_state.get() {
            AvatarLoop::Running => stop_avatar_loop(&mut next_loop),
            AvatarLoop::Stopped => start_avatar_loop(&mut next_loop),
        }
    }
}

fn handle_interactions(
    mut interactions: EventReader<AvatarInteraction>,
    mut view: ResMut<ViewContext>,
    mut toast: ResMut<Toast>,
    mut toast_text: Query<&mut Text, With<ToastText>>,
) {
    for interaction in interactions.read() {
        match interaction.kind {
            InteractionKind::ChatToggle => {
                view.chat_open = !view.chat_open;
                info!("chat {}", if view.chat_open { "opened" } else { "closed" });
            }
            InteractionKind::Touch => {
                let Some(message) = interaction.message.as_deref() else {
                    continue;
                };

                for mut text in &mut toast_text {
                    text.0 = message.to_string();
                }
                toast.timer = Timer::from_seconds(3.0, TimerMode::Once);
            }
            kind => debug!("{kind:?} on {:?}", interaction.part),
        }
    }
}

fn fade_toast(
    time: Res<Time>,
    mut toast: ResMut<Toast>,
    mut toast_text: Query<&mut Text, With<ToastText>>,
) {
    if toast.timer.tick(time.delta()).just_finished() {
        for mut text in &mut toast_text {
            text.0.clear();
        }
    }
}

fn show_holo_menu(
    view: Res<ViewContext>,
    mut menus: Query<&mut Visibility, With<HoloMenu>>,
) {
    if !view.is_changed() {
        return;
    }

    for mut visibility in &mut menus {
        *visibility = if view.page == Page::Home {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

fn sync_cursor_icon(
    mut commands: Commands,
    affordance: Res<PointerAffordance>,
    window: Query<Entity, With<PrimaryWindow>>,
) {
    if !affordance.is_changed() {
        return;
    }

    let Ok(window) = window.single() else {
        return;
    };

    let icon = match *affordance {
        PointerAffordance::Default => SystemCursorIcon::Default,
        PointerAffordance::Grab => SystemCursorIcon::Grab,
        PointerAffordance::Grabbing => SystemCursorIcon::Grabbing,
    };
    commands.entity(window).insert(CursorIcon::System(icon));
}
