use bevy::{
    pbr::{
        DistanceFog,
        FogFalloff,
    },
    prelude::*,
    transform::TransformSystem,
    window::{
        PrimaryWindow,
        WindowResized,
    },
};

use crate::{
    camera::{
        AvatarCamera,
        SceneViewport,
    },
    pointer::{
        PointerAffordance,
        PointerState,
    },
};

pub mod lighting;


pub const BACKDROP: Color = Color::srgb(15.0 / 255.0, 23.0 / 255.0, 42.0 / 255.0);


/// Whether the avatar's per-frame systems participate in the frame loop.
#[derive(States, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub enum AvatarLoop {
    #[default]
    Running,
    Stopped,
}

#[derive(SystemSet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AvatarSystems {
    Input,
    Gesture,
    Pose,
    Anchor,
}

pub fn start_avatar_loop(next: &mut NextState<AvatarLoop>) {
    next.set(AvatarLoop::Running);
}

pub fn stop_avatar_loop(next: &mut NextState<AvatarLoop>) {
    next.set(AvatarLoop::Stopped);
}


#[derive(Resource, Clone, Debug, Reflect)]
#[reflect(Resource)]
pub struct AvatarSceneSettings {
    /// run without a primary window, sizing the viewport from `surface_size`
    pub headless: bool,
    pub surface_size: Vec2,
    pub fov_degrees: f32,
    pub camera_distance: f32,
    pub fog_density: f32,
}

impl Default for AvatarSceneSettings {
    fn default() -> Self {
        Self {
            headless: false,
            surface_size: Vec2::new(1920.0, 1080.0),
            fov_degrees: 45.0,
            camera_distance: 8.0,
            fog_density: 0.03,
        }
    }
}


pub struct AvatarScenePlugin;

impl Plugin for AvatarScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AvatarSceneSettings>();
        app.init_resource::<SceneViewport>();
        app.register_type::<AvatarSceneSettings>();
        app.register_type::<SceneViewport>();
        app.register_type::<AvatarCamera>();

        app.add_event::<WindowResized>();
        app.insert_resource(ClearColor(BACKDROP));

        app.init_state::<AvatarLoop>();
        app.configure_sets(
            Update,
            (
                AvatarSystems::Input,
                AvatarSystems::Gesture,
                AvatarSystems::Pose,
            )
                .chain()
                .run_if(in_state(AvatarLoop::Running)),
        );
        app.configure_sets(
            PostUpdate,
            AvatarSystems::Anchor
                .after(TransformSystem::TransformPropagate)
                .run_if(in_state(AvatarLoop::Running)),
        );

        app.add_plugins(lighting::AvatarLightingPlugin);

        app.add_systems(Startup, (check_render_surface, setup_camera).chain());
        app.add_systems(PreUpdate, track_viewport_resize);
        app.add_systems(OnExit(AvatarLoop::Running), release_pointer);
    }
}


/// Sizes the viewport from the primary window, or from settings when headless.
/// A missing window outside headless mode ends the app with an error.
pub fn check_render_surface(
    settings: Res<AvatarSceneSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut viewport: ResMut<SceneViewport>,
    mut exit: EventWriter<AppExit>,
) {
    if settings.headless {
        viewport.size = settings.surface_size;
        return;
    }

    match windows.single() {
        Ok(window) => {
            viewport.size = Vec2::new(window.width(), window.height());
            info!("render surface {}x{}", viewport.size.x, viewport.size.y);
        }
        Err(err) => {
            error!("avatar scene requires a primary window: {err}");
            exit.write(AppExit::error());
        }
    }
}

pub fn setup_camera(
    mut commands: Commands,
    settings: Res<AvatarSceneSettings>,
    viewport: Res<SceneViewport>,
) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: settings.fov_degrees.to_radians(),
            near: 0.1,
            far: 100.0,
            aspect_ratio: viewport.aspect_ratio(),
        }),
        DistanceFog {
            color: BACKDROP,
            falloff: FogFalloff::Exponential {
                density: settings.fog_density,
            },
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, settings.camera_distance).looking_at(Vec3::ZERO, Vec3::Y),
        AvatarCamera,
        Name::new("avatar_camera"),
    ));
}

pub fn track_viewport_resize(
    mut resized: EventReader<WindowResized>,
    primary: Query<Entity, With<PrimaryWindow>>,
    mut viewport: ResMut<SceneViewport>,
) {
    let primary = primary.single().ok();

    for event in resized.read() {
        if primary.is_some_and(|primary| primary != event.window) {
            continue;
        }

        let size = Vec2::new(event.width, event.height);
        if size.x > 0.0 && size.y > 0.0 && viewport.size != size {
            debug!("viewport resized to {}x{}", size.x, size.y);
            viewport.size = size;
        }
    }
}

fn release_pointer(
    mut pointer: ResMut<PointerState>,
    mut affordance: ResMut<PointerAffordance>,
) {
    pointer.cancel_drag();
    *affordance = PointerAffordance::Default;
}
