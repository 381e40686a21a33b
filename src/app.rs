use anyhow::ensure;
use bevy::{
    app::AppExit,
    prelude::*,
    winit::{WakeUp, WinitPlugin},
};
use bevy_args::{parse_args, Deserialize, Parser, Serialize};

#[cfg(feature = "viewer")]
use bevy_egui::EguiPlugin;
#[cfg(feature = "viewer")]
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use crate::{
    pointer::AvatarPointerSettings,
    pose::{
        AvatarPoseSettings,
        Page,
        ViewContext,
    },
    rig::AvatarRigSettings,
    scene::AvatarSceneSettings,
    texture::SpeckleSettings,
    BevyAvatarGuidePlugin,
};


#[derive(Clone, Debug, Resource, Serialize, Deserialize, Parser, Reflect)]
#[command(about = "bevy_avatar_guide viewer", version, long_about = None)]
#[reflect(Resource)]
pub struct AvatarGuideConfig {
    /// enable the bevy inspector
    #[arg(long, action = clap::ArgAction::Set, default_value = "false")]
    pub editor: bool,

    /// no window will be shown
    #[arg(long, default_value = "false")]
    pub headless: bool,

    /// enable closing the window with the escape key (doesn't work in web)
    #[arg(long, action = clap::ArgAction::Set, default_value = "true")]
    pub press_esc_close: bool,

    #[arg(long, default_value = "1920.0")]
    pub width: f32,

    #[arg(long, default_value = "1080.0")]
    pub height: f32,

    /// window title
    #[arg(long, default_value = "bevy_avatar_guide")]
    pub name: String,

    /// number keys switch pages, `c` toggles chat, space pauses the avatar
    #[arg(long, action = clap::ArgAction::Set, default_value = "true")]
    pub keybinds: bool,

    /// page shown at startup
    #[arg(long, value_enum, default_value_t = Page::Home)]
    pub page: Page,

    #[arg(long, default_value = "false")]
    pub chat_open: bool,

    /// radians of avatar yaw per dragged pixel
    #[arg(long, default_value = "0.005")]
    pub drag_sensitivity: f32,

    /// damping factor of the horizontal page offset
    #[arg(long, default_value = "0.08")]
    pub offset_smoothing: f32,

    /// damping factor of yaw, head and limbs
    #[arg(long, default_value = "0.1")]
    pub follow_smoothing: f32,

    #[arg(long, default_value = "1.0")]
    pub bob_frequency: f32,

    #[arg(long, default_value = "0.1")]
    pub bob_amplitude: f32,

    /// fixed seed for the procedural shell texture
    #[arg(long)]
    pub texture_seed: Option<u64>,

    #[arg(long, default_value = "5000")]
    pub speckle_dots: usize,

    /// text printed on the shirt logo
    #[arg(long, default_value = "TaoLi")]
    pub logo_text: String,
}

impl Default for AvatarGuideConfig {
    fn default() -> AvatarGuideConfig {
        AvatarGuideConfig {
            editor: false,
            headless: false,
            press_esc_close: true,
            width: 1920.0,
            height: 1080.0,
            name: "bevy_avatar_guide".to_string(),
            keybinds: true,
            page: Page::Home,
            chat_open: false,
            drag_sensitivity: 0.005,
            offset_smoothing: 0.08,
            follow_smoothing: 0.1,
            bob_frequency: 1.0,
            bob_amplitude: 0.1,
            texture_seed: None,
            speckle_dots: 5000,
            logo_text: "TaoLi".to_string(),
        }
    }
}

impl AvatarGuideConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.width.is_finite() && self.height.is_finite() && self.width >= 1.0 && self.height >= 1.0,
            "render surface must be at least 1x1, got {}x{}",
            self.width,
            self.height,
        );
        ensure!(
            self.offset_smoothing > 0.0 && self.offset_smoothing <= 1.0,
            "offset smoothing must lie in (0, 1], got {}",
            self.offset_smoothing,
        );
        ensure!(
            self.follow_smoothing > 0.0 && self.follow_smoothing <= 1.0,
            "follow smoothing must lie in (0, 1], got {}",
            self.follow_smoothing,
        );
        Ok(())
    }

    pub fn pose_settings(&self) -> AvatarPoseSettings {
        AvatarPoseSettings {
            offset_factor: self.offset_smoothing,
            follow_factor: self.follow_smoothing,
            bob_frequency: self.bob_frequency,
            bob_amplitude: self.bob_amplitude,
            ..default()
        }
    }

    pub fn pointer_settings(&self) -> AvatarPointerSettings {
        AvatarPointerSettings {
            drag_sensitivity: self.drag_sensitivity,
        }
    }

    pub fn rig_settings(&self) -> AvatarRigSettings {
        AvatarRigSettings {
            logo_text: self.logo_text.clone(),
            texture_seed: self.texture_seed,
            speckle: SpeckleSettings {
                dots: self.speckle_dots,
                ..default()
            },
            ..default()
        }
    }

    pub fn scene_settings(&self) -> AvatarSceneSettings {
        AvatarSceneSettings {
            headless: self.headless,
            surface_size: Vec2::new(self.width, self.height),
            ..default()
        }
    }

    pub fn view_context(&self) -> ViewContext {
        ViewContext {
            page: self.page,
            chat_open: self.chat_open,
        }
    }
}


pub fn viewer_app(app: Option<App>, override_args: Option<AvatarGuideConfig>) -> anyhow::Result<App> {
    let args = match override_args {
        Some(args) => args,
        None => parse_args::<AvatarGuideConfig>(),
    };
    args.validate()?;

    let mut app = if let Some(original_app) = app {
        original_app
    } else {
        App::new()
    };

    info!("args: {:?}", args);
    app.insert_resource(args.clone());

    app.insert_resource(args.scene_settings());
    app.insert_resource(args.rig_settings());
    app.insert_resource(args.pose_settings());
    app.insert_resource(args.pointer_settings());
    app.insert_resource(args.view_context());

    #[cfg(target_arch = "wasm32")]
    let primary_window = Some(Window {
        canvas: Some("#bevy".to_string()),
        mode: bevy::window::WindowMode::Windowed,
        prevent_default_event_handling: true,
        title: args.name.clone(),

        #[cfg(feature = "perftest")]
        present_mode: bevy::window::PresentMode::AutoNoVsync,
        #[cfg(not(feature = "perftest"))]
        present_mode: bevy::window::PresentMode::AutoVsync,

        ..default()
    });

    #[cfg(not(target_arch = "wasm32"))]
    let primary_window = Some(Window {
        mode: bevy::window::WindowMode::Windowed,
        prevent_default_event_handling: false,
        resolution: bevy::window::WindowResolution::new(args.width, args.height),
        title: args.name.clone(),

        #[cfg(feature = "perftest")]
        present_mode: bevy::window::PresentMode::AutoNoVsync,
        #[cfg(not(feature = "perftest"))]
        present_mode: bevy::window::PresentMode::AutoVsync,

        ..default()
    });

    let mut winit_plugin = WinitPlugin::<WakeUp>::default();
    winit_plugin.run_on_any_thread = true;

    let default_plugins = DefaultPlugins
        .set(AssetPlugin {
            meta_check: bevy::asset::AssetMetaCheck::Never,
            ..default()
        })
        .set(winit_plugin);

    let default_plugins = if args.headless {
        default_plugins.set(WindowPlugin {
            primary_window: None,
            exit_condition: bevy::window::ExitCondition::DontExit,
            close_when_requested: false,
            ..default()
        })
    } else {
        default_plugins.set(WindowPlugin {
            primary_window,
            ..default()
        })
    };

    app.add_plugins(default_plugins);

    #[cfg(feature = "viewer")]
    if args.editor {
        app.register_type::<AvatarGuideConfig>();
        app.add_plugins(EguiPlugin { enable_multipass_for_primary_context: true });
        app.add_plugins(WorldInspectorPlugin::new());
    }

    if args.press_esc_close {
        app.add_systems(Update, press_esc_close);
    }

    app.add_plugins(BevyAvatarGuidePlugin);

    app.add_systems(PostUpdate, propagate_cli_settings);

    Ok(app)
}


/// Pushes live config edits (e.g. from the inspector) into the settings resources.
fn propagate_cli_settings(
    args: Res<AvatarGuideConfig>,
    mut pose_settings: ResMut<AvatarPoseSettings>,
    mut pointer_settings: ResMut<AvatarPointerSettings>,
) {
    if args.is_changed() {
        pose_settings.offset_factor = args.offset_smoothing;
        pose_settings.follow_factor = args.follow_smoothing;
        pose_settings.bob_frequency = args.bob_frequency;
        pose_settings.bob_amplitude = args.bob_amplitude;

        pointer_settings.drag_sensitivity = args.drag_sensitivity;
    }
}

fn press_esc_close(keys: Res<ButtonInput<KeyCode>>, mut exit: EventWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AvatarGuideConfig::default().validate().is_ok());
    }

    #[test]
    fn degenerate_surface_is_rejected() {
        for (width, height) in [(0.0, 1080.0), (1920.0, f32::NAN), (f32::INFINITY, 10.0)] {
            let config = AvatarGuideConfig {
                width,
                height,
                ..default()
            };
            assert!(config.validate().is_err(), "{width}x{height}");
            assert!(viewer_app(None, Some(config)).is_err());
        }
    }

    #[test]
    fn smoothing_outside_unit_interval_is_rejected() {
        let config = AvatarGuideConfig {
            follow_smoothing: 0.0,
            ..default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn settings_follow_config() {
        let config = AvatarGuideConfig {
            drag_sensitivity: 0.01,
            texture_seed: Some(3),
            speckle_dots: 12,
            page: Page::News,
            ..default()
        };

        assert_eq!(config.pointer_settings().drag_sensitivity, 0.01);
        assert_eq!(config.rig_settings().texture_seed, Some(3));
        assert_eq!(config.rig_settings().speckle.dots, 12);
        assert_eq!(config.view_context().page, Page::News);
        assert_eq!(config.pose_settings().page_offset, -2.8);
    }

    #[test]
    fn parses_from_command_line() {
        let config = AvatarGuideConfig::parse_from([
            "viewer",
            "--page",
            "packages",
            "--chat-open",
            "--texture-seed",
            "42",
        ]);
        assert_eq!(config.page, Page::Packages);
        assert!(config.chat_open);
        assert_eq!(config.texture_seed, Some(42));
        assert_eq!(config.logo_text, "TaoLi");
    }
}
