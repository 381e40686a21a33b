use bevy::prelude::*;


pub struct AvatarLightingPlugin;
impl Plugin for AvatarLightingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AvatarLightingSettings>();
        app.register_type::<AvatarLightingSettings>();

        app.insert_resource(AmbientLight {
            brightness: 350.0,
            ..default()
        });

        app.add_systems(Startup, setup_lighting);
    }
}

#[derive(Resource, Debug, Reflect)]
#[reflect(Resource)]
pub struct AvatarLightingSettings {
    pub key_position: Vec3,
    pub key_color: Color,
    pub key_intensity: f32,
    pub fill_position: Vec3,
    pub fill_color: Color,
    pub fill_intensity: f32,
}

impl Default for AvatarLightingSettings {
    fn default() -> Self {
        Self {
            key_position: Vec3::new(5.0, 8.0, 6.0),
            key_color: Color::srgb_u8(0xff, 0xdd, 0xdd),
            key_intensity: 4_000_000.0,
            fill_position: Vec3::new(-5.0, 2.0, -2.0),
            fill_color: Color::srgb_u8(0xfc, 0xa5, 0xa5),
            fill_intensity: 600_000.0,
        }
    }
}

pub fn setup_lighting(mut commands: Commands, lighting_settings: Res<AvatarLightingSettings>) {
    commands.spawn((
        SpotLight {
            color: lighting_settings.key_color,
            intensity: lighting_settings.key_intensity,
            range: 40.0,
            outer_angle: 0.6,
            inner_angle: 0.45,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(lighting_settings.key_position).looking_at(Vec3::ZERO, Vec3::Y),
        Name::new("key_light"),
    ));

    commands.spawn((
        PointLight {
            color: lighting_settings.fill_color,
            intensity: lighting_settings.fill_intensity,
            range: 30.0,
            ..default()
        },
        Transform::from_translation(lighting_settings.fill_position),
        Name::new("fill_light"),
    ));
}
