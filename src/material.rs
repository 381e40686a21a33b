use bevy::{
    prelude::*,
    render::render_resource::TextureFormat,
};
use rand::{
    rngs::StdRng,
    SeedableRng,
};

use crate::{
    rig::AvatarRigSettings,
    texture::{
        label_raster,
        normal_map_from_height,
        speckle_raster,
    },
};


/// Shared material palette of the avatar, built once before the rig spawns.
#[derive(Resource, Debug, Clone)]
pub struct AvatarMaterials {
    pub body: Handle<StandardMaterial>,
    pub accent: Handle<StandardMaterial>,
    pub dark: Handle<StandardMaterial>,
    pub cheek: Handle<StandardMaterial>,
    pub peanut: Handle<StandardMaterial>,
    /// peanut shell without the bump map, for meshes that cannot carry tangents
    pub peanut_flat: Handle<StandardMaterial>,
    pub logo: Handle<StandardMaterial>,
    pub beam: Handle<StandardMaterial>,
}


pub struct AvatarMaterialPlugin;

impl Plugin for AvatarMaterialPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreStartup, build_materials);
    }
}


pub fn build_materials(
    mut commands: Commands,
    settings: Res<AvatarRigSettings>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mut rng = match settings.texture_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let speckle = speckle_raster(&settings.speckle, &mut rng);
    let bump = normal_map_from_height(&speckle, settings.bump_strength);
    let speckle = images.add(speckle.into_image(TextureFormat::Rgba8UnormSrgb));
    let bump = images.add(bump.into_image(TextureFormat::Rgba8Unorm));

    let logo = label_raster(&settings.logo_text, &settings.label);
    let logo = images.add(logo.into_image(TextureFormat::Rgba8UnormSrgb));

    let peanut_base = StandardMaterial {
        base_color: Color::WHITE,
        base_color_texture: Some(speckle),
        perceptual_roughness: 1.0,
        ..default()
    };

    let palette = AvatarMaterials {
        body: materials.add(StandardMaterial {
            base_color: Color::WHITE,
            metallic: 0.1,
            perceptual_roughness: 0.3,
            clearcoat: 0.8,
            ..default()
        }),
        accent: materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0xe1, 0x1d, 0x48),
            perceptual_roughness: 0.4,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
        dark: materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0x1e, 0x29, 0x3b),
            perceptual_roughness: 0.5,
            ..default()
        }),
        cheek: materials.add(StandardMaterial {
            base_color: Color::srgba_u8(0xfc, 0xa5, 0xa5, 153),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        }),
        peanut: materials.add(StandardMaterial {
            normal_map_texture: Some(bump),
            ..peanut_base.clone()
        }),
        peanut_flat: materials.add(peanut_base),
        logo: materials.add(StandardMaterial {
            base_color_texture: Some(logo),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
        beam: materials.add(StandardMaterial {
            base_color: Color::srgba_u8(0xf8, 0x71, 0x71, 26),
            alpha_mode: AlphaMode::Add,
            unlit: true,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
    };

    debug!(
        "built avatar materials (speckle {}px, {} dots, logo {:?})",
        settings.speckle.size, settings.speckle.dots, settings.logo_text,
    );

    commands.insert_resource(palette);
}
