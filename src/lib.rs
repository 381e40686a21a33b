use bevy::prelude::*;

pub mod anchor;
pub mod app;
pub mod camera;
pub mod font;
pub mod gesture;
pub mod material;
pub mod mesh;
pub mod pick;
pub mod pointer;
pub mod pose;
pub mod rig;
pub mod scene;
pub mod texture;


pub struct BevyAvatarGuidePlugin;

impl Plugin for BevyAvatarGuidePlugin {
    fn build(&self, app: &mut App) {
        info!("initializing BevyAvatarGuidePlugin...");

        app.add_plugins((
            rig::AvatarRigPlugin,
            material::AvatarMaterialPlugin,
            pointer::AvatarPointerPlugin,
            gesture::AvatarGesturePlugin,
            pose::AvatarPosePlugin,
            anchor::ScreenAnchorPlugin,
            scene::AvatarScenePlugin,
        ));
    }
}
