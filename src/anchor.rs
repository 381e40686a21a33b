use bevy::prelude::*;

use crate::{
    camera::{
        AvatarCamera,
        CameraView,
        SceneViewport,
    },
    rig::Emitter,
    scene::AvatarSystems,
};


/// Pins a UI node to the emitter's projected screen position.
///
/// The node's `left`/`top` are rewritten every frame. When the anchor point
/// cannot be projected (behind the camera or outside the depth range) the
/// previous position is kept. Spawned without a `Node`, the anchor gets an
/// absolutely positioned one so `left`/`top` are screen pixels.
#[derive(Component, Clone, Debug, Reflect)]
#[reflect(Component)]
#[require(Node = anchored_node())]
pub struct ScreenAnchor {
    /// world-space offset added to the emitter position
    pub offset: Vec3,
    pub last: Option<Vec2>,
}

impl Default for ScreenAnchor {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.1, 0.5, 0.0),
            last: None,
        }
    }
}

fn anchored_node() -> Node {
    Node {
        position_type: PositionType::Absolute,
        ..default()
    }
}

impl ScreenAnchor {
    /// Projects `emitter + offset` and returns the position to display.
    pub fn track(&mut self, view: &CameraView, emitter: Vec3) -> Option<Vec2> {
        if let Some(position) = view.world_to_screen(emitter + self.offset) {
            self.last = Some(position);
        }
        self.last
    }
}


pub struct ScreenAnchorPlugin;

impl Plugin for ScreenAnchorPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ScreenAnchor>();

        app.add_systems(PostUpdate, update_screen_anchors.in_set(AvatarSystems::Anchor));
    }
}


pub fn update_screen_anchors(
    viewport: Res<SceneViewport>,
    camera: Query<(&Projection, &GlobalTransform), With<AvatarCamera>>,
    emitter: Query<&GlobalTransform, With<Emitter>>,
    mut anchors: Query<(&mut ScreenAnchor, &mut Node)>,
) {
    let Ok((projection, camera_transform)) = camera.single() else {
        return;
    };
    let Ok(emitter) = emitter.single() else {
        return;
    };
    let Some(view) = CameraView::new(projection, camera_transform, *viewport) else {
        return;
    };

    let origin = emitter.translation();
    for (mut anchor, mut node) in &mut anchors {
        if let Some(position) = anchor.track(&view, origin) {
            node.left = Val::Px(position.x);
            node.top = Val::Px(position.y);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> CameraView {
        let projection = Projection::Perspective(PerspectiveProjection {
            fov: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
            ..default()
        });
        let transform = GlobalTransform::from(
            Transform::from_xyz(0.0, 0.0, 8.0).looking_at(Vec3::ZERO, Vec3::Y),
        );
        CameraView::new(
            &projection,
            &transform,
            SceneViewport {
                size: Vec2::new(1000.0, 500.0),
            },
        )
        .unwrap()
    }

    #[test]
    fn offset_point_at_center_maps_to_viewport_center() {
        let mut anchor = ScreenAnchor::default();
        let position = anchor.track(&view(), -anchor.offset).unwrap();
        assert!((position - Vec2::new(500.0, 250.0)).length() < 1e-3);
    }

    #[test]
    fn invalid_depth_keeps_last_position() {
        let view = view();
        let mut anchor = ScreenAnchor::default();

        let first = anchor.track(&view, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let behind = anchor.track(&view, Vec3::new(0.0, 0.0, 20.0));
        assert_eq!(behind, Some(first));
    }

    #[test]
    fn bare_anchor_is_absolutely_positioned() {
        let mut world = World::new();
        let anchor = world.spawn(ScreenAnchor::default()).id();

        let node = world.get::<Node>(anchor).unwrap();
        assert_eq!(node.position_type, PositionType::Absolute);
    }

    #[test]
    fn nothing_to_show_before_first_valid_projection() {
        let mut anchor = ScreenAnchor::default();
        assert_eq!(anchor.track(&view(), Vec3::new(0.0, 0.0, 30.0)), None);
    }
}
