use bevy::{
    math::Ray3d,
    prelude::*,
};


/// Marks the camera the avatar is viewed, picked and projected through.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component, Default)]
pub struct AvatarCamera;

/// Logical size of the render surface in pixels.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Resource)]
pub struct SceneViewport {
    pub size: Vec2,
}

impl Default for SceneViewport {
    fn default() -> Self {
        Self {
            size: Vec2::new(1920.0, 1080.0),
        }
    }
}

impl SceneViewport {
    pub fn aspect_ratio(&self) -> f32 {
        if self.size.y > 0.0 {
            self.size.x / self.size.y
        } else {
            1.0
        }
    }

    /// Pixel position (origin top-left, y down) to normalized device coordinates.
    pub fn to_ndc(&self, position: Vec2) -> Vec2 {
        if self.size.x <= 0.0 || self.size.y <= 0.0 {
            return Vec2::ZERO;
        }

        Vec2::new(
            position.x / self.size.x * 2.0 - 1.0,
            -(position.y / self.size.y) * 2.0 + 1.0,
        )
    }

    pub fn to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.size.x,
            (-(ndc.y * 0.5) + 0.5) * self.size.y,
        )
    }
}


/// A projected point in clip space after the perspective divide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    pub ndc: Vec3,
    pub w: f32,
}

impl Projected {
    /// In front of the camera and strictly inside the depth range.
    pub fn has_valid_depth(&self) -> bool {
        self.w > 0.0 && self.ndc.z.abs() < 1.0
    }
}

/// Snapshot of a camera's combined view-projection for one frame.
///
/// Built from the `Projection` component directly so picking and anchoring
/// agree on the matrix even before the renderer has computed camera targets.
#[derive(Clone, Copy, Debug)]
pub struct CameraView {
    pub clip_from_world: Mat4,
    pub viewport: SceneViewport,
}

impl CameraView {
    pub fn new(
        projection: &Projection,
        camera_transform: &GlobalTransform,
        viewport: SceneViewport,
    ) -> Option<Self> {
        let clip_from_view = match projection {
            Projection::Perspective(perspective) => Mat4::perspective_infinite_reverse_rh(
                perspective.fov,
                viewport.aspect_ratio(),
                perspective.near,
            ),
            _ => return None,
        };

        let view_from_world = Mat4::from(camera_transform.affine().inverse());

        Some(Self {
            clip_from_world: clip_from_view * view_from_world,
            viewport,
        })
    }

    pub fn project(&self, world: Vec3) -> Projected {
        let clip = self.clip_from_world * world.extend(1.0);
        let ndc = if clip.w.abs() > f32::EPSILON {
            clip.truncate() / clip.w
        } else {
            Vec3::splat(f32::INFINITY)
        };

        Projected { ndc, w: clip.w }
    }

    /// Pixel position of `world`, or `None` when its projected depth is unusable.
    pub fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let projected = self.project(world);
        projected
            .has_valid_depth()
            .then(|| self.viewport.to_pixels(projected.ndc.truncate()))
    }

    /// Ray from the near plane through `ndc`, pointing away from the camera.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Option<Ray3d> {
        let world_from_clip = self.clip_from_world.inverse();

        // reverse-z: 1.0 is the near plane, 0.5 lies at twice the near distance
        let near = world_from_clip.project_point3(ndc.extend(1.0));
        let further = world_from_clip.project_point3(ndc.extend(0.5));

        let direction = Dir3::new(further - near).ok()?;
        Some(Ray3d {
            origin: near,
            direction,
        })
    }

    pub fn ray_through_pixel(&self, position: Vec2) -> Option<Ray3d> {
        self.ray_through_ndc(self.viewport.to_ndc(position))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn view_at_z8() -> CameraView {
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
                size: Vec2::new(800.0, 600.0),
            },
        )
        .unwrap()
    }

    #[test]
    fn origin_projects_to_screen_center() {
        let view = view_at_z8();
        let screen = view.world_to_screen(Vec3::ZERO).unwrap();
        assert!((screen - Vec2::new(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn up_is_screen_up() {
        let view = view_at_z8();
        let screen = view.world_to_screen(Vec3::Y).unwrap();
        assert!(screen.y < 300.0);
        assert!((screen.x - 400.0).abs() < 1e-3);
    }

    #[test]
    fn points_behind_camera_are_invalid() {
        let view = view_at_z8();
        assert!(view.world_to_screen(Vec3::new(0.0, 0.0, 12.0)).is_none());
        assert!(!view.project(Vec3::new(0.0, 0.0, 12.0)).has_valid_depth());
    }

    #[test]
    fn center_ray_points_at_origin() {
        let view = view_at_z8();
        let ray = view.ray_through_pixel(Vec2::new(400.0, 300.0)).unwrap();
        assert!((ray.direction.as_vec3() - Vec3::NEG_Z).length() < 1e-4);
        assert!(ray.origin.x.abs() < 1e-4 && ray.origin.y.abs() < 1e-4);
    }

    #[test]
    fn ndc_round_trips_through_pixels() {
        let viewport = SceneViewport {
            size: Vec2::new(640.0, 480.0),
        };
        let pixel = Vec2::new(100.0, 420.0);
        let back = viewport.to_pixels(viewport.to_ndc(pixel));
        assert!((back - pixel).length() < 1e-3);
    }
}
