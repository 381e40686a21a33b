use bevy::{
    math::Ray3d,
    prelude::*,
};

use crate::rig::RigPart;


/// Analytic shape of a rig mesh in the mesh's local space, axis-aligned with +Y.
///
/// Non-uniform node scale turns spheres into ellipsoids; the ray is transformed
/// into local space before testing, so scale is handled for every shape.
#[derive(Component, Clone, Copy, Debug, PartialEq, Reflect)]
#[reflect(Component)]
pub enum Collider {
    Sphere {
        radius: f32,
    },
    Capsule {
        radius: f32,
        half_length: f32,
    },
    Frustum {
        radius_top: f32,
        radius_bottom: f32,
        half_height: f32,
        capped: bool,
    },
    Disk {
        radius: f32,
    },
    Cuboid {
        half_extents: Vec3,
    },
}

impl Collider {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Matches `Capsule3d::new(radius, length)`.
    pub fn capsule(radius: f32, length: f32) -> Self {
        Self::Capsule {
            radius,
            half_length: length * 0.5,
        }
    }

    pub fn frustum(radius_top: f32, radius_bottom: f32, height: f32, capped: bool) -> Self {
        Self::Frustum {
            radius_top,
            radius_bottom,
            half_height: height * 0.5,
            capped,
        }
    }

    /// Flat disk facing +Z, matching `Circle` meshes.
    pub fn disk(radius: f32) -> Self {
        Self::Disk { radius }
    }

    /// Flat rectangle facing +Z, matching `Rectangle` meshes.
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::Cuboid {
            half_extents: Vec3::new(width * 0.5, height * 0.5, PLANAR_HALF_DEPTH),
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents }
    }

    /// Nearest non-negative ray parameter in local space. `direction` need not be unit
    /// length; the parameter scales with it.
    pub fn intersect_local(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match *self {
            Self::Sphere { radius } => ray_sphere(origin, direction, Vec3::ZERO, radius),
            Self::Capsule {
                radius,
                half_length,
            } => ray_capsule(origin, direction, radius, half_length),
            Self::Frustum {
                radius_top,
                radius_bottom,
                half_height,
                capped,
            } => ray_frustum(origin, direction, radius_top, radius_bottom, half_height, capped),
            Self::Disk { radius } => ray_disk(origin, direction, radius),
            Self::Cuboid { half_extents } => ray_box(origin, direction, half_extents),
        }
    }

    /// World-space distance along `ray` to this collider placed at `transform`.
    pub fn intersect(&self, ray: Ray3d, transform: &GlobalTransform) -> Option<f32> {
        let local_from_world = transform.affine().inverse();
        let origin = local_from_world.transform_point3(ray.origin);
        let direction = local_from_world.transform_vector3(*ray.direction);

        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }

        // the affine map is linear along the ray, so the local parameter is the world distance
        self.intersect_local(origin, direction)
    }
}

const PLANAR_HALF_DEPTH: f32 = 1e-3;


/// Real roots of `a t² + b t + c = 0` in ascending order; a linear equation
/// yields its single root twice.
fn quadratic_roots(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() <= f32::EPSILON {
        if b.abs() <= f32::EPSILON {
            return None;
        }
        let t = -c / b;
        return Some((t, t));
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt = discriminant.sqrt();
    let t0 = (-b - sqrt) / (2.0 * a);
    let t1 = (-b + sqrt) / (2.0 * a);
    Some((t0.min(t1), t0.max(t1)))
}

fn nearest(candidates: impl IntoIterator<Item = f32>) -> Option<f32> {
    candidates
        .into_iter()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .min_by(f32::total_cmp)
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let a = direction.length_squared();
    let b = 2.0 * offset.dot(direction);
    let c = offset.length_squared() - radius * radius;

    let (t0, t1) = quadratic_roots(a, b, c)?;
    nearest([t0, t1])
}

fn ray_capsule(origin: Vec3, direction: Vec3, radius: f32, half_length: f32) -> Option<f32> {
    // infinite cylinder around Y, clipped to the straight section
    let a = direction.x * direction.x + direction.z * direction.z;
    let b = 2.0 * (origin.x * direction.x + origin.z * direction.z);
    let c = origin.x * origin.x + origin.z * origin.z - radius * radius;

    let body = quadratic_roots(a, b, c)
        .map(|(t0, t1)| [t0, t1])
        .unwrap_or([f32::NAN; 2])
        .into_iter()
        .filter(|t| (origin.y + t * direction.y).abs() <= half_length);

    let caps = [
        ray_sphere(origin, direction, Vec3::Y * half_length, radius),
        ray_sphere(origin, direction, Vec3::NEG_Y * half_length, radius),
    ];

    nearest(body.chain(caps.into_iter().flatten()))
}

fn ray_frustum(
    origin: Vec3,
    direction: Vec3,
    radius_top: f32,
    radius_bottom: f32,
    half_height: f32,
    capped: bool,
) -> Option<f32> {
    if half_height <= 0.0 {
        return None;
    }

    // radius varies linearly with height: r(y) = mid + slope * y
    let mid = (radius_top + radius_bottom) * 0.5;
    let slope = (radius_top - radius_bottom) / (2.0 * half_height);

    let radius_at_origin = mid + slope * origin.y;
    let a = direction.x * direction.x + direction.z * direction.z
        - slope * slope * direction.y * direction.y;
    let b = 2.0
        * (origin.x * direction.x + origin.z * direction.z - slope * direction.y * radius_at_origin);
    let c = origin.x * origin.x + origin.z * origin.z - radius_at_origin * radius_at_origin;

    let wall = quadratic_roots(a, b, c)
        .map(|(t0, t1)| [t0, t1])
        .unwrap_or([f32::NAN; 2])
        .into_iter()
        .filter(|t| {
            let y = origin.y + t * direction.y;
            // the double cone's mirrored half has negative radius
            y.abs() <= half_height && mid + slope * y >= 0.0
        });

    let mut caps = [f32::NAN; 2];
    if capped && direction.y.abs() > f32::EPSILON {
        for (slot, (y, radius)) in caps
            .iter_mut()
            .zip([(half_height, radius_top), (-half_height, radius_bottom)])
        {
            let t = (y - origin.y) / direction.y;
            let hit = origin + direction * t;
            if hit.x * hit.x + hit.z * hit.z <= radius * radius {
                *slot = t;
            }
        }
    }

    nearest(wall.chain(caps))
}

fn ray_disk(origin: Vec3, direction: Vec3, radius: f32) -> Option<f32> {
    if direction.z.abs() <= f32::EPSILON {
        return None;
    }

    let t = -origin.z / direction.z;
    let hit = origin + direction * t;
    (t >= 0.0 && hit.x * hit.x + hit.y * hit.y <= radius * radius).then_some(t)
}

fn ray_box(origin: Vec3, direction: Vec3, half_extents: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let (o, d, h) = (origin[axis], direction[axis], half_extents[axis]);
        if d.abs() <= f32::EPSILON {
            if o.abs() > h {
                return None;
            }
            continue;
        }

        let t0 = (-h - o) / d;
        let t1 = (h - o) / d;
        t_min = t_min.max(t0.min(t1));
        t_max = t_max.min(t0.max(t1));
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }
    Some(t_min.max(0.0))
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
    pub part: Option<RigPart>,
}

/// Closest collider along `ray`. Equal distances keep the first candidate visited.
pub fn cast_ray<'a>(
    ray: Ray3d,
    candidates: impl IntoIterator<Item = (Entity, &'a GlobalTransform, &'a Collider, Option<&'a RigPart>)>,
) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;

    for (entity, transform, collider, part) in candidates {
        let Some(distance) = collider.intersect(ray, transform) else {
            continue;
        };

        if best.is_none_or(|hit| distance < hit.distance) {
            best = Some(RayHit {
                entity,
                distance,
                part: part.copied(),
            });
        }
    }

    best
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ray(origin: Vec3, direction: Vec3) -> Ray3d {
        Ray3d {
            origin,
            direction: Dir3::new(direction).unwrap(),
        }
    }

    fn at(translation: Vec3) -> GlobalTransform {
        GlobalTransform::from_translation(translation)
    }

    #[test]
    fn sphere_hit_reports_world_distance() {
        let collider = Collider::sphere(1.0);
        let distance = collider
            .intersect(ray(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .unwrap();
        assert!((distance - 9.0).abs() < 1e-4);
    }

    #[test]
    fn scaled_sphere_behaves_as_ellipsoid() {
        let collider = Collider::sphere(1.0);
        let transform = GlobalTransform::from(Transform::from_scale(Vec3::new(1.0, 3.0, 1.0)));

        // passes above a unit sphere but through the stretched one
        let probe = ray(Vec3::new(0.0, 2.0, 10.0), Vec3::NEG_Z);
        assert!(collider.intersect(probe, &at(Vec3::ZERO)).is_none());
        let distance = collider.intersect(probe, &transform).unwrap();

        // x² + (y/3)² + z² = 1 at y = 2 → z = √(5/9)
        let expected = 10.0 - (5.0f32 / 9.0).sqrt();
        assert!((distance - expected).abs() < 1e-3);
    }

    #[test]
    fn capsule_hits_cylinder_and_caps() {
        let collider = Collider::capsule(0.5, 2.0);
        let side = collider
            .intersect(ray(Vec3::new(0.0, 0.5, 5.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .unwrap();
        assert!((side - 4.5).abs() < 1e-4);

        let top = collider
            .intersect(ray(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y), &at(Vec3::ZERO))
            .unwrap();
        assert!((top - 3.5).abs() < 1e-4);

        assert!(collider
            .intersect(ray(Vec3::new(0.0, 1.8, 5.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .is_none());
    }

    #[test]
    fn open_frustum_is_hollow_along_its_axis() {
        let open = Collider::frustum(0.3, 0.05, 0.6, false);
        let capped = Collider::frustum(0.3, 0.05, 0.6, true);
        let down_axis = ray(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);

        assert!(open.intersect(down_axis, &at(Vec3::ZERO)).is_none());
        let cap = capped.intersect(down_axis, &at(Vec3::ZERO)).unwrap();
        assert!((cap - 4.7).abs() < 1e-4);
    }

    #[test]
    fn frustum_wall_radius_follows_height() {
        let collider = Collider::frustum(0.3, 0.1, 2.0, false);
        // at y = 0 the radius is the midpoint 0.2
        let distance = collider
            .intersect(ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .unwrap();
        assert!((distance - 4.8).abs() < 1e-4);
    }

    #[test]
    fn disk_is_hit_face_on_only_within_radius() {
        let collider = Collider::disk(0.1);
        assert!(collider
            .intersect(ray(Vec3::new(0.05, 0.0, 3.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .is_some());
        assert!(collider
            .intersect(ray(Vec3::new(0.2, 0.0, 3.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .is_none());
        // inside the bounding square but outside the circle
        assert!(collider
            .intersect(ray(Vec3::new(0.08, 0.08, 3.0), Vec3::NEG_Z), &at(Vec3::ZERO))
            .is_none());
    }

    #[test]
    fn cast_ray_returns_closest_and_keeps_first_on_ties() {
        let near = Entity::from_raw(1);
        let far = Entity::from_raw(2);
        let twin = Entity::from_raw(3);

        let sphere = Collider::sphere(0.5);
        let near_at = at(Vec3::new(0.0, 0.0, 1.0));
        let far_at = at(Vec3::new(0.0, 0.0, -1.0));

        let probe = ray(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hit = cast_ray(
            probe,
            [
                (far, &far_at, &sphere, None),
                (near, &near_at, &sphere, Some(&RigPart::Head)),
                (twin, &near_at, &sphere, Some(&RigPart::Body)),
            ],
        )
        .unwrap();

        assert_eq!(hit.entity, near);
        assert_eq!(hit.part, Some(RigPart::Head));
    }

    #[test]
    fn cast_ray_misses_report_none() {
        let sphere = Collider::sphere(0.5);
        let transform = at(Vec3::ZERO);
        let probe = ray(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(cast_ray(probe, [(Entity::from_raw(1), &transform, &sphere, None)]).is_none());
    }
}
