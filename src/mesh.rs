use std::f32::consts::TAU;

use bevy::{
    asset::RenderAssetUsages,
    prelude::*,
    render::{
        mesh::Indices,
        render_resource::PrimitiveTopology,
    },
};
use itertools::iproduct;


fn assemble(
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
        .with_inserted_indices(Indices::U32(indices))
}

/// Side wall of a conical frustum centered on the origin along +Y, without caps.
///
/// Used for bands and beams that should read as hollow shells.
pub fn open_frustum_mesh(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let half = height * 0.5;
    let slope = if height > 0.0 { (radius_bottom - radius_top) / height } else { 0.0 };

    let mut positions = Vec::with_capacity(((segments + 1) * 2) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());

    for (ring, i) in iproduct!(0..2u32, 0..=segments) {
        let (radius, y) = if ring == 0 { (radius_bottom, -half) } else { (radius_top, half) };
        let theta = i as f32 / segments as f32 * TAU;
        let (sin, cos) = theta.sin_cos();

        positions.push([radius * cos, y, radius * sin]);
        normals.push(Vec3::new(cos, slope, sin).normalize().to_array());
        uvs.push([i as f32 / segments as f32, 1.0 - ring as f32]);
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * 6) as usize);
    for i in 0..segments {
        let (b0, b1) = (i, i + 1);
        let (t0, t1) = (stride + i, stride + i + 1);
        indices.extend_from_slice(&[b0, t0, b1, b1, t0, t1]);
    }

    assemble(positions, normals, uvs, indices)
}

/// Partial torus in the XY plane sweeping `arc` radians counter-clockwise from +X.
pub fn arc_tube_mesh(
    radius: f32,
    tube: f32,
    radial_segments: u32,
    tubular_segments: u32,
    arc: f32,
) -> Mesh {
    let radial_segments = radial_segments.max(3);
    let tubular_segments = tubular_segments.max(1);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for (j, i) in iproduct!(0..=radial_segments, 0..=tubular_segments) {
        let u = i as f32 / tubular_segments as f32 * arc;
        let v = j as f32 / radial_segments as f32 * TAU;

        let ring = radius + tube * v.cos();
        let position = Vec3::new(ring * u.cos(), ring * u.sin(), tube * v.sin());
        let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);

        positions.push(position.to_array());
        normals.push((position - center).normalize_or_zero().to_array());
        uvs.push([
            i as f32 / tubular_segments as f32,
            j as f32 / radial_segments as f32,
        ]);
    }

    let stride = tubular_segments + 1;
    let mut indices = Vec::new();
    for (j, i) in iproduct!(1..=radial_segments, 1..=tubular_segments) {
        let a = stride * j + i - 1;
        let b = stride * (j - 1) + i - 1;
        let c = stride * (j - 1) + i;
        let d = stride * j + i;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    assemble(positions, normals, uvs, indices)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn positions(mesh: &Mesh) -> Vec<[f32; 3]> {
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|a| a.as_float3())
            .map(|p| p.to_vec())
            .unwrap_or_default()
    }

    fn max_index(mesh: &Mesh) -> u32 {
        match mesh.indices() {
            Some(Indices::U32(indices)) => indices.iter().copied().max().unwrap_or(0),
            _ => panic!("expected u32 indices"),
        }
    }

    #[test]
    fn open_frustum_has_no_cap_vertices() {
        let mesh = open_frustum_mesh(0.3, 0.05, 0.6, 16);
        let positions = positions(&mesh);
        assert_eq!(positions.len(), 17 * 2);
        assert!(positions.iter().all(|p| (p[1].abs() - 0.3).abs() < 1e-6));
        assert!((max_index(&mesh) as usize) < positions.len());

        let top_radius = Vec2::new(positions[17][0], positions[17][2]).length();
        assert!((top_radius - 0.3).abs() < 1e-5);
    }

    #[test]
    fn half_arc_stays_in_upper_half_plane() {
        let mesh = arc_tube_mesh(0.15, 0.02, 8, 16, std::f32::consts::PI);
        let positions = positions(&mesh);
        assert_eq!(positions.len(), 9 * 17);
        assert!(positions.iter().all(|p| p[1] >= -1e-5));
        assert!((max_index(&mesh) as usize) < positions.len());
    }
}
