//! Procedural geometry
//!
//! Every generator returns a fresh [`Geometry`] that the caller hands to the
//! scene, which then owns it until the node carrying it is disposed.
//!
//! The beam axis is +Z. Ring-shaped parts are centred on the origin and
//! extend `length / 2` to either side.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use std::f32::consts::TAU;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    fn new(topology: Topology) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(corners.iter().map(|&c| Vertex::new(c, normal)));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    fn push_segment(&mut self, a: Vec3, b: Vec3) {
        let base = self.vertices.len() as u32;
        self.vertices.push(Vertex::new(a, Vec3::ZERO));
        self.vertices.push(Vertex::new(b, Vec3::ZERO));
        self.indices.extend_from_slice(&[base, base + 1]);
    }

    fn push_polyline(&mut self, points: &[Vec3]) {
        for pair in points.windows(2) {
            self.push_segment(pair[0], pair[1]);
        }
    }

    /// Triangles in local space. Empty for line geometry.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let chunks = match self.topology {
            Topology::Triangles => self.indices.chunks_exact(3),
            Topology::Lines => self.indices[..0].chunks_exact(3),
        };
        chunks.map(|tri| {
            [
                Vec3::from_array(self.vertices[tri[0] as usize].position),
                Vec3::from_array(self.vertices[tri[1] as usize].position),
                Vec3::from_array(self.vertices[tri[2] as usize].position),
            ]
        })
    }
}

/// Angular sweep of a ring with a wedge of `gap` radians removed.
///
/// The wedge is centred on +Y so that a camera looking from slightly above
/// sees straight into the detector.
#[derive(Debug, Clone, Copy)]
pub struct Sweep {
    start: f32,
    extent: f32,
}

impl Sweep {
    pub fn with_gap(gap: f32) -> Self {
        let gap = gap.clamp(0.0, TAU);
        Self {
            start: std::f32::consts::FRAC_PI_2 + gap / 2.0,
            extent: TAU - gap,
        }
    }

    pub fn full() -> Self {
        Self::with_gap(0.0)
    }

    fn angle(&self, i: u32, segments: u32) -> f32 {
        self.start + self.extent * i as f32 / segments as f32
    }

    fn direction(&self, i: u32, segments: u32) -> Vec3 {
        let (s, c) = self.angle(i, segments).sin_cos();
        Vec3::new(c, s, 0.0)
    }
}

/// Extruded annulus with a wedge cut away, axis along Z.
pub fn cutaway_ring(inner: f32, outer: f32, length: f32, sweep: Sweep, segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Triangles);
    let half = length / 2.0;
    let segments = segments.max(1);

    for i in 0..segments {
        let d0 = sweep.direction(i, segments);
        let d1 = sweep.direction(i + 1, segments);
        let mid = (d0 + d1).normalize_or_zero();

        let (o0, o1) = (d0 * outer, d1 * outer);
        let (i0, i1) = (d0 * inner, d1 * inner);
        let front = Vec3::Z * half;
        let back = -Vec3::Z * half;

        geometry.push_quad([o0 + back, o1 + back, o1 + front, o0 + front], mid);
        geometry.push_quad([i1 + back, i0 + back, i0 + front, i1 + front], -mid);
        geometry.push_quad([i0 + front, o0 + front, o1 + front, i1 + front], Vec3::Z);
        geometry.push_quad([i1 + back, o1 + back, o0 + back, i0 + back], -Vec3::Z);
    }

    if sweep.extent < TAU {
        for (i, outward) in [(0, -1.0), (segments, 1.0)] {
            let d = sweep.direction(i, segments);
            let tangent = Vec3::new(-d.y, d.x, 0.0) * outward;
            geometry.push_quad(
                [
                    d * inner - Vec3::Z * half,
                    d * outer - Vec3::Z * half,
                    d * outer + Vec3::Z * half,
                    d * inner + Vec3::Z * half,
                ],
                tangent,
            );
        }
    }

    geometry
}

/// Outline of a [`cutaway_ring`]: the four arcs plus the wedge boundary.
pub fn ring_edges(inner: f32, outer: f32, length: f32, sweep: Sweep, segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Lines);
    let half = length / 2.0;
    let segments = segments.max(1);

    for radius in [inner, outer] {
        for z in [-half, half] {
            let arc: Vec<Vec3> = (0..=segments)
                .map(|i| sweep.direction(i, segments) * radius + Vec3::Z * z)
                .collect();
            geometry.push_polyline(&arc);
        }
    }

    if sweep.extent < TAU {
        for i in [0, segments] {
            let d = sweep.direction(i, segments);
            for radius in [inner, outer] {
                geometry.push_segment(d * radius - Vec3::Z * half, d * radius + Vec3::Z * half);
            }
            for z in [-half, half] {
                geometry.push_segment(d * inner + Vec3::Z * z, d * outer + Vec3::Z * z);
            }
        }
    }

    geometry
}

/// Flat annular sector in the plane `z`, facing along `normal_z` (±1).
pub fn annulus_sector(
    inner: f32,
    outer: f32,
    z: f32,
    normal_z: f32,
    sweep: Sweep,
    segments: u32,
) -> Geometry {
    let mut geometry = Geometry::new(Topology::Triangles);
    let segments = segments.max(1);
    let offset = Vec3::Z * z;
    let normal = Vec3::Z * normal_z.signum();

    for i in 0..segments {
        let d0 = sweep.direction(i, segments);
        let d1 = sweep.direction(i + 1, segments);
        geometry.push_quad(
            [
                d0 * inner + offset,
                d0 * outer + offset,
                d1 * outer + offset,
                d1 * inner + offset,
            ],
            normal,
        );
    }

    geometry
}

/// Longitudinal struts evenly spaced around `radius` plus `rings` cross-sections.
pub fn support_grid(radius: f32, length: f32, struts: u32, rings: u32, segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Lines);
    let half = length / 2.0;
    let circle = Sweep::full();
    let segments = segments.max(3);

    for i in 0..struts {
        let d = circle.direction(i, struts.max(1));
        geometry.push_segment(d * radius - Vec3::Z * half, d * radius + Vec3::Z * half);
    }

    for j in 0..rings {
        let z = if rings > 1 {
            -half + length * j as f32 / (rings - 1) as f32
        } else {
            0.0
        };
        let loop_points: Vec<Vec3> = (0..=segments)
            .map(|i| circle.direction(i, segments) * radius + Vec3::Z * z)
            .collect();
        geometry.push_polyline(&loop_points);
    }

    geometry
}

pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Triangles);
    let w = width_segments.max(3);
    let h = height_segments.max(2);

    for y in 0..=h {
        let v = y as f32 / h as f32;
        let phi = v * std::f32::consts::PI;
        for x in 0..=w {
            let u = x as f32 / w as f32;
            let theta = u * TAU;
            let normal = Vec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            );
            geometry.vertices.push(Vertex::new(normal * radius, normal));
        }
    }

    let row = w + 1;
    for y in 0..h {
        for x in 0..w {
            let a = y * row + x;
            let b = a + row;
            if y != 0 {
                geometry.indices.extend_from_slice(&[a, b, a + 1]);
            }
            if y != h - 1 {
                geometry.indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }

    geometry
}

pub fn line_segments(segments: &[(Vec3, Vec3)]) -> Geometry {
    let mut geometry = Geometry::new(Topology::Lines);
    for &(a, b) in segments {
        geometry.push_segment(a, b);
    }
    geometry
}

/// Cone with its apex at the origin opening along +Z.
pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Triangles);
    let circle = Sweep::full();
    let n = radial_segments.max(3);
    let slope = radius / height.max(f32::EPSILON);

    for i in 0..n {
        let d0 = circle.direction(i, n);
        let d1 = circle.direction(i + 1, n);
        let rim0 = d0 * radius + Vec3::Z * height;
        let rim1 = d1 * radius + Vec3::Z * height;

        let base = geometry.vertices.len() as u32;
        let side = |d: Vec3| (d - Vec3::Z * slope).normalize_or_zero();
        geometry.vertices.push(Vertex::new(Vec3::ZERO, side((d0 + d1) * 0.5)));
        geometry.vertices.push(Vertex::new(rim0, side(d0)));
        geometry.vertices.push(Vertex::new(rim1, side(d1)));
        geometry.indices.extend_from_slice(&[base, base + 1, base + 2]);

        let base = geometry.vertices.len() as u32;
        geometry.vertices.push(Vertex::new(Vec3::Z * height, Vec3::Z));
        geometry.vertices.push(Vertex::new(rim1, Vec3::Z));
        geometry.vertices.push(Vertex::new(rim0, Vec3::Z));
        geometry.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    geometry
}

/// Point on a polyline at normalized parameter `t` (uniform in segment count).
fn polyline_point(path: &[Vec3], t: f32) -> Vec3 {
    match path.len() {
        0 => Vec3::ZERO,
        1 => path[0],
        n => {
            let scaled = t.clamp(0.0, 1.0) * (n - 1) as f32;
            let i = (scaled.floor() as usize).min(n - 2);
            path[i].lerp(path[i + 1], scaled - i as f32)
        }
    }
}

/// Tube of `radius` lofted along `path` with `tubular_segments` rings.
///
/// Frames are parallel-transported along the curve so the tube does not
/// twist where the path bends.
pub fn tube(path: &[Vec3], tubular_segments: u32, radius: f32, radial_segments: u32) -> Geometry {
    let mut geometry = Geometry::new(Topology::Triangles);
    if path.len() < 2 {
        return geometry;
    }

    let segments = tubular_segments.max(1);
    let radial = radial_segments.max(3);
    let points: Vec<Vec3> = (0..=segments)
        .map(|i| polyline_point(path, i as f32 / segments as f32))
        .collect();

    let tangent_at = |i: usize| {
        let a = points[i.saturating_sub(1)];
        let b = points[(i + 1).min(points.len() - 1)];
        (b - a).normalize_or(Vec3::Z)
    };

    let mut tangent = tangent_at(0);
    let mut normal = tangent.any_orthonormal_vector();

    for (i, &center) in points.iter().enumerate() {
        let next_tangent = tangent_at(i);
        let rotation = Quat::from_rotation_arc(tangent, next_tangent);
        normal = (rotation * normal).normalize_or(next_tangent.any_orthonormal_vector());
        tangent = next_tangent;
        let binormal = tangent.cross(normal);

        for j in 0..=radial {
            let (s, c) = (TAU * j as f32 / radial as f32).sin_cos();
            let dir = (normal * c + binormal * s).normalize_or_zero();
            geometry.vertices.push(Vertex::new(center + dir * radius, dir));
        }
    }

    let row = radial + 1;
    for i in 0..segments {
        for j in 0..radial {
            let a = i * row + j;
            let b = (i + 1) * row + j;
            geometry
                .indices
                .extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]);
        }
    }

    geometry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_valid(geometry: &Geometry) {
        let n = geometry.vertices.len() as u32;
        assert!(geometry.indices.iter().all(|&i| i < n));
        let stride = match geometry.topology {
            Topology::Triangles => 3,
            Topology::Lines => 2,
        };
        assert_eq!(geometry.indices.len() % stride, 0);
    }

    #[test]
    fn test_cutaway_ring_stays_out_of_gap() {
        let geometry = cutaway_ring(4.0, 5.0, 10.0, Sweep::with_gap(60f32.to_radians()), 32);
        assert_indices_valid(&geometry);
        // Nothing inside the wedge centred on +Y (±30°)
        for v in &geometry.vertices {
            let p = Vec3::from_array(v.position);
            let angle = p.y.atan2(p.x);
            assert!((angle - std::f32::consts::FRAC_PI_2).abs() >= 30f32.to_radians() - 1e-3);
        }
    }

    #[test]
    fn test_cutaway_ring_radial_extent() {
        let geometry = cutaway_ring(4.0, 5.0, 10.0, Sweep::with_gap(1.0), 16);
        for v in &geometry.vertices {
            let p = Vec3::from_array(v.position);
            let r = p.truncate().length();
            assert!(r > 3.99 && r < 5.01);
            assert!(p.z.abs() <= 5.0 + 1e-5);
        }
    }

    #[test]
    fn test_edges_are_lines() {
        let geometry = ring_edges(4.0, 5.0, 10.0, Sweep::with_gap(1.0), 16);
        assert_eq!(geometry.topology, Topology::Lines);
        assert_indices_valid(&geometry);
        assert_eq!(geometry.triangles().count(), 0);
    }

    #[test]
    fn test_support_grid_segment_count() {
        let geometry = support_grid(6.0, 12.0, 12, 4, 48);
        // 12 struts + 4 rings of 48 segments
        assert_eq!(geometry.indices.len() / 2, 12 + 4 * 48);
    }

    #[test]
    fn test_sphere_and_cone_valid() {
        let sphere = uv_sphere(1.0, 16, 12);
        assert_indices_valid(&sphere);
        for v in &sphere.vertices {
            assert!((Vec3::from_array(v.position).length() - 1.0).abs() < 1e-4);
        }
        let cone = cone(2.0, 10.0, 12);
        assert_indices_valid(&cone);
        assert!(cone.vertices.iter().all(|v| v.position[2] >= 0.0));
    }

    #[test]
    fn test_tube_follows_path() {
        let path: Vec<Vec3> = (0..70).map(|i| Vec3::X * i as f32 * 0.1).collect();
        let geometry = tube(&path, 56, 0.05, 6);
        assert_indices_valid(&geometry);
        assert_eq!(geometry.vertices.len(), 57 * 7);
        for v in &geometry.vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.y * p.y + p.z * p.z).sqrt() < 0.051);
        }
    }

    #[test]
    fn test_tube_degenerate_path() {
        assert!(tube(&[Vec3::ZERO], 56, 0.05, 6).is_empty());
    }
}
