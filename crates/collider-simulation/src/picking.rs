//! CPU ray casting against detector layers

use glam::Vec3;

use crate::camera::Ray;
use crate::scene::{NodeId, Scene};

/// Nearest layer surface under a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    pub layer: &'static str,
    pub distance: f32,
}

/// Möller–Trumbore; returns the ray parameter of the hit. Double-sided.
pub fn intersect_triangle(ray: &Ray, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// Closest pickable, visible, layer-tagged mesh hit by `ray`
pub fn pick_layer(scene: &Scene, ray: &Ray) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;

    for drawable in scene.drawables() {
        let Some(node) = scene.node(drawable.node) else {
            continue;
        };
        let (true, Some(layer)) = (node.pickable, node.layer) else {
            continue;
        };
        let Some(geometry) = scene.geometry(drawable.geometry) else {
            continue;
        };

        for triangle in geometry.triangles() {
            let world = triangle.map(|v| drawable.world.transform_point3(v));
            let Some(distance) = intersect_triangle(ray, world) else {
                continue;
            };
            if best.is_none_or(|hit| distance < hit.distance) {
                best = Some(PickHit {
                    node: drawable.node,
                    layer,
                    distance,
                });
            }
        }
    }

    best
}
