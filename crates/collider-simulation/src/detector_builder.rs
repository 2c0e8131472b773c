//! Procedural detector geometry
//!
//! Ring layouts (ATLAS, CMS, ALICE) nest cutaway cylinders around the
//! interaction point. LHCb places the same ring primitive at successive
//! positions along the beam axis.
//!
//! Each layer is a group node whose children are the parts below. Every part
//! is tagged with the layer name so hover and picking can find it.

use collider_physics::{DetectorKind, LayerSpec};
use glam::Vec3;

use crate::mesh::{self, Sweep};
use crate::scene::{Material, NodeId, Scene};

/// Width of the wedge removed from every ring so the interior is visible
pub const CUTAWAY_ANGLE_DEG: f32 = 60.0;
pub const RING_SEGMENTS: u32 = 64;
/// Ring wall thickness relative to its radius
pub const RING_THICKNESS_RATIO: f32 = 0.08;
pub const MIN_RING_THICKNESS: f32 = 0.15;
/// Layers wider than this get end caps
pub const END_CAP_RADIUS_THRESHOLD: f32 = 5.0;
/// End caps leave a hole this fraction of the radius for the beam pipe
pub const END_CAP_HOLE_RATIO: f32 = 0.35;
/// Caps sit just outside the ring ends to avoid z-fighting with the ring faces
pub const END_CAP_GAP: f32 = 0.05;
pub const GRID_STRUTS: u32 = 12;
pub const GRID_RINGS: u32 = 4;
/// Hover multiplies baseline opacity by this
pub const HOVER_OPACITY_FACTOR: f32 = 2.0;

pub const MARKER_RADIUS: f32 = 0.35;
pub const MARKER_LINE_LENGTH: f32 = 2.5;
pub const MARKER_LINE_COUNT: u32 = 8;

/// Structural role of a mesh within a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Fill,
    Edges,
    Cap,
    Grid,
}

impl PartKind {
    /// Factor applied to the layer's nominal opacity
    pub fn opacity_scale(self) -> f32 {
        match self {
            PartKind::Fill => 0.6,
            PartKind::Edges => 0.9,
            PartKind::Cap => 0.4,
            PartKind::Grid => 0.3,
        }
    }

    pub fn base_opacity(self, nominal: f32) -> f32 {
        nominal * self.opacity_scale()
    }
}

#[derive(Debug, Clone)]
pub struct DetectorLayer {
    pub name: &'static str,
    pub root: NodeId,
    pub parts: Vec<(NodeId, PartKind)>,
    /// World-space point the UI label is drawn at
    pub label_anchor: Vec3,
}

/// Geometry built for one detector configuration
#[derive(Debug, Clone, Default)]
pub struct BuiltDetector {
    pub kind: Option<DetectorKind>,
    pub layers: Vec<DetectorLayer>,
    pub marker: Option<NodeId>,
}

impl BuiltDetector {
    pub fn layer(&self, name: &str) -> Option<&DetectorLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// Dispose every layer and the marker
    pub fn release(self, scene: &mut Scene) {
        for layer in &self.layers {
            scene.dispose(layer.root);
        }
        if let Some(marker) = self.marker {
            scene.dispose(marker);
        }
        if let Some(kind) = self.kind {
            log::debug!("Released {} detector ({} layers)", kind, self.layers.len());
        }
    }

    /// Scale every part of `name` to `factor` × its baseline opacity
    pub fn highlight(&self, scene: &mut Scene, name: &str) {
        self.for_each_material(scene, name, |material| {
            material.highlight(HOVER_OPACITY_FACTOR)
        });
    }

    /// Return every part of `name` to its baseline opacity
    pub fn restore(&self, scene: &mut Scene, name: &str) {
        self.for_each_material(scene, name, |material| material.restore());
    }

    fn for_each_material(
        &self,
        scene: &mut Scene,
        name: &str,
        mut apply: impl FnMut(&mut Material),
    ) {
        let Some(layer) = self.layer(name) else {
            return;
        };
        for &(node, _) in &layer.parts {
            if let Some(material) = scene.node_material_mut(node) {
                apply(material);
            }
        }
    }
}

/// Build the layers (and marker, where applicable) for `kind`
pub fn build(scene: &mut Scene, kind: DetectorKind) -> BuiltDetector {
    let layers = kind
        .layers()
        .iter()
        .map(|spec| build_layer(scene, spec))
        .collect();

    let marker = kind
        .marker_color()
        .map(|color| build_collision_marker(scene, color));

    let built = BuiltDetector {
        kind: Some(kind),
        layers,
        marker,
    };
    log::info!(
        "✓ Built {} detector: {} layers, {} geometries resident",
        kind,
        built.layers.len(),
        scene.stats().geometries
    );
    built
}

/// Build by configuration name. Unknown names yield an empty detector.
pub fn build_named(scene: &mut Scene, name: &str) -> BuiltDetector {
    match name.parse::<DetectorKind>() {
        Ok(kind) => build(scene, kind),
        Err(err) => {
            log::warn!("{err}; no detector geometry built");
            BuiltDetector::default()
        }
    }
}

fn ring_thickness(radius: f32) -> f32 {
    (radius * RING_THICKNESS_RATIO).max(MIN_RING_THICKNESS)
}

fn add_part(
    scene: &mut Scene,
    parent: NodeId,
    spec: &LayerSpec,
    kind: PartKind,
    geometry: mesh::Geometry,
    parts: &mut Vec<(NodeId, PartKind)>,
) {
    let material = Material::new(spec.color, kind.base_opacity(spec.opacity));
    let node = scene.add_mesh(parent, geometry, material);
    if let Some(n) = scene.node_mut(node) {
        n.layer = Some(spec.name);
        n.pickable = matches!(kind, PartKind::Fill | PartKind::Cap);
    }
    parts.push((node, kind));
}

fn build_layer(scene: &mut Scene, spec: &LayerSpec) -> DetectorLayer {
    let root = scene.add_group(scene.root());
    let offset = spec.axial_offset.unwrap_or(0.0);
    scene.set_translation(root, Vec3::Z * offset);
    if let Some(node) = scene.node_mut(root) {
        node.layer = Some(spec.name);
    }

    let sweep = Sweep::with_gap(CUTAWAY_ANGLE_DEG.to_radians());
    let outer = spec.radius;
    let inner = (outer - ring_thickness(outer)).max(0.05);
    let mut parts = Vec::new();

    add_part(
        scene,
        root,
        spec,
        PartKind::Fill,
        mesh::cutaway_ring(inner, outer, spec.length, sweep, RING_SEGMENTS),
        &mut parts,
    );
    add_part(
        scene,
        root,
        spec,
        PartKind::Edges,
        mesh::ring_edges(inner, outer, spec.length, sweep, RING_SEGMENTS),
        &mut parts,
    );

    if spec.axial_offset.is_none() && spec.radius > END_CAP_RADIUS_THRESHOLD {
        let hole = outer * END_CAP_HOLE_RATIO;
        for side in [-1.0, 1.0] {
            add_part(
                scene,
                root,
                spec,
                PartKind::Cap,
                mesh::annulus_sector(
                    hole,
                    outer,
                    side * (spec.length / 2.0 + END_CAP_GAP),
                    side,
                    sweep,
                    RING_SEGMENTS,
                ),
                &mut parts,
            );
        }
    }

    add_part(
        scene,
        root,
        spec,
        PartKind::Grid,
        mesh::support_grid(outer * 1.01, spec.length, GRID_STRUTS, GRID_RINGS, RING_SEGMENTS),
        &mut parts,
    );

    DetectorLayer {
        name: spec.name,
        root,
        parts,
        label_anchor: Vec3::new(0.0, outer + 0.5, offset),
    }
}

/// Small emissive sphere at the interaction point with radiating guide lines
fn build_collision_marker(scene: &mut Scene, color: [f32; 3]) -> NodeId {
    let root = scene.add_group(scene.root());
    scene.add_mesh(
        root,
        mesh::uv_sphere(MARKER_RADIUS, 16, 12),
        Material::emissive(color, 0.9),
    );

    let lines: Vec<(Vec3, Vec3)> = (0..MARKER_LINE_COUNT)
        .map(|i| {
            let angle = std::f32::consts::TAU * i as f32 / MARKER_LINE_COUNT as f32;
            let dir = Vec3::new(angle.cos(), angle.sin(), 0.0);
            (dir * MARKER_RADIUS, dir * MARKER_LINE_LENGTH)
        })
        .collect();
    scene.add_mesh(
        root,
        mesh::line_segments(&lines),
        Material::emissive(color, 0.5),
    );
    root
}
