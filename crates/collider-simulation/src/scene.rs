//! Scene graph and resource ownership
//!
//! The scene owns every [`Geometry`] and [`Material`] it hands out. Each one is
//! attached to exactly one node and lives until that node (or an ancestor) is
//! passed to [`Scene::dispose`], which is the only way to destroy anything.
//! Released geometry ids are queued so a GPU backend can drop the matching
//! buffers on its next frame (see [`Scene::drain_released`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::{Mat4, Quat, Vec3};

use crate::camera::Camera;
use crate::mesh::Geometry;

/// Shared by every scene in the process; ids are never reused, including
/// across a remount.
static NEXT_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

/// Surface appearance of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 3],
    pub opacity: f32,
    /// Opacity the material was created with; hover highlighting scales from
    /// this value and restores it exactly.
    pub base_opacity: f32,
    /// Emissive materials ignore lighting
    pub emissive: bool,
}

impl Material {
    pub fn new(color: [f32; 3], opacity: f32) -> Self {
        Self {
            color,
            opacity,
            base_opacity: opacity,
            emissive: false,
        }
    }

    pub fn emissive(color: [f32; 3], opacity: f32) -> Self {
        Self {
            emissive: true,
            ..Self::new(color, opacity)
        }
    }

    pub fn highlight(&mut self, factor: f32) {
        self.opacity = (self.base_opacity * factor).min(1.0);
    }

    pub fn restore(&mut self) {
        self.opacity = self.base_opacity;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub transform: Transform,
    pub visible: bool,
    /// Detector layer this node belongs to, used for hover and picking
    pub layer: Option<&'static str>,
    /// Whether ray casts test this node's triangles
    pub pickable: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    geometry: Option<GeometryId>,
    material: Option<MaterialId>,
}

impl Node {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            transform: Transform::default(),
            visible: true,
            layer: None,
            pickable: false,
            parent,
            children: Vec::new(),
            geometry: None,
            material: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn geometry(&self) -> Option<GeometryId> {
        self.geometry
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Point { position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Size of the surface the scene is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTarget {
    pub width: u32,
    pub height: u32,
}

/// Counts of resources currently owned by the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceStats {
    /// Nodes excluding the root
    pub nodes: usize,
    pub geometries: usize,
    pub materials: usize,
}

/// A mesh ready to draw, resolved to world space
#[derive(Debug, Clone, Copy)]
pub struct Drawable {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub material: Material,
    pub world: Mat4,
}

pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    geometries: HashMap<GeometryId, Geometry>,
    materials: HashMap<MaterialId, Material>,
    root: NodeId,
    released: Vec<GeometryId>,
    lights: Vec<Light>,
    viewport: MountTarget,
    pub camera: Camera,
}

impl Scene {
    /// Create a scene for `target`. Returns `None` when there is nothing to
    /// mount into (absent or zero-sized target).
    pub fn initialize(target: Option<MountTarget>) -> Option<Self> {
        let Some(target) = target else {
            log::warn!("Scene mount target missing; visualization disabled");
            return None;
        };
        if target.width == 0 || target.height == 0 {
            log::warn!(
                "Scene mount target has no area ({}x{}); visualization disabled",
                target.width,
                target.height
            );
            return None;
        }

        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new(None));

        let lights = vec![
            Light {
                kind: LightKind::Ambient,
                color: [1.0, 1.0, 1.0],
                intensity: 0.4,
            },
            Light {
                kind: LightKind::Point {
                    position: Vec3::new(20.0, 20.0, 20.0),
                },
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            },
            Light {
                kind: LightKind::Point {
                    position: Vec3::new(-20.0, -10.0, -20.0),
                },
                color: [0.4, 0.6, 1.0],
                intensity: 0.5,
            },
        ];

        log::info!("✓ Scene initialized ({}x{})", target.width, target.height);

        Some(Self {
            nodes,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            root,
            released: Vec::new(),
            lights,
            viewport: target,
            camera: Camera::new(target.width, target.height),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Current surface size in pixels
    pub fn viewport(&self) -> MountTarget {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.viewport = MountTarget { width, height };
            self.camera.resize(width, height);
        }
    }

    fn next(&mut self) -> u32 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    fn attach(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.next());
        let parent = if self.nodes.contains_key(&parent) {
            parent
        } else {
            self.root
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        self.nodes.insert(id, Node { parent: Some(parent), ..node });
        id
    }

    /// Empty node used to group meshes under one transform
    pub fn add_group(&mut self, parent: NodeId) -> NodeId {
        self.attach(parent, Node::new(None))
    }

    /// Take ownership of `geometry` and `material` and attach them as a new node
    pub fn add_mesh(&mut self, parent: NodeId, geometry: Geometry, material: Material) -> NodeId {
        let geometry_id = GeometryId(self.next());
        let material_id = MaterialId(self.next());
        self.geometries.insert(geometry_id, geometry);
        self.materials.insert(material_id, material);

        let mut node = Node::new(None);
        node.geometry = Some(geometry_id);
        node.material = Some(material_id);
        self.attach(parent, node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn node_material_mut(&mut self, id: NodeId) -> Option<&mut Material> {
        let material = self.nodes.get(&id)?.material?;
        self.materials.get_mut(&material)
    }

    pub fn set_scale(&mut self, id: NodeId, scale: f32) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.transform.scale = Vec3::splat(scale);
        }
    }

    pub fn set_translation(&mut self, id: NodeId, translation: Vec3) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.transform.translation = translation;
        }
    }

    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        if let Some(material) = self.node_material_mut(id) {
            material.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    /// The node and all of its descendants, parents before children
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Release the geometry and material of every node under `id` (inclusive)
    /// and detach the subtree from its parent.
    ///
    /// Unknown or already-disposed ids are ignored. Disposing the root releases
    /// its children but keeps the root itself. Returns whether anything was
    /// released.
    pub fn dispose(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        if id == self.root {
            let children = self.nodes[&id].children.clone();
            return children.into_iter().fold(false, |any, child| self.dispose(child) || any);
        }

        for node_id in self.subtree(id) {
            let Some(node) = self.nodes.remove(&node_id) else {
                continue;
            };
            if let Some(geometry) = node.geometry {
                if self.geometries.remove(&geometry).is_some() {
                    self.released.push(geometry);
                }
            }
            if let Some(material) = node.material {
                self.materials.remove(&material);
            }
            if node_id == id {
                if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
                    parent.children.retain(|&child| child != id);
                }
            }
        }
        true
    }

    /// Dispose everything attached to the root
    pub fn release_all(&mut self) {
        let stats = self.stats();
        self.dispose(self.root);
        log::info!(
            "Scene released {} nodes, {} geometries, {} materials",
            stats.nodes,
            stats.geometries,
            stats.materials
        );
    }

    /// Geometry ids released since the last call
    pub fn drain_released(&mut self) -> Vec<GeometryId> {
        std::mem::take(&mut self.released)
    }

    pub fn stats(&self) -> ResourceStats {
        ResourceStats {
            nodes: self.nodes.len() - 1,
            geometries: self.geometries.len(),
            materials: self.materials.len(),
        }
    }

    /// World transform of `id`, walking up the parent chain
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(&c)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// A node is drawn only if it and every ancestor are visible
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            match self.nodes.get(&c) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Visible meshes in traversal order
    pub fn drawables(&self) -> Vec<Drawable> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            if let (Some(geometry), Some(material)) = (
                node.geometry,
                node.material.and_then(|m| self.materials.get(&m)),
            ) {
                out.push(Drawable {
                    node: id,
                    geometry,
                    material: *material,
                    world,
                });
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{uv_sphere, Geometry};

    fn scene() -> Scene {
        Scene::initialize(Some(MountTarget {
            width: 800,
            height: 600,
        }))
        .unwrap()
    }

    fn sphere() -> Geometry {
        uv_sphere(1.0, 8, 6)
    }

    #[test]
    fn test_initialize_requires_target() {
        assert!(Scene::initialize(None).is_none());
        assert!(Scene::initialize(Some(MountTarget { width: 0, height: 10 })).is_none());
    }

    #[test]
    fn test_initialize_creates_three_lights() {
        let scene = scene();
        let ambient = scene
            .lights()
            .iter()
            .filter(|l| l.kind == LightKind::Ambient)
            .count();
        assert_eq!(scene.lights().len(), 3);
        assert_eq!(ambient, 1);
        assert_eq!(scene.stats(), ResourceStats::default());
    }

    #[test]
    fn test_dispose_releases_subtree() {
        let mut scene = scene();
        let group = scene.add_group(scene.root());
        let a = scene.add_mesh(group, sphere(), Material::new([1.0; 3], 0.5));
        let b = scene.add_mesh(a, sphere(), Material::new([1.0; 3], 0.5));
        assert_eq!(scene.stats().geometries, 2);

        assert!(scene.dispose(group));
        assert_eq!(scene.stats(), ResourceStats::default());
        assert!(!scene.contains(b));
        assert!(scene.node(scene.root()).unwrap().children().is_empty());
        assert_eq!(scene.drain_released().len(), 2);
        assert!(scene.drain_released().is_empty());
    }

    #[test]
    fn test_geometry_ids_unique_across_scenes() {
        let mut first = scene();
        let a = first.add_mesh(first.root(), sphere(), Material::new([1.0; 3], 1.0));
        let first_geometry = first.node(a).unwrap().geometry().unwrap();
        first.release_all();
        drop(first);

        let mut second = scene();
        let b = second.add_mesh(second.root(), sphere(), Material::new([1.0; 3], 1.0));
        let second_geometry = second.node(b).unwrap().geometry().unwrap();
        assert_ne!(first_geometry, second_geometry);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut scene = scene();
        let mesh = scene.add_mesh(scene.root(), sphere(), Material::new([1.0; 3], 1.0));
        assert!(scene.dispose(mesh));
        assert!(!scene.dispose(mesh));
        assert_eq!(scene.drain_released().len(), 1);
    }

    #[test]
    fn test_dispose_child_then_parent() {
        let mut scene = scene();
        let group = scene.add_group(scene.root());
        let child = scene.add_mesh(group, sphere(), Material::new([1.0; 3], 1.0));
        scene.dispose(child);
        assert!(scene.node(group).unwrap().children().is_empty());
        scene.dispose(group);
        assert_eq!(scene.stats(), ResourceStats::default());
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = scene();
        let group = scene.add_group(scene.root());
        scene.set_translation(group, Vec3::new(0.0, 0.0, 5.0));
        let mesh = scene.add_mesh(group, sphere(), Material::new([1.0; 3], 1.0));
        scene.set_scale(mesh, 2.0);

        let p = scene.world_matrix(mesh).transform_point3(Vec3::X);
        assert!((p - Vec3::new(2.0, 0.0, 5.0)).length() < 1e-5);

        let drawables = scene.drawables();
        assert_eq!(drawables.len(), 1);
        assert_eq!(drawables[0].world, scene.world_matrix(mesh));
    }

    #[test]
    fn test_hidden_parent_hides_children() {
        let mut scene = scene();
        let group = scene.add_group(scene.root());
        let mesh = scene.add_mesh(group, sphere(), Material::new([1.0; 3], 1.0));
        scene.node_mut(group).unwrap().visible = false;
        assert!(!scene.is_visible(mesh));
        assert!(scene.drawables().is_empty());
    }

    #[test]
    fn test_highlight_restores_exactly() {
        let mut material = Material::new([1.0; 3], 0.35 * 0.6);
        let base = material.opacity;
        material.highlight(2.0);
        assert_eq!(material.opacity, (base * 2.0).min(1.0));
        material.restore();
        assert_eq!(material.opacity, base);
    }

    #[test]
    fn test_release_all_keeps_root() {
        let mut scene = scene();
        for _ in 0..3 {
            scene.add_mesh(scene.root(), sphere(), Material::new([1.0; 3], 1.0));
        }
        scene.release_all();
        assert_eq!(scene.stats(), ResourceStats::default());
        assert!(scene.contains(scene.root()));
    }
}
