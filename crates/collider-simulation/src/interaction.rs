//! Pointer handling: orbit drag, wheel zoom, layer hover and click selection

use std::sync::mpsc::Sender;

use collider_physics::DetectorKind;
use glam::Vec2;

use crate::detector_builder::BuiltDetector;
use crate::picking::{pick_layer, PickHit};
use crate::scene::Scene;

/// A press and release closer than this (pixels) counts as a click
pub const CLICK_TOLERANCE: f32 = 5.0;

/// Raised when the user clicks a detector layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSelection {
    pub layer_name: String,
    pub detector: Option<DetectorKind>,
}

/// Screen-space label for one detector layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerLabel {
    pub name: &'static str,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    origin: Vec2,
    last: Vec2,
}

pub struct InteractionController {
    selections: Sender<LayerSelection>,
    labels_visible: bool,
    /// Last pointer position over the surface
    pointer: Option<Vec2>,
    drag: Option<Drag>,
    hovered: Option<&'static str>,
}

impl InteractionController {
    pub fn new(selections: Sender<LayerSelection>) -> Self {
        Self {
            selections,
            labels_visible: false,
            pointer: None,
            drag: None,
            hovered: None,
        }
    }

    pub fn labels_visible(&self) -> bool {
        self.labels_visible
    }

    pub fn hovered(&self) -> Option<&'static str> {
        self.hovered
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Flip hover and label mode. Turning it off reverts any highlight.
    pub fn toggle_labels(&mut self, scene: &mut Scene, detector: &BuiltDetector) {
        self.labels_visible = !self.labels_visible;
        if !self.labels_visible {
            self.set_hovered(scene, detector, None);
        }
        log::debug!("Layer labels {}", if self.labels_visible { "on" } else { "off" });
    }

    pub fn pointer_down(&mut self, position: Vec2) {
        self.pointer = Some(position);
        self.drag = Some(Drag {
            origin: position,
            last: position,
        });
    }

    /// Track the pointer; rotates the camera while dragging
    pub fn pointer_move(&mut self, scene: &mut Scene, position: Vec2) {
        self.pointer = Some(position);
        if let Some(drag) = &mut self.drag {
            let delta = position - drag.last;
            scene.camera.state.rotate(delta.x, delta.y);
            drag.last = position;
        }
    }

    /// End a drag. A release within [`CLICK_TOLERANCE`] of the press over a
    /// layer, while labels are on, sends one [`LayerSelection`].
    pub fn pointer_up(&mut self, scene: &Scene, detector: &BuiltDetector, position: Vec2) -> bool {
        self.pointer = Some(position);
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if !self.labels_visible || drag.origin.distance(position) >= CLICK_TOLERANCE {
            return false;
        }
        let Some(hit) = pick_at(scene, position) else {
            return false;
        };

        let selection = LayerSelection {
            layer_name: hit.layer.to_string(),
            detector: detector.kind,
        };
        log::debug!("Layer selected: {}", selection.layer_name);
        if self.selections.send(selection).is_err() {
            log::warn!("Layer selection receiver dropped");
            return false;
        }
        true
    }

    /// The pointer left the surface
    pub fn pointer_left(&mut self, scene: &mut Scene, detector: &BuiltDetector) {
        self.pointer = None;
        self.drag = None;
        self.set_hovered(scene, detector, None);
    }

    /// Zoom by a wheel delta. Only consumed while the pointer is over the
    /// surface; otherwise returns `false` so the host can scroll.
    pub fn wheel(&mut self, scene: &mut Scene, delta_y: f32) -> bool {
        if self.pointer.is_none() {
            return false;
        }
        scene.camera.state.zoom(delta_y);
        true
    }

    /// Re-cast the hover ray and move the highlight if the layer changed
    pub fn update_hover(&mut self, scene: &mut Scene, detector: &BuiltDetector) {
        let layer = match (self.labels_visible, self.drag, self.pointer) {
            (true, None, Some(pointer)) => pick_at(scene, pointer).map(|hit| hit.layer),
            (true, Some(_), _) => return,
            _ => None,
        };
        self.set_hovered(scene, detector, layer);
    }

    fn set_hovered(
        &mut self,
        scene: &mut Scene,
        detector: &BuiltDetector,
        layer: Option<&'static str>,
    ) {
        if self.hovered == layer {
            return;
        }
        if let Some(previous) = self.hovered {
            detector.restore(scene, previous);
        }
        if let Some(next) = layer {
            detector.highlight(scene, next);
            log::debug!("Hovering {next}");
        }
        self.hovered = layer;
    }

    /// Forget the current highlight without touching materials, for when the
    /// detector it referred to has been released
    pub fn forget_hover(&mut self) {
        self.hovered = None;
    }

    /// Project each layer's anchor to screen space. Empty while labels are off.
    pub fn layer_labels(&self, scene: &Scene, detector: &BuiltDetector) -> Vec<LayerLabel> {
        if !self.labels_visible {
            return Vec::new();
        }
        let viewport = scene.viewport();
        detector
            .layers
            .iter()
            .filter_map(|layer| {
                let position = scene.camera.project(
                    layer.label_anchor,
                    viewport.width as f32,
                    viewport.height as f32,
                )?;
                Some(LayerLabel {
                    name: layer.name,
                    position,
                })
            })
            .collect()
    }
}

/// Layer under a pixel of the scene's viewport
pub fn pick_at(scene: &Scene, pixel: Vec2) -> Option<PickHit> {
    let viewport = scene.viewport();
    let ray = scene
        .camera
        .ray_from_screen(pixel, viewport.width as f32, viewport.height as f32);
    pick_layer(scene, &ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector_builder::build;
    use crate::scene::MountTarget;
    use std::sync::mpsc;

    const SIZE: MountTarget = MountTarget {
        width: 800,
        height: 600,
    };

    fn setup() -> (
        Scene,
        BuiltDetector,
        InteractionController,
        mpsc::Receiver<LayerSelection>,
    ) {
        let mut scene = Scene::initialize(Some(SIZE)).unwrap();
        let detector = build(&mut scene, DetectorKind::Atlas);
        let (tx, rx) = mpsc::channel();
        (scene, detector, InteractionController::new(tx), rx)
    }

    fn grid(step: usize) -> impl Iterator<Item = Vec2> {
        (0..SIZE.height).step_by(step).flat_map(move |y| {
            (0..SIZE.width)
                .step_by(step)
                .map(move |x| Vec2::new(x as f32, y as f32))
        })
    }

    /// First pixel on a coarse grid whose ray hits a layer
    fn layer_pixel(scene: &Scene) -> (Vec2, &'static str) {
        grid(20)
            .find_map(|pixel| pick_at(scene, pixel).map(|hit| (pixel, hit.layer)))
            .expect("detector visible from the default camera")
    }

    #[test]
    fn test_short_click_selects_once() {
        let (mut scene, detector, mut controller, rx) = setup();
        controller.toggle_labels(&mut scene, &detector);
        let (pixel, layer) = layer_pixel(&scene);

        controller.pointer_down(pixel - Vec2::new(3.0, 0.0));
        assert!(controller.pointer_up(&scene, &detector, pixel));

        let selection = rx.try_recv().unwrap();
        assert_eq!(selection.layer_name, layer);
        assert_eq!(selection.detector, Some(DetectorKind::Atlas));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drag_does_not_select() {
        let (mut scene, detector, mut controller, rx) = setup();
        controller.toggle_labels(&mut scene, &detector);
        let (pixel, _) = layer_pixel(&scene);

        controller.pointer_down(pixel - Vec2::new(5.0, 0.0));
        assert!(!controller.pointer_up(&scene, &detector, pixel));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_no_selection_with_labels_off() {
        let (scene, detector, mut controller, rx) = setup();
        let (pixel, _) = layer_pixel(&scene);
        controller.pointer_down(pixel);
        assert!(!controller.pointer_up(&scene, &detector, pixel));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_hover_highlights_and_restores() {
        let (mut scene, detector, mut controller, _rx) = setup();
        let (pixel, layer) = layer_pixel(&scene);
        let part = detector.layer(layer).unwrap().parts[0].0;
        let base = scene.node_material_mut(part).unwrap().base_opacity;

        // Labels off: no ray casts
        controller.pointer_move(&mut scene, pixel);
        controller.update_hover(&mut scene, &detector);
        assert_eq!(controller.hovered(), None);

        controller.toggle_labels(&mut scene, &detector);
        controller.update_hover(&mut scene, &detector);
        assert_eq!(controller.hovered(), Some(layer));
        let lit = scene.node_material_mut(part).unwrap().opacity;
        assert!((lit - (base * 2.0).min(1.0)).abs() < 1e-6);

        controller.pointer_left(&mut scene, &detector);
        assert_eq!(controller.hovered(), None);
        assert_eq!(scene.node_material_mut(part).unwrap().opacity, base);
    }

    #[test]
    fn test_hover_frozen_while_dragging() {
        let (mut scene, detector, mut controller, _rx) = setup();
        controller.toggle_labels(&mut scene, &detector);
        let (pixel, layer) = layer_pixel(&scene);
        let (other_pixel, other_layer) = grid(10)
            .find_map(|p| {
                pick_at(&scene, p)
                    .filter(|hit| hit.layer != layer)
                    .map(|hit| (p, hit.layer))
            })
            .expect("a second layer visible from the default camera");

        controller.pointer_move(&mut scene, pixel);
        controller.update_hover(&mut scene, &detector);
        assert_eq!(controller.hovered(), Some(layer));
        let part = detector.layer(layer).unwrap().parts[0].0;
        let lit = scene.node_material_mut(part).unwrap().opacity;

        controller.pointer_down(pixel);
        controller.pointer_move(&mut scene, other_pixel);
        assert!(controller.is_dragging());
        controller.update_hover(&mut scene, &detector);

        assert_eq!(controller.hovered(), Some(layer));
        assert_eq!(scene.node_material_mut(part).unwrap().opacity, lit);
        let other = detector.layer(other_layer).unwrap().parts[0].0;
        let other_material = *scene.node_material_mut(other).unwrap();
        assert_eq!(other_material.opacity, other_material.base_opacity);
    }

    #[test]
    fn test_wheel_only_over_surface() {
        let (mut scene, _detector, mut controller, _rx) = setup();
        let before = scene.camera.state.distance;
        assert!(!controller.wheel(&mut scene, 100.0));
        assert_eq!(scene.camera.state.distance, before);

        controller.pointer_move(&mut scene, Vec2::new(10.0, 10.0));
        assert!(controller.wheel(&mut scene, 100.0));
        assert!(scene.camera.state.distance > before);
    }

    #[test]
    fn test_labels_follow_toggle() {
        let (mut scene, detector, mut controller, _rx) = setup();
        assert!(controller.layer_labels(&scene, &detector).is_empty());
        controller.toggle_labels(&mut scene, &detector);
        let labels = controller.layer_labels(&scene, &detector);
        assert!(!labels.is_empty());
        assert!(labels.len() <= detector.layers.len());
    }
}
