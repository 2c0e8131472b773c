//! Top-level entry point driven by the host UI
//!
//! [`ColliderVisualizer`] ties the scene, detector geometry, animation loop and
//! pointer interaction together behind the mount / run / frame calls a window
//! makes. Every operation is a no-op while unmounted.

use std::sync::mpsc::Sender;
use std::time::Duration;

use collider_physics::{
    DetectorKind, EventSummary, MagneticFieldTable, SimulationConfig, SummaryLabels,
};
use glam::{Mat4, Vec2, Vec3};

use crate::animation::{AnimationLoop, Phase};
use crate::detector_builder::{self, BuiltDetector};
use crate::generator::ParticleGenerator;
use crate::interaction::{InteractionController, LayerLabel, LayerSelection};
use crate::scene::{GeometryId, MountTarget, ResourceStats, Scene};

/// Detector shown before the first run names one
pub const DEFAULT_DETECTOR: DetectorKind = DetectorKind::Atlas;

/// Result of one frame, consumed by the renderer and UI
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Simulation phase that ran this frame, if any
    pub phase: Option<Phase>,
    pub view_projection: Mat4,
    pub camera_position: Vec3,
    pub labels: Vec<LayerLabel>,
}

pub struct ColliderVisualizer {
    fields: MagneticFieldTable,
    seed: u64,
    runs: u64,
    scene: Option<Scene>,
    detector: BuiltDetector,
    /// Name of the requested configuration, canonical when recognised
    detector_name: String,
    animation: AnimationLoop,
    interaction: InteractionController,
    summary: Option<EventSummary>,
    /// Geometry released by scenes that no longer exist
    released: Vec<GeometryId>,
}

impl ColliderVisualizer {
    /// `selections` receives one message per qualifying layer click
    pub fn new(fields: MagneticFieldTable, selections: Sender<LayerSelection>, seed: u64) -> Self {
        Self {
            animation: AnimationLoop::new(ParticleGenerator::new(fields), seed),
            fields,
            seed,
            runs: 0,
            scene: None,
            detector: BuiltDetector::default(),
            detector_name: DEFAULT_DETECTOR.name().to_string(),
            interaction: InteractionController::new(selections),
            summary: None,
            released: Vec::new(),
        }
    }

    /// Create the scene and build the active detector. Returns whether the
    /// visualizer is mounted afterwards.
    pub fn mount(&mut self, target: Option<MountTarget>) -> bool {
        if self.scene.is_some() {
            self.unmount();
        }
        let Some(mut scene) = Scene::initialize(target) else {
            return false;
        };

        self.detector = detector_builder::build_named(&mut scene, &self.detector_name);
        self.animation = AnimationLoop::new(ParticleGenerator::new(self.fields), self.seed);
        self.interaction.forget_hover();
        self.scene = Some(scene);
        true
    }

    /// Stop the loop and release every resource the scene holds
    pub fn unmount(&mut self) {
        let Some(mut scene) = self.scene.take() else {
            return;
        };
        self.animation.dispose(&mut scene);
        std::mem::take(&mut self.detector).release(&mut scene);
        self.interaction.forget_hover();
        scene.release_all();
        self.released.extend(scene.drain_released());
        self.summary = None;
        log::info!("Visualizer unmounted");
    }

    /// Geometry ids released by an unmount. A renderer must drop their
    /// buffers since the scene that queued them is gone.
    pub fn take_released(&mut self) -> Vec<GeometryId> {
        std::mem::take(&mut self.released)
    }

    pub fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    pub fn detector(&self) -> &BuiltDetector {
        &self.detector
    }

    pub fn detector_name(&self) -> &str {
        &self.detector_name
    }

    pub fn animation(&self) -> &AnimationLoop {
        &self.animation
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn magnetic_field(&self) -> f32 {
        self.fields.field(self.detector.kind)
    }

    pub fn summary(&self) -> Option<&EventSummary> {
        self.summary.as_ref()
    }

    pub fn summary_labels(&self) -> Option<SummaryLabels> {
        self.summary.as_ref().map(EventSummary::labels)
    }

    pub fn stats(&self) -> ResourceStats {
        self.scene.as_ref().map(Scene::stats).unwrap_or_default()
    }

    /// Rebuild detector geometry when `name` differs from the active one.
    /// Unknown names leave an empty detector.
    pub fn set_detector(&mut self, name: &str) {
        let canonical = name
            .parse::<DetectorKind>()
            .map(|kind| kind.name().to_string())
            .unwrap_or_else(|_| name.to_string());
        if canonical == self.detector_name {
            return;
        }
        self.detector_name = canonical;

        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        std::mem::take(&mut self.detector).release(scene);
        self.interaction.forget_hover();
        self.detector = detector_builder::build_named(scene, &self.detector_name);
    }

    /// Start a run. Any run in progress is reset first so nothing from it
    /// survives into the new one.
    pub fn run_simulation(&mut self, config: SimulationConfig) {
        if self.scene.is_none() {
            log::warn!("run_simulation ignored: visualizer not mounted");
            return;
        }
        self.clear_animation();

        if let Some(name) = config.detector.as_deref() {
            self.set_detector(name);
        }

        let resolved = config.resolve();
        let summary = EventSummary::new(&resolved, self.magnetic_field());
        self.summary = Some(summary);
        self.runs += 1;

        if let Some(scene) = self.scene.as_mut() {
            self.animation
                .start(scene, self.detector.kind, resolved.track_count);
        }
        log::info!(
            "Run #{}: {} at {:.2} TeV, {} tracks ({})",
            self.runs,
            self.detector_name,
            resolved.energy,
            resolved.track_count,
            resolved.event_type
        );
    }

    /// Dispose live entities and drop the summary. Detector geometry and the
    /// camera are left as they are.
    pub fn clear_animation(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            self.animation.clear(scene);
        }
        self.summary = None;
    }

    pub fn toggle_pause(&mut self) {
        self.animation.toggle_pause();
    }

    pub fn step(&mut self) {
        self.animation.request_step();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(scene) = self.scene.as_mut() {
            scene.resize(width, height);
        }
    }

    pub fn toggle_labels(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            self.interaction.toggle_labels(scene, &self.detector);
        }
    }

    pub fn pointer_down(&mut self, position: Vec2) {
        if self.scene.is_some() {
            self.interaction.pointer_down(position);
        }
    }

    pub fn pointer_move(&mut self, position: Vec2) {
        if let Some(scene) = self.scene.as_mut() {
            self.interaction.pointer_move(scene, position);
        }
    }

    /// Returns whether a layer selection was sent
    pub fn pointer_up(&mut self, position: Vec2) -> bool {
        match self.scene.as_ref() {
            Some(scene) => self.interaction.pointer_up(scene, &self.detector, position),
            None => false,
        }
    }

    pub fn pointer_left(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            self.interaction.pointer_left(scene, &self.detector);
        }
    }

    /// Returns whether the wheel was consumed as a zoom
    pub fn wheel(&mut self, delta_y: f32) -> bool {
        match self.scene.as_mut() {
            Some(scene) => self.interaction.wheel(scene, delta_y),
            None => false,
        }
    }

    /// Advance one display frame: simulation, then camera and hover, then
    /// labels. The caller renders the scene after this returns.
    pub fn frame(&mut self, elapsed: Duration) -> Option<FrameOutput> {
        let scene = self.scene.as_mut()?;
        if self.animation.is_disposed() {
            return None;
        }

        self.animation.advance_flash(scene, elapsed);
        let phase = self.animation.tick(scene);

        let view_projection = scene.camera.build_view_projection_matrix();
        let camera_position = scene.camera.position();
        self.interaction.update_hover(scene, &self.detector);

        let labels = self.interaction.layer_labels(scene, &self.detector);

        Some(FrameOutput {
            phase,
            view_projection,
            camera_position,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const TARGET: Option<MountTarget> = Some(MountTarget {
        width: 800,
        height: 600,
    });
    const FRAME: Duration = Duration::from_millis(16);

    fn mounted() -> (ColliderVisualizer, mpsc::Receiver<LayerSelection>) {
        let (tx, rx) = mpsc::channel();
        let mut viz = ColliderVisualizer::new(MagneticFieldTable::default(), tx, 7);
        assert!(viz.mount(TARGET));
        (viz, rx)
    }

    fn standard_run() -> SimulationConfig {
        SimulationConfig::default()
            .with_detector("ATLAS")
            .with_energy(13.0)
            .with_track_count(50)
            .with_event_type("Standard")
    }

    fn detector_geometries(kind: DetectorKind) -> usize {
        let mut scene = Scene::initialize(TARGET).unwrap();
        detector_builder::build(&mut scene, kind);
        scene.stats().geometries
    }

    #[test]
    fn test_unmounted_is_noop() {
        let (tx, _rx) = mpsc::channel();
        let mut viz = ColliderVisualizer::new(MagneticFieldTable::default(), tx, 1);
        assert!(!viz.mount(None));
        viz.run_simulation(standard_run());
        viz.clear_animation();
        viz.toggle_labels();
        assert!(!viz.wheel(10.0));
        assert!(viz.frame(FRAME).is_none());
        assert!(viz.summary().is_none());
        assert_eq!(viz.stats(), ResourceStats::default());
    }

    #[test]
    fn test_standard_run_lifecycle() {
        let (mut viz, _rx) = mounted();
        let detector_only = viz.stats();
        viz.run_simulation(standard_run());

        let labels = viz.summary_labels().unwrap();
        assert_eq!(labels.energy, "13.00 TeV");
        assert_eq!(labels.momentum, "1000 GeV/c");
        assert_eq!(labels.track_count, "50");
        assert_eq!(labels.event_type, "Standard");
        assert_eq!(labels.magnetic_field, "2.0 T");

        for _ in 0..=25 {
            viz.frame(FRAME);
        }
        assert_eq!(viz.animation().explosions(), 1);
        assert_eq!(viz.animation().track_count(), 50);

        for _ in 26..200 {
            viz.frame(FRAME);
        }
        assert_eq!(viz.animation().track_count(), 0);
        assert_eq!(viz.animation().jet_count(), 0);
        assert_eq!(viz.animation().phase(), Phase::Idle);
        assert_eq!(viz.stats(), detector_only);
        // Idle keeps producing frames for camera and labels
        assert!(viz.frame(FRAME).is_some());
    }

    #[test]
    fn test_rerun_resets_prior_run() {
        let (mut viz, _rx) = mounted();
        viz.run_simulation(standard_run());
        for _ in 0..40 {
            viz.frame(FRAME);
        }
        assert!(viz.animation().track_count() > 0);

        viz.run_simulation(standard_run().with_track_count(20));
        assert_eq!(viz.animation().track_count(), 0);
        assert_eq!(viz.animation().jet_count(), 0);
        assert_eq!(viz.animation().beam_count(), 2);
        assert_eq!(viz.animation().frame(), 0);
        assert_eq!(
            viz.stats().geometries,
            detector_geometries(DetectorKind::Atlas) + 2
        );
    }

    #[test]
    fn test_switch_to_lhcb_releases_atlas() {
        let (mut viz, _rx) = mounted();
        assert_eq!(viz.detector().kind, Some(DetectorKind::Atlas));
        assert!(viz.detector().marker.is_some());

        viz.set_detector("LHCb");
        assert_eq!(viz.detector().kind, Some(DetectorKind::Lhcb));
        assert!(viz.detector().marker.is_none());
        assert_eq!(viz.stats().geometries, detector_geometries(DetectorKind::Lhcb));
        assert!((viz.magnetic_field() - 1.1).abs() < 1e-6);

        // Same configuration in another case does not rebuild
        let before = viz.detector().layers[0].root;
        viz.set_detector("lhcb");
        assert_eq!(viz.detector().layers[0].root, before);
    }

    #[test]
    fn test_run_with_new_detector_rebuilds_first() {
        let (mut viz, _rx) = mounted();
        viz.run_simulation(standard_run().with_detector("CMS"));
        assert_eq!(viz.detector().kind, Some(DetectorKind::Cms));
        assert_eq!(viz.summary_labels().unwrap().magnetic_field, "3.8 T");
    }

    #[test]
    fn test_unknown_detector_builds_nothing() {
        let (mut viz, _rx) = mounted();
        viz.run_simulation(standard_run().with_detector("Tevatron"));
        assert!(viz.detector().layers.is_empty());
        assert_eq!(viz.detector_name(), "Tevatron");
        assert_eq!(viz.summary_labels().unwrap().magnetic_field, "2.0 T");
        assert_eq!(viz.stats().geometries, 2);
    }

    #[test]
    fn test_clear_keeps_detector_and_camera() {
        let (mut viz, _rx) = mounted();
        viz.run_simulation(standard_run());
        viz.pointer_move(Vec2::new(100.0, 100.0));
        assert!(viz.wheel(100.0));
        for _ in 0..30 {
            viz.frame(FRAME);
        }
        let camera = viz.scene().unwrap().camera.state;

        viz.clear_animation();
        assert!(viz.summary().is_none());
        assert_eq!(viz.animation().track_count(), 0);
        assert_eq!(viz.stats().geometries, detector_geometries(DetectorKind::Atlas));
        assert_eq!(viz.scene().unwrap().camera.state, camera);
    }

    #[test]
    fn test_unmount_releases_everything() {
        let (mut viz, _rx) = mounted();
        viz.run_simulation(standard_run());
        for _ in 0..30 {
            viz.frame(FRAME);
        }
        viz.unmount();
        assert!(!viz.is_mounted());
        assert!(viz.frame(FRAME).is_none());
        assert_eq!(viz.stats(), ResourceStats::default());

        // Remount rebuilds the last detector and ticks again
        assert!(viz.mount(TARGET));
        viz.run_simulation(standard_run());
        assert_eq!(viz.frame(FRAME).unwrap().phase, Some(Phase::Approach));
    }

    #[test]
    fn test_remount_never_reuses_geometry_ids() {
        use std::collections::HashSet;

        let geometry_ids = |viz: &ColliderVisualizer| -> HashSet<GeometryId> {
            viz.scene()
                .unwrap()
                .drawables()
                .iter()
                .map(|d| d.geometry)
                .collect()
        };

        let (mut viz, _rx) = mounted();
        let first = geometry_ids(&viz);
        assert!(!first.is_empty());
        assert!(viz.take_released().is_empty());

        viz.unmount();
        let released: HashSet<GeometryId> = viz.take_released().into_iter().collect();
        assert!(first.is_subset(&released));
        assert!(viz.take_released().is_empty());

        assert!(viz.mount(TARGET));
        let second = geometry_ids(&viz);
        assert_eq!(second.len(), first.len());
        assert_eq!(first.intersection(&second).count(), 0);
    }

    #[test]
    fn test_labels_projected_each_frame() {
        let (mut viz, _rx) = mounted();
        assert!(viz.frame(FRAME).unwrap().labels.is_empty());
        viz.toggle_labels();
        let output = viz.frame(FRAME).unwrap();
        assert!(!output.labels.is_empty());
        assert!(output.camera_position.length() > 0.0);
    }
}
