//! Frame-driven state machine for one collision run

use std::time::Duration;

use collider_physics::DetectorKind;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::entity::{BeamParticle, VisualEntity};
use crate::generator::{Explosion, FlashBurst, ParticleGenerator};
use crate::scene::Scene;

/// Frame on which the beams meet and the explosion spawns
pub const COLLISION_FRAME: u32 = 25;
/// Frames after the collision before the loop may go idle
pub const IDLE_GRACE_FRAMES: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Beams travelling towards the interaction point
    Approach,
    Collision,
    /// Jets and tracks growing and aging
    Decay,
    /// Nothing left to advance until the next run
    Idle,
}

/// Owns the lifecycle records of every transient entity in a run.
///
/// The scene owns the geometry; entities here only hold node handles.
pub struct AnimationLoop {
    generator: ParticleGenerator,
    rng: StdRng,
    frame: u32,
    running: bool,
    paused: bool,
    step_requested: bool,
    disposed: bool,
    detector: Option<DetectorKind>,
    track_count: u32,
    explosions: u32,
    entities: Vec<VisualEntity>,
    flash: FlashBurst,
}

impl AnimationLoop {
    pub fn new(generator: ParticleGenerator, seed: u64) -> Self {
        Self {
            generator,
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            running: false,
            paused: false,
            step_requested: false,
            disposed: false,
            detector: None,
            track_count: 0,
            explosions: 0,
            entities: Vec::new(),
            flash: FlashBurst::default(),
        }
    }

    pub fn generator(&self) -> &ParticleGenerator {
        &self.generator
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.disposed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Phase the next tick will execute
    pub fn phase(&self) -> Phase {
        if !self.is_running() {
            return Phase::Idle;
        }
        match self.frame.cmp(&COLLISION_FRAME) {
            std::cmp::Ordering::Less => Phase::Approach,
            std::cmp::Ordering::Equal => Phase::Collision,
            std::cmp::Ordering::Greater => Phase::Decay,
        }
    }

    /// Explosions spawned since the last reset
    pub fn explosions(&self) -> u32 {
        self.explosions
    }

    pub fn entities(&self) -> &[VisualEntity] {
        &self.entities
    }

    pub fn flash(&self) -> &FlashBurst {
        &self.flash
    }

    pub fn beam_count(&self) -> usize {
        self.count(|e| matches!(e, VisualEntity::Beam(_)))
    }

    pub fn jet_count(&self) -> usize {
        self.count(|e| matches!(e, VisualEntity::Jet(_)))
    }

    pub fn track_count(&self) -> usize {
        self.count(|e| matches!(e, VisualEntity::Track(_)))
    }

    fn count(&self, predicate: impl Fn(&VisualEntity) -> bool) -> usize {
        self.entities.iter().filter(|e| predicate(e)).count()
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!("Animation {}", if self.paused { "paused" } else { "resumed" });
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advance exactly one tick on the next `tick` call while paused
    pub fn request_step(&mut self) {
        if self.paused {
            self.step_requested = true;
        }
    }

    /// Reset and spawn the beam pair for a new run
    pub fn start(&mut self, scene: &mut Scene, detector: Option<DetectorKind>, track_count: u32) {
        if self.disposed {
            return;
        }
        self.clear(scene);
        self.detector = detector;
        self.track_count = track_count;
        self.entities.extend(
            self.generator
                .spawn_beam_pair(Some(&mut *scene))
                .into_iter()
                .map(VisualEntity::Beam),
        );
        self.running = true;
        log::info!(
            "Run started: {} tracks, B = {:.1} T",
            track_count,
            self.generator.field(detector)
        );
    }

    /// Dispose every live entity and return to frame 0, idle
    pub fn clear(&mut self, scene: &mut Scene) {
        for entity in self.entities.drain(..) {
            scene.dispose(entity.node());
        }
        self.flash.dispose(scene);
        self.frame = 0;
        self.running = false;
        self.step_requested = false;
        self.explosions = 0;
    }

    /// Clear and refuse any further ticks
    pub fn dispose(&mut self, scene: &mut Scene) {
        self.clear(scene);
        self.disposed = true;
    }

    /// Drive the flash fade from wall-clock time. Runs while paused.
    pub fn advance_flash(&mut self, scene: &mut Scene, elapsed: Duration) {
        if !self.disposed {
            self.flash.advance(scene, elapsed);
        }
    }

    /// Advance simulation state by one frame and return the phase executed,
    /// or `None` when nothing ran (idle, paused or disposed).
    pub fn tick(&mut self, scene: &mut Scene) -> Option<Phase> {
        if !self.is_running() {
            return None;
        }
        if self.paused {
            if !self.step_requested {
                return None;
            }
            self.step_requested = false;
        }

        let phase = self.phase();
        match phase {
            Phase::Approach => self.advance_beams(scene),
            Phase::Collision => self.collide(scene),
            Phase::Decay => self.advance_decay(scene),
            Phase::Idle => {}
        }
        self.frame += 1;

        let settled = self.frame >= COLLISION_FRAME + IDLE_GRACE_FRAMES
            && self.jet_count() == 0
            && self.track_count() == 0;
        if settled {
            self.running = false;
            log::info!("Run idle after {} frames", self.frame);
        }
        Some(phase)
    }

    fn advance_beams(&mut self, scene: &mut Scene) {
        for entity in &mut self.entities {
            if let VisualEntity::Beam(BeamParticle {
                node,
                position,
                velocity,
            }) = entity
            {
                *position += *velocity;
                scene.set_translation(*node, *position);
            }
        }
    }

    fn collide(&mut self, scene: &mut Scene) {
        self.entities.retain(|entity| match entity {
            VisualEntity::Beam(beam) => {
                scene.dispose(beam.node);
                false
            }
            _ => true,
        });

        let Explosion {
            flash,
            jets,
            tracks,
        } = self.generator.spawn_explosion(
            Some(&mut *scene),
            &mut self.rng,
            self.detector,
            self.track_count,
        );
        self.flash.dispose(scene);
        self.flash = flash;
        self.entities.extend(jets.into_iter().map(VisualEntity::Jet));
        self.entities.extend(tracks.into_iter().map(VisualEntity::Track));
        self.explosions += 1;
    }

    fn advance_decay(&mut self, scene: &mut Scene) {
        self.entities.retain_mut(|entity| {
            let node = entity.node();
            let Some(lifecycle) = entity.lifecycle_mut() else {
                return true;
            };
            let scale = lifecycle.advance();
            if lifecycle.is_expired() {
                scene.dispose(node);
                return false;
            }
            scene.set_scale(node, scale);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MAX_SPAWN_DELAY;
    use crate::scene::MountTarget;

    fn scene() -> Scene {
        Scene::initialize(Some(MountTarget {
            width: 640,
            height: 480,
        }))
        .unwrap()
    }

    fn run(scene: &mut Scene, tracks: u32) -> AnimationLoop {
        let mut animation = AnimationLoop::new(ParticleGenerator::default(), 42);
        animation.start(scene, Some(DetectorKind::Atlas), tracks);
        animation
    }

    #[test]
    fn test_beams_approach_until_collision() {
        let mut scene = scene();
        let mut animation = run(&mut scene, 10);
        assert_eq!(animation.beam_count(), 2);

        for _ in 0..COLLISION_FRAME {
            assert_eq!(animation.tick(&mut scene), Some(Phase::Approach));
        }
        for entity in animation.entities() {
            if let VisualEntity::Beam(beam) = entity {
                assert!(beam.position.length() < 1e-4);
            }
        }
        assert_eq!(animation.explosions(), 0);

        assert_eq!(animation.tick(&mut scene), Some(Phase::Collision));
        assert_eq!(animation.beam_count(), 0);
        assert_eq!(animation.explosions(), 1);
        assert_eq!(animation.track_count(), 10);
    }

    #[test]
    fn test_standard_run_burst_and_cleanup() {
        let mut scene = scene();
        let baseline = scene.stats();
        let mut animation = run(&mut scene, 50);

        for _ in 0..=COLLISION_FRAME {
            animation.tick(&mut scene);
        }
        assert_eq!(animation.explosions(), 1);
        assert!((1..=3).contains(&animation.flash().layers.len()));
        assert!((2..=4).contains(&animation.jet_count()));
        assert_eq!(animation.track_count(), 50);
        for entity in animation.entities() {
            if let VisualEntity::Track(track) = entity {
                assert!(track.lifecycle.spawn_delay < MAX_SPAWN_DELAY);
            }
        }

        animation.advance_flash(&mut scene, Duration::from_secs(1));
        for _ in COLLISION_FRAME + 1..200 {
            animation.tick(&mut scene);
        }
        assert_eq!(animation.jet_count(), 0);
        assert_eq!(animation.track_count(), 0);
        assert_eq!(animation.explosions(), 1);
        assert_eq!(animation.phase(), Phase::Idle);
        assert_eq!(scene.stats(), baseline);
    }

    #[test]
    fn test_delayed_track_stays_at_zero_scale() {
        let mut scene = scene();
        let mut animation = run(&mut scene, 30);
        for _ in 0..=COLLISION_FRAME {
            animation.tick(&mut scene);
        }
        animation.tick(&mut scene);

        for entity in animation.entities() {
            if let VisualEntity::Track(track) = entity {
                let scale = scene.node(track.node).unwrap().transform.scale;
                if track.lifecycle.growth_progress == 0.0 {
                    assert_eq!(scale, glam::Vec3::ZERO);
                } else {
                    assert!(scale.x > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_pause_freezes_and_step_advances_one() {
        let mut scene = scene();
        let mut animation = run(&mut scene, 5);
        animation.tick(&mut scene);
        animation.toggle_pause();

        assert_eq!(animation.tick(&mut scene), None);
        assert_eq!(animation.frame(), 1);

        animation.request_step();
        assert_eq!(animation.tick(&mut scene), Some(Phase::Approach));
        assert_eq!(animation.tick(&mut scene), None);
        assert_eq!(animation.frame(), 2);

        animation.toggle_pause();
        animation.tick(&mut scene);
        assert_eq!(animation.frame(), 3);
    }

    #[test]
    fn test_restart_leaves_nothing_from_prior_run() {
        let mut scene = scene();
        let mut animation = run(&mut scene, 40);
        for _ in 0..40 {
            animation.tick(&mut scene);
        }
        assert!(animation.track_count() > 0);

        animation.start(&mut scene, Some(DetectorKind::Cms), 40);
        assert_eq!(animation.frame(), 0);
        assert_eq!(animation.track_count(), 0);
        assert_eq!(animation.jet_count(), 0);
        assert_eq!(animation.beam_count(), 2);
        assert!(animation.flash().is_finished());
        // Only the fresh beams remain in the scene
        assert_eq!(scene.stats().geometries, 2);
    }

    #[test]
    fn test_disposed_loop_never_ticks() {
        let mut scene = scene();
        let mut animation = run(&mut scene, 5);
        animation.dispose(&mut scene);
        assert_eq!(animation.tick(&mut scene), None);

        animation.start(&mut scene, None, 5);
        assert!(!animation.is_running());
        assert_eq!(scene.stats().nodes, 0);
    }
}
