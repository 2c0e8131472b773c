//! Transient collision entities: beams, flash, jets and curved tracks
//!
//! Spawning only creates scene nodes and lifecycle records; advancing them is
//! the animation loop's job. When no scene is mounted every spawn function
//! returns an empty result.

use std::time::Duration;

use collider_physics::{hex, DetectorKind, MagneticFieldTable, TrackKinematics};
use glam::{Quat, Vec3};
use rand::Rng;

use crate::entity::{BeamParticle, FlashLayer, JetCone, Lifecycle, Track};
use crate::mesh;
use crate::scene::{Material, NodeId, Scene};

/// Beams start this far from the interaction point on either side
pub const BEAM_START_DISTANCE: f32 = 25.0;
/// Beam displacement per frame
pub const BEAM_SPEED: f32 = 1.0;
pub const BEAM_RADIUS: f32 = 0.3;

/// Points sampled along each track curve
pub const TRACK_POINTS: usize = 70;
/// Rings in the tube lofted along a track
pub const TRACK_TUBE_SEGMENTS: u32 = 56;
pub const TRACK_TUBE_SIDES: u32 = 6;
pub const TRACK_RADIUS: f32 = 0.04;
pub const MUON_TRACK_RADIUS: f32 = 0.06;
/// Lateral bend at the end of a track, per unit curvature and length
pub const TRACK_LATERAL_SCALE: f32 = 0.25;
/// Spawn delays are drawn from [0, MAX_SPAWN_DELAY)
pub const MAX_SPAWN_DELAY: u32 = 10;
pub const TRACK_MAX_AGE: u32 = 140;
pub const MUON_TRACK_MAX_AGE: u32 = 170;

pub const JET_LENGTH: (f32, f32) = (8.0, 12.0);
/// Cone base radius relative to its length
pub const JET_SPREAD: f32 = 0.22;
/// Maximum angular jitter around even spacing (radians)
pub const JET_JITTER: f32 = 0.35;
pub const JET_MAX_AGE: u32 = 100;
pub const JET_COLORS: [[f32; 3]; 2] = [hex(0xffd23f), hex(0xff7b00)];

/// Radius, color and opacity of each flash shell, inner to outer
pub const FLASH_SHELLS: [(f32, u32, f32); 3] = [
    (0.3, 0xffffff, 0.7),
    (0.8, 0xff00ff, 0.5),
    (1.2, 0x00ffff, 0.4),
];
/// Wall-clock period of the flash fade, independent of the frame clock
pub const FLASH_TICK: Duration = Duration::from_millis(20);
pub const FLASH_TICKS: u32 = 15;
pub const FLASH_DECAY: f32 = 0.94;
/// Scale added per tick to the innermost shell; outer shells grow faster
pub const FLASH_GROWTH_STEP: f32 = 0.25;

/// Number of jets for a uniform roll: 40% two, 30% three, 30% four
pub fn jet_count(roll: f32) -> u32 {
    if roll < 0.4 {
        2
    } else if roll < 0.7 {
        3
    } else {
        4
    }
}

/// Uniformly distributed unit vector
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.random::<f32>() * std::f32::consts::TAU;
    let cos_phi = rng.random::<f32>() * 2.0 - 1.0;
    let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
    Vec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
}

/// Sample a bent track of `TRACK_POINTS` points starting at the origin.
///
/// Lateral displacement grows with the square of progress along the path and
/// bends in the plane transverse to the beam axis.
pub fn track_path(direction: Vec3, curvature: f32, length: f32) -> Vec<Vec3> {
    let direction = direction.normalize_or(Vec3::X);
    let lateral = direction
        .cross(Vec3::Z)
        .normalize_or(direction.any_orthonormal_vector());

    (0..TRACK_POINTS)
        .map(|i| {
            let t = i as f32 / (TRACK_POINTS - 1) as f32;
            direction * length * t + lateral * curvature * t * t * length * TRACK_LATERAL_SCALE
        })
        .collect()
}

/// The flash shells plus the wall-clock timer fading them
#[derive(Debug, Clone, Default)]
pub struct FlashBurst {
    pub layers: Vec<FlashLayer>,
    elapsed: Duration,
    ticks: u32,
    disposed: bool,
}

impl FlashBurst {
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_finished(&self) -> bool {
        self.disposed || self.layers.is_empty()
    }

    /// Run every 20 ms tick that fits in `elapsed`. Disposes the shells after
    /// the last tick. Does nothing once disposed.
    pub fn advance(&mut self, scene: &mut Scene, elapsed: Duration) {
        if self.is_finished() {
            return;
        }
        self.elapsed += elapsed;
        while self.elapsed >= FLASH_TICK && !self.disposed {
            self.elapsed -= FLASH_TICK;
            self.tick(scene);
        }
    }

    fn tick(&mut self, scene: &mut Scene) {
        self.ticks += 1;
        for layer in &mut self.layers {
            layer.scale += FLASH_GROWTH_STEP * (1.0 + 0.2 * layer.index as f32);
            layer.opacity *= FLASH_DECAY;
            scene.set_scale(layer.node, layer.scale);
            scene.set_opacity(layer.node, layer.opacity);
        }
        if self.ticks >= FLASH_TICKS {
            self.dispose(scene);
        }
    }

    /// Release every shell; safe to call repeatedly
    pub fn dispose(&mut self, scene: &mut Scene) {
        for layer in self.layers.drain(..) {
            scene.dispose(layer.node);
        }
        self.disposed = true;
    }
}

/// Everything spawned at the moment of collision
#[derive(Debug, Clone, Default)]
pub struct Explosion {
    pub flash: FlashBurst,
    pub jets: Vec<JetCone>,
    pub tracks: Vec<Track>,
}

/// Creates transient entities for a detector's magnetic field
#[derive(Debug, Clone, Default)]
pub struct ParticleGenerator {
    fields: MagneticFieldTable,
}

impl ParticleGenerator {
    pub fn new(fields: MagneticFieldTable) -> Self {
        Self { fields }
    }

    pub fn field(&self, detector: Option<DetectorKind>) -> f32 {
        self.fields.field(detector)
    }

    /// Two beam bunches at ±`BEAM_START_DISTANCE` on the beam axis heading
    /// for the origin
    pub fn spawn_beam_pair(&self, scene: Option<&mut Scene>) -> Vec<BeamParticle> {
        let Some(scene) = scene else {
            return Vec::new();
        };

        [(1.0, hex(0x7fdbff)), (-1.0, hex(0xff851b))]
            .into_iter()
            .map(|(side, color)| {
                let position = Vec3::Z * BEAM_START_DISTANCE * side;
                let node = scene.add_mesh(
                    scene.root(),
                    mesh::uv_sphere(BEAM_RADIUS, 16, 12),
                    Material::emissive(color, 1.0),
                );
                scene.set_translation(node, position);
                BeamParticle {
                    node,
                    position,
                    velocity: -Vec3::Z * BEAM_SPEED * side,
                }
            })
            .collect()
    }

    pub fn spawn_explosion<R: Rng + ?Sized>(
        &self,
        scene: Option<&mut Scene>,
        rng: &mut R,
        detector: Option<DetectorKind>,
        track_count: u32,
    ) -> Explosion {
        let Some(scene) = scene else {
            return Explosion::default();
        };

        let explosion = Explosion {
            flash: self.spawn_flash(scene),
            jets: self.spawn_jets(scene, rng),
            tracks: self.spawn_tracks(scene, rng, detector, track_count),
        };
        log::debug!(
            "Explosion: {} flash shells, {} jets, {} tracks (B = {:.1} T)",
            explosion.flash.layers.len(),
            explosion.jets.len(),
            explosion.tracks.len(),
            self.field(detector)
        );
        explosion
    }

    fn spawn_flash(&self, scene: &mut Scene) -> FlashBurst {
        let layers = FLASH_SHELLS
            .iter()
            .enumerate()
            .map(|(index, &(radius, color, opacity))| {
                let node = scene.add_mesh(
                    scene.root(),
                    mesh::uv_sphere(radius, 24, 16),
                    Material::emissive(hex(color), opacity),
                );
                FlashLayer {
                    node,
                    index: index as u32,
                    scale: 1.0,
                    opacity,
                }
            })
            .collect();

        FlashBurst {
            layers,
            ..Default::default()
        }
    }

    fn spawn_jets<R: Rng + ?Sized>(&self, scene: &mut Scene, rng: &mut R) -> Vec<JetCone> {
        let count = jet_count(rng.random::<f32>());

        (0..count)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / count as f32
                    + rng.random_range(-JET_JITTER..JET_JITTER);
                let direction = Vec3::new(
                    angle.cos(),
                    angle.sin(),
                    rng.random_range(-0.5..0.5),
                )
                .normalize();
                let length = rng.random_range(JET_LENGTH.0..JET_LENGTH.1);
                let color = JET_COLORS[i as usize % JET_COLORS.len()];

                let node = scene.add_mesh(
                    scene.root(),
                    mesh::cone(length * JET_SPREAD, length, 16),
                    Material::emissive(color, 0.45),
                );
                orient(scene, node, direction);
                scene.set_scale(node, 0.0);

                JetCone {
                    node,
                    origin: Vec3::ZERO,
                    direction,
                    color,
                    length,
                    lifecycle: Lifecycle::new(JET_MAX_AGE, 0),
                }
            })
            .collect()
    }

    fn spawn_tracks<R: Rng + ?Sized>(
        &self,
        scene: &mut Scene,
        rng: &mut R,
        detector: Option<DetectorKind>,
        track_count: u32,
    ) -> Vec<Track> {
        let field = self.field(detector);

        (0..track_count)
            .map(|_| {
                let kinematics = TrackKinematics::sample(rng);
                let direction = isotropic_direction(rng);
                let curvature = kinematics.curvature(field);
                let path = track_path(direction, curvature, kinematics.length);
                let (radius, max_age) = if kinematics.is_muon {
                    (MUON_TRACK_RADIUS, MUON_TRACK_MAX_AGE)
                } else {
                    (TRACK_RADIUS, TRACK_MAX_AGE)
                };

                let node = scene.add_mesh(
                    scene.root(),
                    mesh::tube(&path, TRACK_TUBE_SEGMENTS, radius, TRACK_TUBE_SIDES),
                    Material::emissive(kinematics.color(), 0.9),
                );
                scene.set_scale(node, 0.0);

                Track {
                    node,
                    origin: Vec3::ZERO,
                    direction,
                    kinematics,
                    curvature,
                    color: kinematics.color(),
                    lifecycle: Lifecycle::new(max_age, rng.random_range(0..MAX_SPAWN_DELAY)),
                }
            })
            .collect()
    }
}

/// Rotate a +Z-aligned mesh to point along `direction`
fn orient(scene: &mut Scene, node: NodeId, direction: Vec3) {
    if let Some(n) = scene.node_mut(node) {
        n.transform.rotation = Quat::from_rotation_arc(Vec3::Z, direction.normalize_or(Vec3::Z));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MountTarget, ResourceStats};
    use collider_physics::MAX_CURVATURE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene() -> Scene {
        Scene::initialize(Some(MountTarget {
            width: 800,
            height: 600,
        }))
        .unwrap()
    }

    #[test]
    fn test_jet_count_weights() {
        assert_eq!(jet_count(0.0), 2);
        assert_eq!(jet_count(0.39), 2);
        assert_eq!(jet_count(0.4), 3);
        assert_eq!(jet_count(0.69), 3);
        assert_eq!(jet_count(0.7), 4);
        assert_eq!(jet_count(0.999), 4);
    }

    #[test]
    fn test_straight_path_for_zero_curvature() {
        let direction = Vec3::new(1.0, 1.0, 0.5).normalize();
        let path = track_path(direction, 0.0, 10.0);
        assert_eq!(path.len(), TRACK_POINTS);
        for p in &path {
            assert!(p.cross(direction).length() < 1e-4);
        }
        assert!((path[TRACK_POINTS - 1].length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_lateral_offset_grows_quadratically() {
        let path = track_path(Vec3::X, 1.0, 10.0);
        let lateral = |i: usize| path[i].y.abs();
        let mid = lateral((TRACK_POINTS - 1) / 2);
        let end = lateral(TRACK_POINTS - 1);
        assert!(end > 0.0);
        assert!((mid / end - 0.25).abs() < 0.02);
        // Bends within the transverse plane
        assert!(path.iter().all(|p| p.z.abs() < 1e-5));
    }

    #[test]
    fn test_unmounted_generation_is_empty() {
        let generator = ParticleGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generator.spawn_beam_pair(None).is_empty());
        let explosion = generator.spawn_explosion(None, &mut rng, Some(DetectorKind::Atlas), 50);
        assert!(explosion.flash.layers.is_empty());
        assert!(explosion.jets.is_empty());
        assert!(explosion.tracks.is_empty());
    }

    #[test]
    fn test_beam_pair_heads_for_origin() {
        let mut scene = scene();
        let beams = ParticleGenerator::default().spawn_beam_pair(Some(&mut scene));
        assert_eq!(beams.len(), 2);
        for beam in &beams {
            assert_eq!(beam.position.length(), BEAM_START_DISTANCE);
            assert!(beam.velocity.dot(beam.position) < 0.0);
            assert_eq!(beam.velocity.length(), BEAM_SPEED);
        }
    }

    #[test]
    fn test_explosion_composition() {
        let mut scene = scene();
        let mut rng = StdRng::seed_from_u64(99);
        let generator = ParticleGenerator::default();
        let explosion =
            generator.spawn_explosion(Some(&mut scene), &mut rng, Some(DetectorKind::Cms), 50);

        assert_eq!(explosion.flash.layers.len(), 3);
        assert!((2..=4).contains(&explosion.jets.len()));
        assert_eq!(explosion.tracks.len(), 50);
        for track in &explosion.tracks {
            assert!(track.lifecycle.spawn_delay < MAX_SPAWN_DELAY);
            assert!(track.curvature.abs() <= MAX_CURVATURE);
            if track.kinematics.charge == 0.0 {
                assert_eq!(track.curvature, 0.0);
            }
            assert!(track.lifecycle.max_age <= 180);
        }
        for jet in &explosion.jets {
            assert!(jet.length >= JET_LENGTH.0 && jet.length < JET_LENGTH.1);
            assert_eq!(jet.lifecycle.spawn_delay, 0);
        }
        let entities = 3 + explosion.jets.len() + 50;
        assert_eq!(scene.stats().geometries, entities);
    }

    #[test]
    fn test_muon_tracks_live_longer() {
        let mut scene = scene();
        let mut rng = StdRng::seed_from_u64(2024);
        let explosion = ParticleGenerator::default().spawn_explosion(
            Some(&mut scene),
            &mut rng,
            Some(DetectorKind::Atlas),
            200,
        );

        let (muons, others): (Vec<&Track>, Vec<&Track>) = explosion
            .tracks
            .iter()
            .partition(|track| track.kinematics.is_muon);
        assert!(!muons.is_empty());
        assert!(!others.is_empty());
        assert!(muons
            .iter()
            .all(|track| track.lifecycle.max_age == MUON_TRACK_MAX_AGE));
        assert!(others
            .iter()
            .all(|track| track.lifecycle.max_age == TRACK_MAX_AGE));
        assert!(MUON_TRACK_MAX_AGE > TRACK_MAX_AGE);
    }

    #[test]
    fn test_flash_fades_on_wall_clock() {
        let mut scene = scene();
        let mut rng = StdRng::seed_from_u64(5);
        let mut explosion = ParticleGenerator::default().spawn_explosion(
            Some(&mut scene),
            &mut rng,
            None,
            0,
        );
        let flash = &mut explosion.flash;

        flash.advance(&mut scene, Duration::from_millis(19));
        assert_eq!(flash.ticks(), 0);
        flash.advance(&mut scene, Duration::from_millis(1));
        assert_eq!(flash.ticks(), 1);
        assert!((flash.layers[0].opacity - 0.7 * FLASH_DECAY).abs() < 1e-6);
        assert!(flash.layers[2].scale > flash.layers[0].scale);

        flash.advance(&mut scene, Duration::from_millis(20 * 14));
        assert_eq!(flash.ticks(), FLASH_TICKS);
        assert!(flash.is_finished());
        assert!(flash.layers.is_empty());

        // No further ticks once disposed
        flash.advance(&mut scene, Duration::from_secs(1));
        assert_eq!(flash.ticks(), FLASH_TICKS);

        for jet in &explosion.jets {
            scene.dispose(jet.node);
        }
        assert_eq!(scene.stats(), ResourceStats::default());
    }
}
