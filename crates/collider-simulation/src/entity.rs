//! Lifecycle records for transient visual entities
//!
//! Each record holds a [`NodeId`] back-reference into the scene. The scene
//! owns the geometry and material; the animation loop owns the record.

use collider_physics::TrackKinematics;
use glam::Vec3;

use crate::scene::NodeId;

/// Growth progress added per tick once the spawn delay has run out
pub const GROWTH_STEP: f32 = 0.12;

/// Ease out (cubic) - stronger fast start effect
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t - 1.0;
    t * t * t + 1.0
}

/// Age, delay and growth of a jet or track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifecycle {
    pub age: u32,
    pub max_age: u32,
    /// Normalized [0, 1] driver of the scale-in animation
    pub growth_progress: f32,
    /// Ticks left before growth starts
    pub spawn_delay: u32,
}

impl Lifecycle {
    pub fn new(max_age: u32, spawn_delay: u32) -> Self {
        Self {
            age: 0,
            max_age,
            growth_progress: 0.0,
            spawn_delay,
        }
    }

    /// Advance one tick and return the scale the entity should be drawn at
    pub fn advance(&mut self) -> f32 {
        self.age += 1;
        if self.spawn_delay > 0 {
            self.spawn_delay -= 1;
            return 0.0;
        }
        self.growth_progress = (self.growth_progress + GROWTH_STEP).min(1.0);
        self.scale()
    }

    pub fn scale(&self) -> f32 {
        ease_out_cubic(self.growth_progress)
    }

    pub fn is_expired(&self) -> bool {
        self.age > self.max_age
    }
}

/// Incoming proton bunch, alive only before the collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamParticle {
    pub node: NodeId,
    pub position: Vec3,
    /// Displacement per frame
    pub velocity: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetCone {
    pub node: NodeId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub color: [f32; 3],
    pub length: f32,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub node: NodeId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub kinematics: TrackKinematics,
    pub curvature: f32,
    pub color: [f32; 3],
    pub lifecycle: Lifecycle,
}

/// One shell of the collision flash
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashLayer {
    pub node: NodeId,
    pub index: u32,
    pub scale: f32,
    pub opacity: f32,
}

/// A transient object tracked by the animation loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisualEntity {
    Beam(BeamParticle),
    Jet(JetCone),
    Track(Track),
    Flash(FlashLayer),
}

impl VisualEntity {
    pub fn node(&self) -> NodeId {
        match self {
            VisualEntity::Beam(beam) => beam.node,
            VisualEntity::Jet(jet) => jet.node,
            VisualEntity::Track(track) => track.node,
            VisualEntity::Flash(flash) => flash.node,
        }
    }

    pub fn lifecycle(&self) -> Option<&Lifecycle> {
        match self {
            VisualEntity::Jet(jet) => Some(&jet.lifecycle),
            VisualEntity::Track(track) => Some(&track.lifecycle),
            _ => None,
        }
    }

    pub fn lifecycle_mut(&mut self) -> Option<&mut Lifecycle> {
        match self {
            VisualEntity::Jet(jet) => Some(&mut jet.lifecycle),
            VisualEntity::Track(track) => Some(&mut track.lifecycle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_cubic() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert!(ease_out_cubic(0.5) > 0.5);
        assert_eq!(ease_out_cubic(1.0), 1.0);
    }

    #[test]
    fn test_delay_holds_scale_at_zero() {
        let mut lifecycle = Lifecycle::new(100, 3);
        for _ in 0..3 {
            assert_eq!(lifecycle.advance(), 0.0);
        }
        assert_eq!(lifecycle.spawn_delay, 0);
        assert_eq!(lifecycle.age, 3);
        assert!(lifecycle.advance() > 0.0);
        assert!((lifecycle.growth_progress - GROWTH_STEP).abs() < 1e-6);
    }

    #[test]
    fn test_growth_saturates() {
        let mut lifecycle = Lifecycle::new(100, 0);
        for _ in 0..20 {
            lifecycle.advance();
        }
        assert_eq!(lifecycle.growth_progress, 1.0);
        assert_eq!(lifecycle.scale(), 1.0);
    }

    #[test]
    fn test_expires_after_max_age() {
        let mut lifecycle = Lifecycle::new(5, 0);
        for _ in 0..5 {
            lifecycle.advance();
            assert!(!lifecycle.is_expired());
        }
        lifecycle.advance();
        assert!(lifecycle.is_expired());
    }
}
