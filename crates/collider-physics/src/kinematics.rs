//! Track kinematics: species sampling and magnetic curvature
//!
//! The curvature term is a pure function of charge, momentum, field and drawn
//! length, so it can be checked without any rendering backend.

use rand::Rng;

use crate::constants::*;
use crate::detector::hex;

/// Broad class of a decay product, which decides its hue and momentum range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSpecies {
    /// Pions, kaons, protons
    Hadron,
    /// Electrons and muons
    Lepton,
    /// Photons, neutrons, K0
    Neutral,
}

impl TrackSpecies {
    pub fn color(self) -> [f32; 3] {
        match self {
            TrackSpecies::Hadron => hex(0xff8c00),
            TrackSpecies::Lepton => hex(0x39ff14),
            TrackSpecies::Neutral => hex(0xff3030),
        }
    }

    fn momentum_range(self) -> (f32, f32) {
        match self {
            TrackSpecies::Hadron => HADRON_MOMENTUM,
            TrackSpecies::Lepton => LEPTON_MOMENTUM,
            TrackSpecies::Neutral => NEUTRAL_MOMENTUM,
        }
    }

    /// 60% hadron-like, 25% lepton-like, 15% neutral
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let roll = rng.random::<f32>();
        if roll < HADRON_FRACTION {
            TrackSpecies::Hadron
        } else if roll < HADRON_FRACTION + LEPTON_FRACTION {
            TrackSpecies::Lepton
        } else {
            TrackSpecies::Neutral
        }
    }
}

/// Physical parameters of one generated track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackKinematics {
    pub species: TrackSpecies,
    /// Charge in units of e: -1, 0 or +1
    pub charge: f32,
    /// Momentum in GeV
    pub momentum: f32,
    pub is_muon: bool,
    /// Drawn length in scene units
    pub length: f32,
}

impl TrackKinematics {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let species = TrackSpecies::sample(rng);
        let (min_p, max_p) = species.momentum_range();
        let momentum = rng.random_range(min_p..max_p);

        let charge = match species {
            TrackSpecies::Neutral => 0.0,
            _ if rng.random::<bool>() => 1.0,
            _ => -1.0,
        };

        let is_muon =
            species == TrackSpecies::Lepton && rng.random::<f32>() < MUON_SHARE_OF_LEPTONS;

        let length = if is_muon {
            MUON_TRACK_LENGTH
        } else {
            rng.random_range(TRACK_LENGTH.0..TRACK_LENGTH.1)
        };

        Self {
            species,
            charge,
            momentum,
            is_muon,
            length,
        }
    }

    pub fn color(&self) -> [f32; 3] {
        self.species.color()
    }

    pub fn curvature(&self, field: f32) -> f32 {
        curvature(self.charge, self.momentum, field, self.length, self.is_muon)
    }
}

/// Bend applied to a drawn track.
///
/// `sign(q) · length / r` with `r = p / (0.3 · |q| · B)`, clamped into
/// `[-MAX_CURVATURE, MAX_CURVATURE]`. Muon curvature is scaled by
/// `MUON_CURVATURE_SCALE` after the clamp and is not clamped again.
pub fn curvature(charge: f32, momentum: f32, field: f32, length: f32, is_muon: bool) -> f32 {
    if charge == 0.0 || momentum <= 0.0 || field == 0.0 {
        return 0.0;
    }

    let radius = momentum / (CURVATURE_CONVERSION * charge.abs() * field);
    let bend = (charge.signum() * length / radius).clamp(-MAX_CURVATURE, MAX_CURVATURE);

    if is_muon {
        bend * MUON_CURVATURE_SCALE
    } else {
        bend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_neutral_tracks_are_straight() {
        assert_eq!(curvature(0.0, 12.0, 3.8, 10.0, false), 0.0);
        assert_eq!(curvature(0.0, 12.0, 3.8, 10.0, true), 0.0);
    }

    #[test]
    fn test_curvature_sign_follows_charge() {
        assert!(curvature(1.0, 10.0, 2.0, 10.0, false) > 0.0);
        assert!(curvature(-1.0, 10.0, 2.0, 10.0, false) < 0.0);
    }

    #[test]
    fn test_curvature_clamped() {
        // Very soft track in a strong field would bend far beyond the clamp
        assert_eq!(curvature(1.0, 0.5, 3.8, 14.0, false), MAX_CURVATURE);
        assert_eq!(curvature(-1.0, 0.5, 3.8, 14.0, false), -MAX_CURVATURE);
    }

    #[test]
    fn test_muon_scaled_after_clamp() {
        let normal = curvature(1.0, 0.5, 3.8, 18.0, false);
        let muon = curvature(1.0, 0.5, 3.8, 18.0, true);
        assert!((muon - normal * MUON_CURVATURE_SCALE).abs() < 1e-6);

        let normal = curvature(-1.0, 20.0, 2.0, 18.0, false);
        let muon = curvature(-1.0, 20.0, 2.0, 18.0, true);
        assert!((muon - normal * 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_higher_momentum_bends_less() {
        let soft = curvature(1.0, 5.0, 2.0, 10.0, false);
        let hard = curvature(1.0, 25.0, 2.0, 10.0, false);
        assert!(soft > hard);
    }

    #[test]
    fn test_sampled_tracks_respect_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let track = TrackKinematics::sample(&mut rng);
            let (lo, hi) = track.species.momentum_range();
            assert!(track.momentum >= lo && track.momentum < hi);
            match track.species {
                TrackSpecies::Neutral => assert_eq!(track.charge, 0.0),
                _ => assert_eq!(track.charge.abs(), 1.0),
            }
            if track.is_muon {
                assert_eq!(track.species, TrackSpecies::Lepton);
            }
            assert!(track.curvature(3.8).abs() <= MAX_CURVATURE);
        }
    }

    #[test]
    fn test_species_split_roughly_matches() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 10_000;
        let hadrons = (0..n)
            .filter(|_| TrackSpecies::sample(&mut rng) == TrackSpecies::Hadron)
            .count();
        let share = hadrons as f32 / n as f32;
        assert!((share - 0.6).abs() < 0.03, "hadron share {share}");
    }
}
