//! Bridge between the backend's reaction result and a visualization run
//!
//! The backend answers a [`SimulationRequest`] with a reaction description.
//! Only a couple of numbers are read from it; everything else stays opaque.

use crate::constants::*;
use crate::summary::SimulationConfig;

/// Payload sent to the simulation backend
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub particle1_id: u32,
    pub particle2_id: u32,
    /// Collision energy in TeV
    pub energy: f64,
}

/// The parts of the backend's reaction result the visualizer looks at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionProduct {
    pub name: Option<String>,
    /// Mass of the heaviest product (GeV, backend units)
    pub mass: Option<f64>,
    /// Number of listed decay products
    pub product_count: usize,
}

impl ReactionProduct {
    pub fn event_type(&self) -> String {
        match (self.mass, &self.name) {
            (Some(mass), _) if mass > HIGGS_MASS_THRESHOLD => HIGGS_EVENT_TYPE.to_string(),
            (_, Some(name)) if !name.is_empty() => name.clone(),
            _ => DEFAULT_EVENT_TYPE.to_string(),
        }
    }
}

impl SimulationConfig {
    /// Build a run configuration once reaction data for `request` arrives.
    pub fn from_reaction(
        request: &SimulationRequest,
        product: &ReactionProduct,
        detector: Option<&str>,
    ) -> Self {
        let heuristic = 20.0 + request.energy * 4.0 + product.product_count as f64 * 5.0;
        let track_count =
            (heuristic.round() as u32).clamp(MIN_REACTION_TRACKS, MAX_REACTION_TRACKS);

        log::debug!(
            "reaction {}+{} @ {:.2} TeV -> {} tracks ({})",
            request.particle1_id,
            request.particle2_id,
            request.energy,
            track_count,
            product.event_type()
        );

        Self {
            detector: detector.map(str::to_string),
            energy: Some(request.energy),
            momentum: Some(request.energy * 1000.0 / 2.0),
            track_count: Some(track_count),
            event_type: Some(product.event_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(energy: f64) -> SimulationRequest {
        SimulationRequest {
            particle1_id: 1,
            particle2_id: 1,
            energy,
        }
    }

    #[test]
    fn test_heavy_product_is_higgs() {
        let product = ReactionProduct {
            name: Some("Z boson".into()),
            mass: Some(125.0),
            product_count: 2,
        };
        assert_eq!(product.event_type(), "Higgs Boson");
    }

    #[test]
    fn test_light_product_keeps_name() {
        let product = ReactionProduct {
            name: Some("Pion shower".into()),
            mass: Some(0.14),
            product_count: 3,
        };
        assert_eq!(product.event_type(), "Pion shower");
        assert_eq!(ReactionProduct::default().event_type(), "Standard");
    }

    #[test]
    fn test_track_count_clamped() {
        let config =
            SimulationConfig::from_reaction(&request(1000.0), &ReactionProduct::default(), None);
        assert_eq!(config.track_count, Some(MAX_REACTION_TRACKS));

        let config =
            SimulationConfig::from_reaction(&request(0.0), &ReactionProduct::default(), None);
        assert_eq!(config.track_count, Some(MIN_REACTION_TRACKS));
    }

    #[test]
    fn test_from_reaction_carries_detector_and_energy() {
        let config = SimulationConfig::from_reaction(
            &request(13.0),
            &ReactionProduct::default(),
            Some("CMS"),
        );
        assert_eq!(config.detector.as_deref(), Some("CMS"));
        assert_eq!(config.energy, Some(13.0));
        assert_eq!(config.momentum, Some(6500.0));
        assert_eq!(config.track_count, Some(72));
    }
}
