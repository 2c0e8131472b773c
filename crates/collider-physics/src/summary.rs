//! Simulation run configuration and the read-only event summary

use crate::constants::*;

/// Parameters of one collision run. Every field is optional; missing values
/// fall back to the defaults in [`crate::constants`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationConfig {
    /// Detector configuration name ("ATLAS", "CMS", "ALICE", "LHCb")
    pub detector: Option<String>,
    /// Collision energy in TeV
    pub energy: Option<f64>,
    pub momentum: Option<f64>,
    pub track_count: Option<u32>,
    pub event_type: Option<String>,
}

impl SimulationConfig {
    pub fn with_detector(mut self, detector: impl Into<String>) -> Self {
        self.detector = Some(detector.into());
        self
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_track_count(mut self, track_count: u32) -> Self {
        self.track_count = Some(track_count);
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn resolve(&self) -> ResolvedConfig {
        ResolvedConfig {
            energy: self.energy.unwrap_or(DEFAULT_ENERGY_TEV),
            momentum: self.momentum.unwrap_or(DEFAULT_MOMENTUM),
            track_count: self.track_count.unwrap_or(DEFAULT_TRACK_COUNT),
            event_type: self
                .event_type
                .clone()
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        }
    }
}

/// A [`SimulationConfig`] with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub energy: f64,
    pub momentum: f64,
    pub track_count: u32,
    pub event_type: String,
}

/// Figures shown next to the canvas for the current run
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub energy: f64,
    pub momentum: f64,
    pub track_count: u32,
    pub event_type: String,
    /// Field of the configuration active when the run started (tesla)
    pub magnetic_field: f32,
}

impl EventSummary {
    pub fn new(config: &ResolvedConfig, magnetic_field: f32) -> Self {
        Self {
            energy: config.energy,
            momentum: config.momentum,
            track_count: config.track_count,
            event_type: config.event_type.clone(),
            magnetic_field,
        }
    }

    pub fn labels(&self) -> SummaryLabels {
        SummaryLabels {
            energy: format!("{:.2} TeV", self.energy),
            momentum: format!("{} GeV/c", self.momentum.floor() as i64),
            track_count: self.track_count.to_string(),
            event_type: self.event_type.clone(),
            magnetic_field: format!("{:.1} T", self.magnetic_field),
        }
    }
}

/// Display strings derived from an [`EventSummary`]
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLabels {
    pub energy: String,
    pub momentum: String,
    pub track_count: String,
    pub event_type: String,
    pub magnetic_field: String,
}
