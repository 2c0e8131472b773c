//! Constants for the collision model
//!
//! These are scaled for real-time visualization rather than taken from any
//! detector's engineering drawings. Distances are in scene units, momenta in
//! GeV and fields in tesla.

/// Conversion factor in the radius-of-curvature formula r = p / (0.3 · |q| · B)
/// (p in GeV, B in tesla, r in metres)
pub const CURVATURE_CONVERSION: f32 = 0.3;

/// Curvature is clamped into [-MAX_CURVATURE, MAX_CURVATURE] before muon scaling
pub const MAX_CURVATURE: f32 = 2.0;

/// Muons penetrate the whole detector; their bend is drawn at this fraction
pub const MUON_CURVATURE_SCALE: f32 = 0.3;

/// Field used when the active configuration has no table entry
pub const DEFAULT_MAGNETIC_FIELD: f32 = 2.0;

// Track species split (cumulative thresholds on a uniform draw)
/// Probability that a track is hadron-like
pub const HADRON_FRACTION: f32 = 0.60;
/// Probability that a track is lepton-like
pub const LEPTON_FRACTION: f32 = 0.25;
/// Share of lepton-like tracks flagged as muons
pub const MUON_SHARE_OF_LEPTONS: f32 = 0.5;

/// Hadron-like momentum range (GeV)
pub const HADRON_MOMENTUM: (f32, f32) = (2.0, 17.0);
/// Lepton-like momentum range (GeV)
pub const LEPTON_MOMENTUM: (f32, f32) = (5.0, 25.0);
/// Neutral momentum range (GeV)
pub const NEUTRAL_MOMENTUM: (f32, f32) = (10.0, 30.0);

/// Drawn track length range for ordinary tracks
pub const TRACK_LENGTH: (f32, f32) = (8.0, 14.0);
/// Muons are drawn long enough to leave the outer layers
pub const MUON_TRACK_LENGTH: f32 = 18.0;

/// Event summary defaults
pub const DEFAULT_ENERGY_TEV: f64 = 13.0;
pub const DEFAULT_MOMENTUM: f64 = 1000.0;
pub const DEFAULT_TRACK_COUNT: u32 = 50;
pub const DEFAULT_EVENT_TYPE: &str = "Standard";

/// Products heavier than this are flavoured as a Higgs event
pub const HIGGS_MASS_THRESHOLD: f64 = 10.0;
pub const HIGGS_EVENT_TYPE: &str = "Higgs Boson";

/// Track count range derived from a reaction result
pub const MIN_REACTION_TRACKS: u32 = 20;
pub const MAX_REACTION_TRACKS: u32 = 120;
