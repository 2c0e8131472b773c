//! Startup options read from the environment

use collider_physics::DetectorKind;

pub const DETECTOR_VAR: &str = "COLLIDER_DETECTOR";
pub const SEED_VAR: &str = "COLLIDER_SEED";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    pub width: u32,
    pub height: u32,
    pub detector: DetectorKind,
    /// Seed for track generation; random when unset
    pub seed: u64,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            detector: DetectorKind::Atlas,
            seed: rand::random(),
        }
    }
}

impl ViewerOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; invalid values are logged and ignored
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(value) = lookup(DETECTOR_VAR) {
            match value.parse() {
                Ok(kind) => options.detector = kind,
                Err(err) => log::warn!("{DETECTOR_VAR}: {err}; using {}", options.detector),
            }
        }
        if let Some(value) = lookup(SEED_VAR) {
            match value.trim().parse() {
                Ok(seed) => options.seed = seed,
                Err(err) => log::warn!("{SEED_VAR}={value:?}: {err}"),
            }
        }
        options
    }
}
