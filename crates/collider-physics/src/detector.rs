//! Detector presets and their layer tables

use std::fmt;
use std::str::FromStr;

use crate::constants::DEFAULT_MAGNETIC_FIELD;

/// Selectable detector layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    Atlas,
    Cms,
    Alice,
    Lhcb,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::Atlas,
        DetectorKind::Cms,
        DetectorKind::Alice,
        DetectorKind::Lhcb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DetectorKind::Atlas => "ATLAS",
            DetectorKind::Cms => "CMS",
            DetectorKind::Alice => "ALICE",
            DetectorKind::Lhcb => "LHCb",
        }
    }

    /// LHCb is a forward spectrometer: its stages sit one after another along
    /// the beam axis instead of nesting around the interaction point.
    pub fn is_axial(self) -> bool {
        matches!(self, DetectorKind::Lhcb)
    }

    /// Tint of the collision-zone marker. `None` for layouts without one.
    pub fn marker_color(self) -> Option<[f32; 3]> {
        match self {
            DetectorKind::Atlas => Some(hex(0xffd166)),
            DetectorKind::Cms => Some(hex(0xff6b6b)),
            DetectorKind::Alice => Some(hex(0x4ecdc4)),
            DetectorKind::Lhcb => None,
        }
    }

    /// Layers ordered outer to inner (ring layouts) or upstream to downstream
    /// along the beam (axial layouts).
    pub fn layers(self) -> &'static [LayerSpec] {
        match self {
            DetectorKind::Atlas => ATLAS_LAYERS,
            DetectorKind::Cms => CMS_LAYERS,
            DetectorKind::Alice => ALICE_LAYERS,
            DetectorKind::Lhcb => LHCB_LAYERS,
        }
    }

    pub fn layer(self, name: &str) -> Option<&'static LayerSpec> {
        self.layers().iter().find(|layer| layer.name == name)
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a detector name does not match any preset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown detector configuration '{0}'")]
pub struct UnknownDetector(pub String);

impl FromStr for DetectorKind {
    type Err = UnknownDetector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDetector(s.to_string()))
    }
}

/// One named structural component of a detector
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub radius: f32,
    pub length: f32,
    /// Position of the stage centre along the beam axis (axial layouts only)
    pub axial_offset: Option<f32>,
    pub color: [f32; 3],
    /// Nominal opacity before per-part scaling
    pub opacity: f32,
}

/// Convert a 0xRRGGBB literal into linear-ish [0, 1] components
pub const fn hex(value: u32) -> [f32; 3] {
    [
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ]
}

const fn ring(
    name: &'static str,
    description: &'static str,
    radius: f32,
    length: f32,
    color: u32,
    opacity: f32,
) -> LayerSpec {
    LayerSpec {
        name,
        description,
        radius,
        length,
        axial_offset: None,
        color: hex(color),
        opacity,
    }
}

const fn stage(
    name: &'static str,
    description: &'static str,
    radius: f32,
    length: f32,
    axial_offset: f32,
    color: u32,
    opacity: f32,
) -> LayerSpec {
    LayerSpec {
        name,
        description,
        radius,
        length,
        axial_offset: Some(axial_offset),
        color: hex(color),
        opacity,
    }
}

static ATLAS_LAYERS: &[LayerSpec] = &[
    ring(
        "Muon Spectrometer",
        "Large toroid-field chambers that measure muons escaping every other layer.",
        13.0,
        26.0,
        0x4a90d9,
        0.25,
    ),
    ring(
        "Hadronic Calorimeter",
        "Steel and scintillator tiles absorbing protons, neutrons and pions.",
        9.5,
        20.0,
        0xe07a5f,
        0.35,
    ),
    ring(
        "Electromagnetic Calorimeter",
        "Liquid-argon accordion measuring electron and photon energies.",
        7.0,
        16.0,
        0x81b29a,
        0.4,
    ),
    ring(
        "Inner Detector",
        "Silicon strips and straw tubes tracking charged particles in a 2 T solenoid.",
        4.0,
        12.0,
        0xf2cc8f,
        0.45,
    ),
    ring(
        "Pixel Detector",
        "Innermost silicon pixels that pin down collision vertices.",
        1.8,
        7.0,
        0xc77dff,
        0.5,
    ),
];

static CMS_LAYERS: &[LayerSpec] = &[
    ring(
        "Muon Chambers",
        "Drift tubes and cathode strip chambers interleaved with the return yoke.",
        13.5,
        24.0,
        0x5e60ce,
        0.25,
    ),
    ring(
        "Superconducting Solenoid",
        "A 3.8 T coil bending charged tracks inside the calorimeters.",
        10.5,
        21.0,
        0x9aa5b1,
        0.3,
    ),
    ring(
        "Hadron Calorimeter",
        "Brass and plastic scintillator sampling calorimeter.",
        8.5,
        18.0,
        0xff9f1c,
        0.35,
    ),
    ring(
        "Electromagnetic Calorimeter",
        "Lead tungstate crystals measuring electrons and photons.",
        6.0,
        14.0,
        0x2ec4b6,
        0.4,
    ),
    ring(
        "Silicon Tracker",
        "Pixel and strip layers reconstructing charged trajectories.",
        3.5,
        10.0,
        0xe71d36,
        0.5,
    ),
];

static ALICE_LAYERS: &[LayerSpec] = &[
    ring(
        "L3 Magnet",
        "Octagonal solenoid providing the 0.5 T field for the central barrel.",
        12.5,
        22.0,
        0xd62828,
        0.2,
    ),
    ring(
        "Time Of Flight",
        "Multigap resistive plate chambers identifying particles by speed.",
        9.0,
        18.0,
        0xf77f00,
        0.3,
    ),
    ring(
        "Time Projection Chamber",
        "Gas volume recording thousands of tracks from heavy-ion collisions.",
        6.5,
        15.0,
        0xfcbf49,
        0.35,
    ),
    ring(
        "Inner Tracking System",
        "Silicon layers close to the beam pipe for vertexing.",
        2.5,
        8.0,
        0x90be6d,
        0.5,
    ),
];

static LHCB_LAYERS: &[LayerSpec] = &[
    stage(
        "Vertex Locator",
        "Silicon modules a few millimetres from the beams, locating b-hadron decays.",
        1.5,
        3.0,
        -10.0,
        0xffbe0b,
        0.5,
    ),
    stage(
        "RICH1",
        "Ring-imaging Cherenkov detector identifying low-momentum hadrons.",
        3.0,
        2.5,
        -6.0,
        0xfb5607,
        0.35,
    ),
    stage(
        "Dipole Magnet",
        "Warm dipole bending charged tracks horizontally.",
        5.0,
        4.0,
        -1.0,
        0xff006e,
        0.3,
    ),
    stage(
        "Tracking Stations",
        "Scintillating fibre planes measuring momentum after the magnet.",
        5.5,
        2.0,
        4.0,
        0x8338ec,
        0.35,
    ),
    stage(
        "RICH2",
        "Second Cherenkov detector for high-momentum particles.",
        6.0,
        2.5,
        7.5,
        0x3a86ff,
        0.3,
    ),
    stage(
        "Calorimeters",
        "Electromagnetic and hadronic calorimeters measuring deposited energy.",
        7.0,
        3.0,
        11.0,
        0x06d6a0,
        0.3,
    ),
    stage(
        "Muon System",
        "Iron-filtered chambers at the far end, triggering on muons.",
        8.0,
        3.5,
        15.5,
        0x118ab2,
        0.25,
    ),
];

/// Field strength per detector, passed explicitly to the track generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticFieldTable {
    pub atlas: f32,
    pub cms: f32,
    pub alice: f32,
    pub lhcb: f32,
    /// Used when no configuration is active (unknown name)
    pub fallback: f32,
}

impl Default for MagneticFieldTable {
    fn default() -> Self {
        Self {
            atlas: 2.0,
            cms: 3.8,
            alice: 0.5,
            lhcb: 1.1,
            fallback: DEFAULT_MAGNETIC_FIELD,
        }
    }
}

impl MagneticFieldTable {
    pub fn field(&self, kind: Option<DetectorKind>) -> f32 {
        match kind {
            Some(DetectorKind::Atlas) => self.atlas,
            Some(DetectorKind::Cms) => self.cms,
            Some(DetectorKind::Alice) => self.alice,
            Some(DetectorKind::Lhcb) => self.lhcb,
            None => self.fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("atlas".parse::<DetectorKind>(), Ok(DetectorKind::Atlas));
        assert_eq!("LHCb".parse::<DetectorKind>(), Ok(DetectorKind::Lhcb));
        assert_eq!(" CMS ".parse::<DetectorKind>(), Ok(DetectorKind::Cms));
        assert!("TOTEM".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn test_layer_names_unique() {
        for kind in DetectorKind::ALL {
            let names: HashSet<_> = kind.layers().iter().map(|l| l.name).collect();
            assert_eq!(names.len(), kind.layers().len(), "{kind}");
        }
    }

    #[test]
    fn test_ring_layers_nest_outer_to_inner() {
        for kind in DetectorKind::ALL.into_iter().filter(|k| !k.is_axial()) {
            let radii: Vec<f32> = kind.layers().iter().map(|l| l.radius).collect();
            assert!(radii.windows(2).all(|w| w[0] > w[1]), "{kind}");
            assert!(kind.layers().iter().all(|l| l.axial_offset.is_none()));
        }
    }

    #[test]
    fn test_axial_stages_ordered_along_beam() {
        let offsets: Vec<f32> = DetectorKind::Lhcb
            .layers()
            .iter()
            .map(|l| l.axial_offset.unwrap())
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert!(DetectorKind::Lhcb.marker_color().is_none());
    }

    #[test]
    fn test_field_table_fallback() {
        let table = MagneticFieldTable::default();
        assert_eq!(table.field(Some(DetectorKind::Cms)), 3.8);
        assert_eq!(table.field(None), DEFAULT_MAGNETIC_FIELD);
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex(0x000000), [0.0, 0.0, 0.0]);
    }
}
