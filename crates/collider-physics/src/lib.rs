//! # Collider Physics
//!
//! Illustrative physics model for the collision visualizer: detector presets,
//! magnetic field table, track curvature kinematics and event summaries.
//!
//! Nothing here is physically accurate. The numbers are chosen to look right
//! on screen while keeping the relative relationships (higher field bends
//! more, higher momentum bends less, neutral particles fly straight).

pub mod constants;
pub mod detector;
pub mod kinematics;
pub mod reaction;
pub mod summary;

pub use constants::*;
pub use detector::*;
pub use kinematics::*;
pub use reaction::*;
pub use summary::*;
