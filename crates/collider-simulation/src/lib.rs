//! # Collider Simulation
//!
//! Backend-agnostic core of the collision visualizer. The [`Scene`] owns all
//! geometry and materials; detector layers and transient collision entities
//! refer to it through [`NodeId`] handles. A GPU backend mirrors the scene
//! and never mutates it.
//!
//! Frame order inside [`ColliderVisualizer::frame`] is fixed: simulation
//! state, then camera and hover picking, then label projection. Rendering
//! happens after it returns.

pub mod animation;
pub mod camera;
pub mod detector_builder;
pub mod entity;
pub mod generator;
pub mod interaction;
pub mod mesh;
pub mod orchestrator;
pub mod picking;
pub mod scene;

pub use animation::*;
pub use camera::*;
pub use detector_builder::{BuiltDetector, DetectorLayer, PartKind};
pub use entity::*;
pub use generator::*;
pub use interaction::*;
pub use mesh::{Geometry, Topology, Vertex};
pub use orchestrator::*;
pub use picking::*;
pub use scene::*;
