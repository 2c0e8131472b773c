//! # Collider Renderer
//!
//! wgpu backend for the collision visualizer. Mirrors the scene graph into
//! GPU buffers each frame and never mutates scene state beyond draining the
//! release queue.

pub mod camera;
pub mod context;
pub mod renderer;

pub use camera::*;
pub use context::*;
pub use renderer::*;
