//! GPU-side camera, light and per-draw data

use bytemuck::{Pod, Zeroable};
use collider_simulation::{Drawable, LightKind, Scene};
use glam::Mat4;

/// Point lights the shader evaluates; extra scene lights are ignored
pub const MAX_POINT_LIGHTS: usize = 2;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: [f32; 4],
    /// rgb premultiplied by intensity
    pub color: [f32; 4],
}

/// Camera uniform for GPU
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub ambient: [f32; 4],
    pub lights: [PointLightUniform; MAX_POINT_LIGHTS],
}

impl SceneUniform {
    pub fn new(scene: &Scene) -> Self {
        let camera = &scene.camera;
        let mut uniform = Self {
            view_proj: camera.build_view_projection_matrix().to_cols_array_2d(),
            camera_position: camera.position().extend(1.0).to_array(),
            ambient: [0.0; 4],
            lights: [PointLightUniform::zeroed(); MAX_POINT_LIGHTS],
        };

        let mut point = 0;
        for light in scene.lights() {
            let color = linear_rgb(light.color).map(|c| c * light.intensity);
            match light.kind {
                LightKind::Ambient => {
                    for (acc, c) in uniform.ambient.iter_mut().zip(color) {
                        *acc += c;
                    }
                }
                LightKind::Point { position } if point < MAX_POINT_LIGHTS => {
                    uniform.lights[point] = PointLightUniform {
                        position: position.extend(1.0).to_array(),
                        color: [color[0], color[1], color[2], 1.0],
                    };
                    point += 1;
                }
                LightKind::Point { .. } => {}
            }
        }
        uniform
    }
}

/// One drawn mesh: world transform and material
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct InstanceUniform {
    pub model: [[f32; 4]; 4],
    /// Linear rgb plus opacity
    pub color: [f32; 4],
    /// x: 1.0 when lit, 0.0 for emissive or line geometry
    pub params: [f32; 4],
}

impl InstanceUniform {
    pub fn new(drawable: &Drawable, lit: bool) -> Self {
        let rgb = linear_rgb(drawable.material.color);
        let lit = lit && !drawable.material.emissive;
        Self {
            model: drawable.world.to_cols_array_2d(),
            color: [rgb[0], rgb[1], rgb[2], drawable.material.opacity],
            params: [if lit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }

    pub fn world(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Material colors are authored in sRGB; the surface expects linear
pub fn linear_rgb(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(srgb_to_linear)
}
