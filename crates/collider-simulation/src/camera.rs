//! Orbit camera around the interaction point

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use std::f32::consts::FRAC_PI_2;

pub const MIN_DISTANCE: f32 = 15.0;
pub const MAX_DISTANCE: f32 = 60.0;
/// Radians of rotation per pixel of pointer drag
pub const DRAG_SENSITIVITY: f32 = 0.005;
/// Distance change per unit of wheel delta
pub const WHEEL_SENSITIVITY: f32 = 0.05;

/// User-controlled orbit parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Elevation, clamped to [-π/2, π/2]
    pub rotation_x: f32,
    /// Azimuth around the vertical axis
    pub rotation_y: f32,
    /// Distance from the target, clamped to [MIN_DISTANCE, MAX_DISTANCE]
    pub distance: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            rotation_x: 0.35,
            rotation_y: 0.6,
            distance: 35.0,
        }
    }
}

impl CameraState {
    /// Apply a pointer drag of (`dx`, `dy`) pixels
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.rotation_y += dx * DRAG_SENSITIVITY;
        self.rotation_x = (self.rotation_x + dy * DRAG_SENSITIVITY).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Apply a wheel delta (positive zooms out)
    pub fn zoom(&mut self, delta_y: f32) {
        self.distance =
            (self.distance + delta_y * WHEEL_SENSITIVITY).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Offset of the eye from the target
    pub fn offset(&self) -> Vec3 {
        let (sin_x, cos_x) = self.rotation_x.sin_cos();
        let (sin_y, cos_y) = self.rotation_y.sin_cos();
        Vec3::new(sin_y * cos_x, sin_x, cos_y * cos_x) * self.distance
    }

    /// Screen-up direction; stays defined when looking straight down the pole
    pub fn up(&self) -> Vec3 {
        let (sin_x, cos_x) = self.rotation_x.sin_cos();
        let (sin_y, cos_y) = self.rotation_y.sin_cos();
        Vec3::new(-sin_y * sin_x, cos_x, -cos_y * sin_x)
    }
}

/// A ray in world space; `direction` is normalized
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Perspective camera for 3D scene navigation
#[derive(Debug, Clone)]
pub struct Camera {
    pub state: CameraState,
    pub target: Vec3,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: CameraState::default(),
            target: Vec3::ZERO,
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: 60.0_f32.to_radians(),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.target + self.state.offset()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, self.state.up())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Ray through a point in normalized device coordinates (x right, y up, [-1, 1])
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.build_view_projection_matrix().inverse();
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray {
            origin: near,
            direction: (far - near).normalize_or(-Vec3::Z),
        }
    }

    /// Ray through a pixel of a `width` x `height` viewport (origin top-left)
    pub fn ray_from_screen(&self, pixel: Vec2, width: f32, height: f32) -> Ray {
        self.ray_from_ndc(screen_to_ndc(pixel, width, height))
    }

    /// Project a world point to pixel coordinates. `None` when behind the camera.
    pub fn project(&self, world: Vec3, width: f32, height: f32) -> Option<Vec2> {
        let clip = self.build_view_projection_matrix() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xy() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height,
        ))
    }
}

pub fn screen_to_ndc(pixel: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        pixel.x / width.max(1.0) * 2.0 - 1.0,
        1.0 - pixel.y / height.max(1.0) * 2.0,
    )
}
