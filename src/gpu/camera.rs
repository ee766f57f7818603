//! Perspective camera looking at the flock.

use glam::{Mat4, Vec3};

/// Fixed camera in front of the cube.
///
/// The default places the eye 350 units down +Z, looking at the origin with a
/// 75° vertical field of view, which frames most of an 800-unit cube.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 350.0),
            target: Vec3::ZERO,
            fov_y: 75.0,
            near: 1.0,
            far: 3000.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
