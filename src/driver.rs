//! Per-frame orchestration.
//!
//! [`FrameDriver::render_frame`] is the whole frame: clamp the delta, read the
//! steering submitted since the last frame, step the session, draw, then drop
//! the steering back to the idle sentinel. Steering therefore only acts on
//! frames where someone submitted it.

use glam::{Vec2, Vec3};

use crate::compute::GridCompute;
use crate::flock;
use crate::params::StepUniforms;
use crate::session::FlockSession;

/// Pixel offset the idle sentinel corresponds to; far outside any window.
pub const IDLE_POINTER_OFFSET: Vec2 = Vec2::splat(10_000.0);

/// Draws the flock from a backend's current state.
pub trait Renderer<B> {
    fn draw(&mut self, backend: &B, uniforms: &StepUniforms);
}

/// Headless runs draw nothing.
impl<B> Renderer<B> for () {
    fn draw(&mut self, _backend: &B, _uniforms: &StepUniforms) {}
}

/// Turns timestamps and pointer input into session steps.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    last: f64,
    viewport_half: Vec2,
    steering: Vec3,
    frames: u64,
}

impl FrameDriver {
    /// A driver whose first frame measures its delta from `start`.
    pub fn new(start: f64, viewport_width: u32, viewport_height: u32) -> Self {
        let mut driver = Self {
            last: start,
            viewport_half: Vec2::ONE,
            steering: Vec3::ZERO,
            frames: 0,
        };
        driver.set_viewport(viewport_width, viewport_height);
        driver.steering = driver.idle_steering();
        driver
    }

    /// Update the viewport used to map pointer offsets.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_half = Vec2::new(width.max(1) as f32, height.max(1) as f32) / 2.0;
    }

    /// Map a pointer offset from the viewport center into steering units.
    pub fn steering_for(&self, pointer_offset: Vec2) -> Vec3 {
        Vec3::new(
            0.5 * pointer_offset.x / self.viewport_half.x,
            -0.5 * pointer_offset.y / self.viewport_half.y,
            0.0,
        )
    }

    /// Steering used when nothing was submitted; places the predator far
    /// outside the cube.
    pub fn idle_steering(&self) -> Vec3 {
        self.steering_for(IDLE_POINTER_OFFSET)
    }

    /// Steer with a pointer offset (pixels from the viewport center).
    pub fn submit_steering(&mut self, pointer_offset: Vec2) {
        self.steering = self.steering_for(pointer_offset);
    }

    /// Steer with a predator position already in steering units.
    pub fn submit_predator(&mut self, predator: Vec3) {
        self.steering = predator;
    }

    /// Steering the next frame will use.
    pub fn steering(&self) -> Vec3 {
        self.steering
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame at timestamp `now` (seconds since start).
    pub fn render_frame<B, R>(
        &mut self,
        now: f64,
        session: &mut FlockSession<B>,
        renderer: &mut R,
    ) -> StepUniforms
    where
        B: GridCompute,
        R: Renderer<B> + ?Sized,
    {
        // Timestamps stay f64; only the difference is narrowed.
        let delta = flock::safe_delta((now - self.last) as f32);
        self.last = now;

        let uniforms = session.step(now as f32, delta, self.steering);
        renderer.draw(session.backend(), &uniforms);

        self.steering = self.idle_steering();
        self.frames += 1;
        uniforms
    }
}
