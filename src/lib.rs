//! # murmur
//!
//! Boid flocking where every bird's state lives in a texel.
//!
//! Positions and velocities are stored in two `width × width` RGBA32F grids.
//! Each frame a two-variable compute graph (velocity, then position) reads the
//! previous grids and writes fresh ones, and the buffers swap. The bird mesh is
//! static: each vertex carries the texel of its bird and the vertex shader
//! fetches position, heading and wing phase at draw time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use murmur::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Simulation::new()
//!         .with_width(64)
//!         .with_params(FlockParams { cohesion: 40.0, ..Default::default() })
//!         .run()
//! }
//! ```
//!
//! ## Backends
//!
//! Both backends implement [`GridCompute`](compute::GridCompute):
//!
//! - [`CpuCompute`](compute::CpuCompute) runs the kernels in [`flock`] as
//!   plain loops. It is deterministic and needs no GPU, which makes it the
//!   backend for tests and `--headless` runs.
//! - [`GpuCompute`](gpu::GpuCompute) dispatches the same kernels as WGSL
//!   compute passes over `Rgba32Float` storage textures.
//!
//! ## Driving frames by hand
//!
//! ```ignore
//! let mut session = Simulation::new().with_width(2).with_seed(1).cpu_session()?;
//! let mut driver = FrameDriver::new(0.0, 800, 600);
//!
//! driver.submit_steering(Vec2::new(120.0, -40.0));
//! driver.render_frame(1.0 / 60.0, &mut session, &mut ());
//!
//! let snapshot = session.snapshot()?;
//! ```
//!
//! ## Controls
//!
//! Moving the pointer places a predator the flock scatters from. `1`/`2`/`3`
//! raise separation, alignment and cohesion (hold `Shift` to lower them) and
//! `Space` pauses.

pub mod compute;
pub mod driver;
pub mod error;
pub mod flock;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod params;
pub mod session;
mod shader;
mod simulation;
pub mod state;
pub mod time;
mod window;

pub use bytemuck;
pub use error::{ComputeError, ConfigError, GpuError, SimulationError};
pub use glam::{Vec2, Vec3, Vec4};
pub use simulation::{Simulation, HEADLESS_DELTA};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use murmur::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compute::{ComputeGraph, CpuCompute, GridCompute};
    pub use crate::driver::{FrameDriver, Renderer};
    pub use crate::error::{ComputeError, ConfigError, GpuError, SimulationError};
    pub use crate::geometry::{build_mesh, BirdGeometry, BirdVertex};
    pub use crate::input::{Input, KeyCode};
    pub use crate::params::{FlockConfig, FlockParams, StepUniforms};
    pub use crate::session::FlockSession;
    pub use crate::simulation::Simulation;
    pub use crate::state::{Attribute, StateSnapshot, StateStore};
    pub use crate::time::Time;
    pub use crate::{Vec2, Vec3, Vec4};
}
