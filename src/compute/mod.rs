//! Double-buffered grid compute.
//!
//! A backend owns the flock's state grids and advances them one step at a
//! time. [`CpuCompute`] runs the kernels as plain loops; the GPU backend in
//! `crate::gpu` dispatches the same kernels as WGSL compute passes.

mod cpu;
mod graph;

pub use cpu::{CpuCompute, TexelKernel};
pub use graph::{ComputeGraph, Variable};

use crate::error::ComputeError;
use crate::params::StepUniforms;
use crate::state::{StateSnapshot, StateStore};

/// A backend that advances the flock on a `width × width` grid.
pub trait GridCompute {
    /// Grid width in texels.
    fn width(&self) -> u32;

    /// Run every variable of the graph once, then swap all buffers.
    fn step(&mut self, uniforms: &StepUniforms);

    /// Number of completed steps.
    fn steps(&self) -> u64;

    /// Copy the current position and velocity grids.
    fn snapshot(&self) -> Result<StateSnapshot, ComputeError>;

    /// Short name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Checks shared by every backend, run before any allocation or device work.
pub(crate) fn check_store(store: &StateStore) -> Result<(), ComputeError> {
    if store.width() == 0 {
        return Err(ComputeError::EmptyGrid);
    }
    Ok(())
}
