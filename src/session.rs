//! A running flock: one compute backend plus the parameters it steps with.

use glam::Vec3;

use crate::compute::GridCompute;
use crate::error::ComputeError;
use crate::params::{FlockParams, StepUniforms};
use crate::state::{texel_count, StateSnapshot};

/// Owns the compute backend and the live parameter set.
///
/// Parameter changes through [`params_mut`](Self::params_mut) take effect on
/// the next [`step`](Self::step).
pub struct FlockSession<B: GridCompute> {
    backend: B,
    params: FlockParams,
    bounds: f32,
}

impl<B: GridCompute> FlockSession<B> {
    pub fn new(backend: B, params: FlockParams, bounds: f32) -> Self {
        log::info!(
            "session: {} birds on the {} backend, bounds {}",
            texel_count(backend.width()),
            backend.backend_name(),
            bounds
        );
        Self {
            backend,
            params,
            bounds,
        }
    }

    /// Advance the flock once. `predator` is in steering units.
    pub fn step(&mut self, time: f32, delta: f32, predator: Vec3) -> StepUniforms {
        let uniforms = StepUniforms::new(
            &self.params,
            time,
            delta,
            predator,
            self.bounds,
            self.backend.width(),
        );
        self.backend.step(&uniforms);
        uniforms
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut FlockParams {
        &mut self.params
    }

    #[inline]
    pub fn bounds(&self) -> f32 {
        self.bounds
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn steps(&self) -> u64 {
        self.backend.steps()
    }

    pub fn snapshot(&self) -> Result<StateSnapshot, ComputeError> {
        self.backend.snapshot()
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuCompute;
    use crate::state::StateStore;

    fn session(params: FlockParams) -> FlockSession<CpuCompute> {
        let store = StateStore::initialize(3, 800.0, Some(9));
        FlockSession::new(CpuCompute::new(store).expect("cpu backend"), params, 800.0)
    }

    #[test]
    fn test_step_builds_uniforms() {
        let mut session = session(FlockParams::default());
        let uniforms = session.step(2.5, 0.02, Vec3::new(0.1, -0.2, 0.0));

        assert_eq!(uniforms.time, 2.5);
        assert_eq!(uniforms.delta, 0.02);
        assert_eq!(uniforms.width, 3);
        assert_eq!(uniforms.bounds, 800.0);
        assert_eq!(uniforms.separation_distance, 20.0);
        assert_eq!(session.steps(), 1);
    }

    #[test]
    fn test_params_apply_next_step() {
        let mut session = session(FlockParams::default());
        session.params_mut().cohesion = 80.0;
        session.params_mut().freedom = 0.0;

        let uniforms = session.step(0.0, 0.01, Vec3::ZERO);
        assert_eq!(uniforms.cohesion_distance, 80.0);
        assert_eq!(uniforms.freedom_factor, 0.0);
    }
}
