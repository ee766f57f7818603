//! Simulation builder and runners.

use glam::Vec3;
use winit::event_loop::{ControlFlow, EventLoop};

use crate::compute::CpuCompute;
use crate::driver::FrameDriver;
use crate::error::SimulationError;
use crate::params::{FlockConfig, FlockParams};
use crate::session::FlockSession;
use crate::state::{StateSnapshot, StateStore};
use crate::window::{App, WINDOW_SIZE};

/// Step length used by headless runs.
pub const HEADLESS_DELTA: f32 = 1.0 / 60.0;

/// A flocking simulation builder.
///
/// Use method chaining to configure, then call `.run()` to open a window or
/// `.run_headless(n)` to step on the CPU and collect the final state.
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    config: FlockConfig,
    predator: Option<Vec3>,
}

impl Simulation {
    /// Create a new simulation with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: FlockConfig) -> Self {
        Self {
            config,
            predator: None,
        }
    }

    /// Set the state texture width; the flock holds `width²` birds.
    pub fn with_width(mut self, width: u32) -> Self {
        self.config.width = width;
        self
    }

    /// Set the side length of the bounding cube.
    pub fn with_bounds(mut self, bounds: f32) -> Self {
        self.config.bounds = bounds;
        self
    }

    /// Seed the initial state for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_params(mut self, params: FlockParams) -> Self {
        self.config.params = params;
        self
    }

    /// Hold the predator at a fixed position (steering units) in headless runs.
    pub fn with_predator(mut self, predator: Vec3) -> Self {
        self.predator = Some(predator);
        self
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    /// A CPU-backed session over a freshly seeded store.
    pub fn cpu_session(&self) -> Result<FlockSession<CpuCompute>, SimulationError> {
        self.config.validate()?;
        let store = StateStore::initialize(self.config.width, self.config.bounds, self.config.seed);
        let backend = CpuCompute::new(store)?;
        Ok(FlockSession::new(backend, self.config.params, self.config.bounds))
    }

    /// Step `steps` frames of [`HEADLESS_DELTA`] on the CPU and return the
    /// final state.
    pub fn run_headless(&self, steps: u32) -> Result<StateSnapshot, SimulationError> {
        let mut session = self.cpu_session()?;
        let mut driver = FrameDriver::new(0.0, WINDOW_SIZE.0, WINDOW_SIZE.1);

        let mut now = 0.0_f64;
        for _ in 0..steps {
            if let Some(predator) = self.predator {
                driver.submit_predator(predator);
            }
            now += f64::from(HEADLESS_DELTA);
            driver.render_frame(now, &mut session, &mut ());
        }

        log::info!("headless run finished after {} steps", session.steps());
        Ok(session.snapshot()?)
    }

    /// Open a window and run until it is closed.
    ///
    /// GPU setup failures are logged and returned; the simulation does not
    /// start in that case.
    pub fn run(self) -> Result<(), SimulationError> {
        self.config.validate()?;
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(self.config);
        event_loop.run_app(&mut app)?;
        app.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ComputeError, ConfigError};

    #[test]
    fn test_builder() {
        let sim = Simulation::new()
            .with_width(4)
            .with_bounds(400.0)
            .with_seed(7)
            .with_params(FlockParams::inert());

        assert_eq!(sim.config().width, 4);
        assert_eq!(sim.config().bounds, 400.0);
        assert_eq!(sim.config().seed, Some(7));
        assert_eq!(sim.config().params, FlockParams::inert());
    }

    #[test]
    fn test_headless_is_reproducible() {
        let sim = Simulation::new().with_width(3).with_seed(21);
        let a = sim.run_headless(5).expect("headless run");
        let b = sim.run_headless(5).expect("headless run");
        assert_eq!(a, b);
        assert_eq!(a.position.len(), 9);
    }

    #[test]
    fn test_oversized_width_rejected_before_allocation() {
        let sim = Simulation::new().with_width(65536);
        assert!(matches!(
            sim.run_headless(1),
            Err(SimulationError::Config(ConfigError::InvalidWidth(65536)))
        ));
        assert!(matches!(
            sim.cpu_session(),
            Err(SimulationError::Config(ConfigError::InvalidWidth(65536)))
        ));
    }

    #[test]
    fn test_headless_zero_width_fails() {
        let sim = Simulation::new().with_width(0);
        assert!(matches!(
            sim.run_headless(1),
            Err(SimulationError::Compute(ComputeError::EmptyGrid))
        ));
    }
}
