//! CPU backend: one loop per variable over every texel.

use glam::Vec4;

use super::{ComputeGraph, GridCompute};
use crate::error::ComputeError;
use crate::flock;
use crate::params::StepUniforms;
use crate::state::{Attribute, StateSnapshot, StateStore, StateTexture};

/// Computes one output texel from the dependency grids of a variable.
///
/// `inputs` holds the current grids in the variable's dependency order.
pub type TexelKernel = fn(index: usize, inputs: &[&StateTexture], uniforms: &StepUniforms) -> Vec4;

fn velocity_kernel(index: usize, inputs: &[&StateTexture], uniforms: &StepUniforms) -> Vec4 {
    flock::velocity_texel(index, inputs[0], inputs[1], uniforms)
}

fn position_kernel(index: usize, inputs: &[&StateTexture], uniforms: &StepUniforms) -> Vec4 {
    flock::position_texel(index, inputs[0], inputs[1], uniforms)
}

/// Plain-loop implementation of [`GridCompute`].
///
/// Deterministic for a given initial state and uniform sequence.
pub struct CpuCompute {
    graph: ComputeGraph,
    kernels: Vec<TexelKernel>,
    store: StateStore,
    steps: u64,
}

impl CpuCompute {
    /// Flocking backend over an initialized store.
    pub fn new(store: StateStore) -> Result<Self, ComputeError> {
        let graph = ComputeGraph::flocking();
        let kernels = graph
            .evaluation_order()
            .map(|variable| match variable.attribute() {
                Attribute::Velocity => velocity_kernel as TexelKernel,
                Attribute::Position => position_kernel as TexelKernel,
            })
            .collect();
        Self::with_kernels(store, graph, kernels)
    }

    /// Backend with a custom graph. `kernels[i]` runs for the `i`th variable.
    pub fn with_kernels(
        store: StateStore,
        graph: ComputeGraph,
        kernels: Vec<TexelKernel>,
    ) -> Result<Self, ComputeError> {
        super::check_store(&store)?;
        graph.validate()?;
        assert_eq!(kernels.len(), graph.len(), "one kernel per variable");

        log::info!(
            "cpu compute: {} birds on a {}x{} grid",
            store.agent_count(),
            store.width(),
            store.width()
        );

        Ok(Self {
            graph,
            kernels,
            store,
            steps: 0,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }
}

impl GridCompute for CpuCompute {
    fn width(&self) -> u32 {
        self.store.width()
    }

    fn step(&mut self, uniforms: &StepUniforms) {
        for (variable, kernel) in self.graph.evaluation_order().zip(&self.kernels) {
            let attribute = variable.attribute();
            // The next grid is moved out so the current grids can be borrowed
            // alongside it; no dependency ever points at a next grid.
            let mut output = std::mem::take(self.store.pair_mut(attribute).next_mut());
            {
                let inputs: Vec<&StateTexture> = variable
                    .dependencies()
                    .iter()
                    .map(|dep| self.store.current(*dep))
                    .collect();
                for (index, texel) in output.texels_mut().iter_mut().enumerate() {
                    *texel = kernel(index, &inputs, uniforms);
                }
            }
            *self.store.pair_mut(attribute).next_mut() = output;
        }
        self.store.swap_all();
        self.steps += 1;
        log::trace!("cpu step {} (delta {:.4})", self.steps, uniforms.delta);
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn snapshot(&self) -> Result<StateSnapshot, ComputeError> {
        Ok(self.store.snapshot())
    }

    fn backend_name(&self) -> &'static str {
        "cpu"
    }
}
