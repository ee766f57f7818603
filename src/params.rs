//! Tunable flocking parameters and the per-step uniform block.
//!
//! [`FlockParams`] holds the four values a user can adjust while the
//! simulation runs. [`StepUniforms`] is what each compute step actually reads:
//! the parameters plus time, delta and the predator position, laid out to
//! match the WGSL `StepUniforms` struct byte for byte.
//!
//! # Example
//!
//! ```ignore
//! let config = FlockConfig::from_json_str(r#"{ "width": 16, "params": { "cohesion": 40.0 } }"#)?;
//! assert_eq!(config.params.separation, 20.0);
//! ```

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::mesh_vertex_count;

/// Default grid width; the flock holds `width * width` birds.
pub const DEFAULT_WIDTH: u32 = 32;

/// Default side length of the cube the flock lives in.
pub const DEFAULT_BOUNDS: f32 = 800.0;

/// Flocking distances and the freedom factor.
///
/// Distances are in world units and accept anything in `0..=100` from the
/// controls; values outside that range only change how the flock looks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    /// Neighbors closer than this push each other apart.
    pub separation: f32,
    /// Width of the band where neighbors match heading.
    pub alignment: f32,
    /// Width of the outer band where neighbors pull together.
    pub cohesion: f32,
    /// Strength of the per-bird random wander, `0..=1`.
    pub freedom: f32,
}

impl FlockParams {
    pub const SEPARATION_RANGE: (f32, f32) = (0.0, 100.0);
    pub const ALIGNMENT_RANGE: (f32, f32) = (0.0, 100.0);
    pub const COHESION_RANGE: (f32, f32) = (0.0, 100.0);
    pub const FREEDOM_RANGE: (f32, f32) = (0.0, 1.0);

    /// Parameters with every rule switched off.
    pub fn inert() -> Self {
        Self {
            separation: 0.0,
            alignment: 0.0,
            cohesion: 0.0,
            freedom: 0.0,
        }
    }

    /// Combined radius of the three interaction bands.
    pub fn zone_radius(&self) -> f32 {
        self.separation + self.alignment + self.cohesion
    }
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            separation: 20.0,
            alignment: 20.0,
            cohesion: 20.0,
            freedom: 0.75,
        }
    }
}

/// Everything needed to allocate and seed a flock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    /// State texture width; population is `width²`.
    pub width: u32,
    /// Side length of the bounding cube, centered on the origin.
    pub bounds: f32,
    /// Seed for the initial state. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Initial flocking parameters.
    pub params: FlockParams,
}

impl FlockConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject widths whose bird count or mesh size overflows `u32`.
    ///
    /// A zero width passes here; the compute backends report it as an empty
    /// grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match mesh_vertex_count(self.width) {
            Some(_) => Ok(()),
            None => Err(ConfigError::InvalidWidth(self.width)),
        }
    }

    /// Number of birds this configuration produces.
    pub fn agent_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.width)
    }
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            bounds: DEFAULT_BOUNDS,
            seed: None,
            params: FlockParams::default(),
        }
    }
}

/// Uniform block shared by the velocity and position steps.
///
/// Mirrors `struct StepUniforms` in the WGSL kernels.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StepUniforms {
    /// Predator position in steering units; multiplied by `bounds` in the kernel.
    pub predator: [f32; 3],
    pub time: f32,
    pub delta: f32,
    pub separation_distance: f32,
    pub alignment_distance: f32,
    pub cohesion_distance: f32,
    pub freedom_factor: f32,
    pub bounds: f32,
    pub width: u32,
    pub _pad: u32,
}

const _: () = assert!(
    std::mem::size_of::<StepUniforms>() == 48,
    "size of StepUniforms does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(StepUniforms, time) == 12,
    "offset of StepUniforms.time does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(StepUniforms, width) == 40,
    "offset of StepUniforms.width does not match WGSL"
);

impl StepUniforms {
    /// Assemble the uniforms for one step.
    pub fn new(params: &FlockParams, time: f32, delta: f32, predator: Vec3, bounds: f32, width: u32) -> Self {
        Self {
            predator: predator.to_array(),
            time,
            delta,
            separation_distance: params.separation,
            alignment_distance: params.alignment,
            cohesion_distance: params.cohesion,
            freedom_factor: params.freedom,
            bounds,
            width,
            _pad: 0,
        }
    }

    #[inline]
    pub fn predator(&self) -> Vec3 {
        Vec3::from_array(self.predator)
    }
}
