use bytemuck::{Pod, Zeroable};

use crate::state::Attribute;

pub const VELOCITY_SOURCE: &str = include_str!("shaders/velocity.wgsl");
pub const POSITION_SOURCE: &str = include_str!("shaders/position.wgsl");
pub const BIRDS_SOURCE: &str = include_str!("shaders/birds.wgsl");

/// Workgroup edge of the compute kernels (`@workgroup_size(8, 8)`).
pub const WORKGROUP_SIZE: u32 = 8;

/// Compute kernel writing `attribute`.
pub fn kernel_source(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::Velocity => VELOCITY_SOURCE,
        Attribute::Position => POSITION_SOURCE,
    }
}

/// Mirrors `struct BirdUniforms` in `birds.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BirdUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub time: f32,
    pub delta: f32,
    pub _padding: [f32; 2],
}

const _: () = assert!(
    std::mem::size_of::<BirdUniforms>() == 144,
    "size of BirdUniforms does not match WGSL"
);
