//! Static bird mesh.
//!
//! Every bird is three triangles (body, left wing, right wing), nine vertices
//! in all. Vertices never move on the CPU: each carries the texel reference of
//! its bird, and the vertex shader looks up position and velocity from the
//! state textures at draw time.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2, Vec3};

use crate::state::texel_count;

/// Vertices per bird.
pub const VERTICES_PER_BIRD: usize = 9;

/// Uniform scale applied to the local shape.
pub const BIRD_SCALE: f32 = 0.2;

/// Half the wing span of the unscaled shape.
pub const WING_SPAN: f32 = 20.0;

/// Darkest bird color.
const COLOR_BASE: u32 = 0x444444;
/// Color range spread across the flock.
const COLOR_SPREAD: u32 = 0x666666;

/// Unscaled local offsets for one bird.
const SHAPE: [[f32; 3]; VERTICES_PER_BIRD] = [
    // body
    [0.0, 0.0, -20.0],
    [0.0, 4.0, -20.0],
    [0.0, 0.0, 30.0],
    // left wing
    [0.0, 0.0, -15.0],
    [-WING_SPAN, 0.0, 0.0],
    [0.0, 0.0, 15.0],
    // right wing
    [0.0, 0.0, 15.0],
    [WING_SPAN, 0.0, 0.0],
    [0.0, 0.0, -15.0],
];

/// One mesh vertex.
///
/// Mirrors the vertex inputs of `shaders/birds.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BirdVertex {
    /// Local offset, already scaled.
    pub position: [f32; 3],
    /// Static tint in `0..=1` per channel.
    pub color: [f32; 3],
    /// Texel of the owning bird, as `(x / width, y / width)`.
    pub reference: [f32; 2],
    /// Role within the bird, `0..9`.
    pub bird_vertex: u32,
}

const _: () = assert!(
    std::mem::size_of::<BirdVertex>() == 36,
    "size of BirdVertex does not match the vertex layout"
);
const _: () = assert!(
    std::mem::offset_of!(BirdVertex, reference) == 24,
    "offset of BirdVertex.reference does not match the vertex layout"
);
const _: () = assert!(
    std::mem::offset_of!(BirdVertex, bird_vertex) == 32,
    "offset of BirdVertex.bird_vertex does not match the vertex layout"
);

impl BirdVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Uint32,
    ];

    /// Vertex buffer layout for the bird render pipeline.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BirdVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    pub fn reference(&self) -> Vec2 {
        Vec2::from_array(self.reference)
    }
}

/// The full flock mesh for a given grid width.
#[derive(Clone, Debug, PartialEq)]
pub struct BirdGeometry {
    width: u32,
    vertices: Vec<BirdVertex>,
}

impl BirdGeometry {
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn vertices(&self) -> &[BirdVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Bird index owning mesh vertex `vertex`.
#[inline]
pub fn bird_of(vertex: usize) -> usize {
    vertex / VERTICES_PER_BIRD
}

/// Texel of the bird owning mesh vertex `vertex`.
#[inline]
pub fn texel_of(vertex: usize, width: u32) -> UVec2 {
    let bird = bird_of(vertex) as u32;
    UVec2::new(bird % width, bird / width)
}

/// Packed `0xRRGGBB` tint for mesh vertex `vertex`.
pub fn vertex_color_hex(vertex: usize, width: u32) -> u32 {
    let birds = (width as f64) * (width as f64);
    let t = bird_of(vertex) as f64 / birds;
    (COLOR_BASE as f64 + t * COLOR_SPREAD as f64).floor() as u32
}

fn split_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Vertices in the mesh for `width²` birds, or `None` if that does not fit a
/// `u32` draw call.
pub fn mesh_vertex_count(width: u32) -> Option<u32> {
    width
        .checked_mul(width)?
        .checked_mul(VERTICES_PER_BIRD as u32)
}

/// Lay out `width²` birds.
///
/// A pure function of `width`: the same width always yields the same mesh.
pub fn build_mesh(width: u32) -> BirdGeometry {
    let birds = texel_count(width);
    let count = birds * VERTICES_PER_BIRD;
    let mut vertices = Vec::with_capacity(count);

    for v in 0..count {
        let tag = v % VERTICES_PER_BIRD;
        let local = Vec3::from_array(SHAPE[tag]) * BIRD_SCALE;
        let texel = texel_of(v, width);
        let reference = texel.as_vec2() / width as f32;

        vertices.push(BirdVertex {
            position: local.to_array(),
            color: split_hex(vertex_color_hex(v, width)),
            reference: reference.to_array(),
            bird_vertex: tag as u32,
        });
    }

    log::debug!("bird mesh: {} vertices for {} birds", count, birds);
    BirdGeometry { width, vertices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_vertex_count() {
        for width in [1, 2, 3, 8, 32] {
            let mesh = build_mesh(width);
            assert_eq!(mesh.vertices().len(), 9 * (width * width) as usize);
            assert_eq!(mesh.as_bytes().len(), mesh.vertices().len() * 36);
        }
        assert!(build_mesh(0).vertices().is_empty());
    }

    #[test]
    fn test_mesh_vertex_count_limit() {
        assert_eq!(mesh_vertex_count(32), Some(9216));
        assert_eq!(mesh_vertex_count(21845), Some(4_294_836_225));
        assert_eq!(mesh_vertex_count(21846), None);
        assert_eq!(mesh_vertex_count(65536), None);
        assert_eq!(texel_count(65536) as u64, 1_u64 << 32);
    }

    #[test]
    fn test_references_partition_mesh() {
        let width = 5;
        let mesh = build_mesh(width);
        let mut groups: HashMap<[u32; 2], Vec<u32>> = HashMap::new();
        for vertex in mesh.vertices() {
            let key = vertex.reference.map(f32::to_bits);
            groups.entry(key).or_default().push(vertex.bird_vertex);
        }

        assert_eq!(groups.len(), 25);
        for tags in groups.values() {
            assert_eq!(tags, &(0..9).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn test_reference_formula() {
        let mesh = build_mesh(4);
        // bird 6 sits at texel (2, 1)
        let v = &mesh.vertices()[6 * 9 + 3];
        assert_eq!(v.reference(), Vec2::new(0.5, 0.25));
        assert_eq!(texel_of(6 * 9 + 3, 4), UVec2::new(2, 1));
        assert_eq!(v.bird_vertex, 3);
    }

    #[test]
    fn test_layout_is_stable() {
        assert_eq!(build_mesh(6), build_mesh(6));
    }

    #[test]
    fn test_shape_and_color() {
        let mesh = build_mesh(2);
        let first = &mesh.vertices()[..9];
        assert_eq!(first[2].position(), Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(first[4].position(), Vec3::new(-4.0, 0.0, 0.0));
        assert_eq!(first[7].position(), Vec3::new(4.0, 0.0, 0.0));

        assert_eq!(vertex_color_hex(0, 2), 0x444444);
        // bird 2 of 4: 0x444444 + 0.5 * 0x666666
        assert_eq!(vertex_color_hex(18, 2), 0x777777);
        let c = mesh.vertices()[18].color;
        assert!((c[0] - 0x77 as f32 / 255.0).abs() < 1e-6);
        assert!(first.iter().all(|v| v.color == first[0].color));
    }
}
