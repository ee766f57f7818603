//! Texture-shaped state storage for the flock.
//!
//! Each bird owns one texel in a `width × width` grid. Two grids hold the
//! flock: positions (`xyz` plus the wing phase in `w`) and velocities (`xyz`
//! plus a constant `1.0` flag). Every grid is double-buffered through
//! [`PingPong`] so a step never reads a texel it is also writing.

use std::fmt;

use glam::{UVec2, Vec2, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Scale applied to the initial `(rand - 0.5)` velocity components.
pub const INITIAL_SPEED_SPREAD: f32 = 10.0;

/// Which per-bird quantity a state grid holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Velocity,
}

impl Attribute {
    /// Name used for the texture in shaders and labels.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Position => "texture_position",
            Attribute::Velocity => "texture_velocity",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One RGBA32F state grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateTexture {
    width: u32,
    texels: Vec<Vec4>,
}

impl StateTexture {
    /// A grid with every texel set to zero.
    pub fn zeroed(width: u32) -> Self {
        Self {
            width,
            texels: vec![Vec4::ZERO; texel_count(width)],
        }
    }

    /// Build a grid from row-major texels.
    ///
    /// # Panics
    ///
    /// Panics if `texels.len() != width * width`.
    pub fn from_texels(width: u32, texels: Vec<Vec4>) -> Self {
        assert_eq!(
            texels.len(),
            texel_count(width),
            "texel count does not match a {width}x{width} grid"
        );
        Self { width, texels }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Row-major index of a texel.
    #[inline]
    pub fn index_of(&self, coord: UVec2) -> usize {
        (coord.y * self.width + coord.x) as usize
    }

    /// Texel coordinate of a row-major index.
    #[inline]
    pub fn coord_of(&self, index: usize) -> UVec2 {
        let index = index as u32;
        UVec2::new(index % self.width, index / self.width)
    }

    /// Normalized coordinate of a texel center, as a fragment shader would see it.
    #[inline]
    pub fn uv_of(&self, index: usize) -> Vec2 {
        (self.coord_of(index).as_vec2() + Vec2::splat(0.5)) / self.width as f32
    }

    #[inline]
    pub fn get(&self, index: usize) -> Vec4 {
        self.texels[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: Vec4) {
        self.texels[index] = value;
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Vec4] {
        &mut self.texels
    }

    /// Raw bytes for upload into an `Rgba32Float` texture.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// A current/next pair that swaps in O(1).
#[derive(Clone, Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
    current: usize,
}

impl<T: Clone> PingPong<T> {
    /// Both halves start as copies of `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            buffers: [initial.clone(), initial],
            current: 0,
        }
    }
}

impl<T> PingPong<T> {
    /// The half written by the most recent step.
    #[inline]
    pub fn current(&self) -> &T {
        &self.buffers[self.current]
    }

    /// The half the next step writes into.
    #[inline]
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.buffers[1 - self.current]
    }

    /// Make the next half current.
    #[inline]
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

/// Position and velocity grids for the whole flock.
#[derive(Clone, Debug)]
pub struct StateStore {
    width: u32,
    bounds: f32,
    position: PingPong<StateTexture>,
    velocity: PingPong<StateTexture>,
}

impl StateStore {
    /// Seed a flock of `width²` birds inside a cube of side `bounds`.
    ///
    /// Positions are uniform in `[-bounds/2, bounds/2)³`, velocities uniform in
    /// `[-5, 5)³`. The same `seed` always produces the same grids.
    pub fn initialize(width: u32, bounds: f32, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (position, velocity) = fill_textures(width, bounds, &mut rng);
        Self::from_textures(bounds, position, velocity)
    }

    /// Wrap existing grids. Both grids must have the same width.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ.
    pub fn from_textures(bounds: f32, position: StateTexture, velocity: StateTexture) -> Self {
        assert_eq!(position.width(), velocity.width(), "state textures differ in width");
        Self {
            width: position.width(),
            bounds,
            position: PingPong::new(position),
            velocity: PingPong::new(velocity),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn bounds(&self) -> f32 {
        self.bounds
    }

    /// Number of birds.
    #[inline]
    pub fn agent_count(&self) -> usize {
        texel_count(self.width)
    }

    pub fn current_position(&self) -> &StateTexture {
        self.position.current()
    }

    pub fn current_velocity(&self) -> &StateTexture {
        self.velocity.current()
    }

    /// The grid most recently written for `attribute`.
    pub fn current(&self, attribute: Attribute) -> &StateTexture {
        match attribute {
            Attribute::Position => self.position.current(),
            Attribute::Velocity => self.velocity.current(),
        }
    }

    pub(crate) fn pair_mut(&mut self, attribute: Attribute) -> &mut PingPong<StateTexture> {
        match attribute {
            Attribute::Position => &mut self.position,
            Attribute::Velocity => &mut self.velocity,
        }
    }

    /// Make every next grid current.
    pub(crate) fn swap_all(&mut self) {
        self.position.swap();
        self.velocity.swap();
    }

    /// Copy the current grids into a serializable snapshot.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from_textures(self.current_position(), self.current_velocity())
    }
}

/// Texels in a `width`×`width` grid, computed without `u32` overflow.
#[inline]
pub fn texel_count(width: u32) -> usize {
    width as usize * width as usize
}

fn fill_textures(width: u32, bounds: f32, rng: &mut impl Rng) -> (StateTexture, StateTexture) {
    let count = texel_count(width);
    let half = bounds / 2.0;

    let position: Vec<Vec4> = (0..count)
        .map(|_| {
            let x = rng.gen::<f32>() * bounds - half;
            let y = rng.gen::<f32>() * bounds - half;
            let z = rng.gen::<f32>() * bounds - half;
            Vec4::new(x, y, z, 1.0)
        })
        .collect();

    let velocity: Vec<Vec4> = (0..count)
        .map(|_| {
            let x = rng.gen::<f32>() - 0.5;
            let y = rng.gen::<f32>() - 0.5;
            let z = rng.gen::<f32>() - 0.5;
            Vec4::new(
                x * INITIAL_SPEED_SPREAD,
                y * INITIAL_SPEED_SPREAD,
                z * INITIAL_SPEED_SPREAD,
                1.0,
            )
        })
        .collect();

    (
        StateTexture::from_texels(width, position),
        StateTexture::from_texels(width, velocity),
    )
}

/// Plain copy of both state grids, row-major, one `[x, y, z, w]` per bird.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub width: u32,
    pub position: Vec<[f32; 4]>,
    pub velocity: Vec<[f32; 4]>,
}

impl StateSnapshot {
    pub fn from_textures(position: &StateTexture, velocity: &StateTexture) -> Self {
        Self {
            width: position.width(),
            position: position.texels().iter().map(|t| t.to_array()).collect(),
            velocity: velocity.texels().iter().map(|t| t.to_array()).collect(),
        }
    }

    /// Largest absolute component difference between two snapshots.
    ///
    /// Returns `f32::INFINITY` when the grids have different shapes.
    pub fn max_abs_diff(&self, other: &StateSnapshot) -> f32 {
        if self.width != other.width
            || self.position.len() != other.position.len()
            || self.velocity.len() != other.velocity.len()
        {
            return f32::INFINITY;
        }
        self.position
            .iter()
            .zip(&other.position)
            .chain(self.velocity.iter().zip(&other.velocity))
            .flat_map(|(a, b)| a.iter().zip(b).map(|(x, y)| (x - y).abs()))
            .fold(0.0, f32::max)
    }
}
