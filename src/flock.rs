//! Per-texel flocking rules.
//!
//! These are the CPU forms of the velocity and position kernels. The WGSL in
//! `shaders/velocity.wgsl` and `shaders/position.wgsl` follows the same steps
//! in the same order.
//!
//! Velocity, in order:
//! 1. flee the predator when it is within [`PREY_RADIUS`] on the XY plane
//! 2. random wander scaled by the freedom factor
//! 3. pull toward the origin (stronger vertically)
//! 4. separation / alignment / cohesion against every other bird
//! 5. speed limit
//!
//! Position integrates velocity, wraps at the cube faces and advances the wing
//! phase.

use std::f32::consts::PI;

use glam::{Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

use crate::params::StepUniforms;
use crate::state::StateTexture;

/// Largest delta a single step will integrate.
pub const MAX_DELTA: f32 = 1.0;
/// Base speed limit.
pub const SPEED_LIMIT: f32 = 9.0;
/// Extra speed allowed while fleeing.
pub const FLEE_SPEED_BONUS: f32 = 5.0;
/// Distance at which birds notice the predator.
pub const PREY_RADIUS: f32 = 150.0;
/// Strength of the predator push.
pub const PREDATOR_STRENGTH: f32 = 100.0;
/// Strength of the pull toward the origin.
pub const CENTER_PULL: f32 = 5.0;
/// Vertical weighting of the pull toward the origin.
pub const CENTER_PULL_Y_SCALE: f32 = 2.5;
/// Wander strength at `freedom = 1`.
pub const FREEDOM_STRENGTH: f32 = 5.0;
/// Birds closer than this are treated as the same point.
pub const MIN_NEIGHBOR_DISTANCE: f32 = 0.0001;
/// World units travelled per unit of velocity per second.
pub const POSITION_SCALE: f32 = 15.0;
/// Wing phase wraps at roughly 20π.
pub const PHASE_PERIOD: f32 = 62.83;

const TAU: f32 = PI * 2.0;

/// Clamp a raw frame delta to the range the kernels accept.
#[inline]
pub fn safe_delta(delta: f32) -> f32 {
    if delta.is_nan() {
        0.0
    } else {
        delta.clamp(0.0, MAX_DELTA)
    }
}

/// Shader-style hash in `[0, 1)`.
#[inline]
pub fn hash(co: Vec2) -> f32 {
    let v = (co.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.5453;
    v - v.floor()
}

/// Three decorrelated hashes for the wander direction.
#[inline]
pub fn hash3(co: Vec2) -> Vec3 {
    Vec3::new(
        hash(co),
        hash(co + Vec2::new(17.31, 5.17)),
        hash(co + Vec2::new(3.71, 29.93)),
    )
}

/// Wrap one coordinate into `[-half, half)`.
#[inline]
pub fn wrap_coord(value: f32, bounds: f32) -> f32 {
    let half = bounds / 2.0;
    if value >= -half && value < half {
        return value;
    }
    let wrapped = (value + half).rem_euclid(bounds) - half;
    // rem_euclid can land exactly on `bounds` for tiny negative inputs
    if wrapped >= half {
        -half
    } else {
        wrapped
    }
}

/// Wrap a position into the cube. Axes already inside are returned untouched.
#[inline]
pub fn wrap_position(position: Vec3, bounds: f32) -> Vec3 {
    Vec3::new(
        wrap_coord(position.x, bounds),
        wrap_coord(position.y, bounds),
        wrap_coord(position.z, bounds),
    )
}

/// New velocity texel for the bird at `index`.
pub fn velocity_texel(
    index: usize,
    positions: &StateTexture,
    velocities: &StateTexture,
    uniforms: &StepUniforms,
) -> Vec4 {
    let delta = safe_delta(uniforms.delta);
    let self_position = positions.get(index).xyz();
    let mut velocity = velocities.get(index).xyz();
    let mut limit = SPEED_LIMIT;

    // Predator, on the XY plane only.
    let mut dir = uniforms.predator() * uniforms.bounds - self_position;
    dir.z = 0.0;
    let dist = dir.length();
    if dist < PREY_RADIUS {
        let f = (dist * dist / (PREY_RADIUS * PREY_RADIUS) - 1.0) * delta * PREDATOR_STRENGTH;
        velocity += dir.normalize_or_zero() * f;
        limit += FLEE_SPEED_BONUS;
    }

    if uniforms.freedom_factor > 0.0 {
        let uv = positions.uv_of(index);
        let jitter = hash3(uv + Vec2::splat(uniforms.time)) * 2.0 - Vec3::ONE;
        velocity += jitter * uniforms.freedom_factor * FREEDOM_STRENGTH * delta;
    }

    let mut center = self_position;
    center.y *= CENTER_PULL_Y_SCALE;
    velocity -= center.normalize_or_zero() * delta * CENTER_PULL;

    velocity += neighbor_steering(self_position, positions, velocities, uniforms, delta);

    if velocity.length() > limit {
        velocity = velocity.normalize() * limit;
    }

    velocity.extend(1.0)
}

/// Summed separation, alignment and cohesion from every other bird.
fn neighbor_steering(
    self_position: Vec3,
    positions: &StateTexture,
    velocities: &StateTexture,
    uniforms: &StepUniforms,
    delta: f32,
) -> Vec3 {
    let separation = uniforms.separation_distance;
    let alignment = uniforms.alignment_distance;
    let zone_radius = separation + uniforms.alignment_distance + uniforms.cohesion_distance;
    if zone_radius <= 0.0 {
        return Vec3::ZERO;
    }

    let separation_thresh = separation / zone_radius;
    let alignment_thresh = (separation + alignment) / zone_radius;
    let zone_radius_sq = zone_radius * zone_radius;

    let mut steer = Vec3::ZERO;
    for (other, other_position) in positions.texels().iter().enumerate() {
        let dir = other_position.xyz() - self_position;
        let dist = dir.length();
        if dist < MIN_NEIGHBOR_DISTANCE {
            continue;
        }
        let dist_sq = dist * dist;
        if dist_sq > zone_radius_sq {
            continue;
        }

        let percent = dist_sq / zone_radius_sq;
        let heading = dir / dist;

        if percent < separation_thresh {
            let f = (separation_thresh / percent - 1.0) * delta;
            steer -= heading * f;
        } else if percent < alignment_thresh {
            let thresh_delta = alignment_thresh - separation_thresh;
            let adjusted = (percent - separation_thresh) / thresh_delta;
            let other_velocity = velocities.get(other).xyz();
            let f = (0.5 - (adjusted * TAU).cos() * 0.5 + 0.5) * delta;
            steer += other_velocity.normalize_or_zero() * f;
        } else {
            let thresh_delta = 1.0 - alignment_thresh;
            let adjusted = if thresh_delta == 0.0 {
                1.0
            } else {
                (percent - alignment_thresh) / thresh_delta
            };
            let f = (0.5 - ((adjusted * TAU).cos() * -0.5 + 0.5)) * delta;
            steer += heading * f;
        }
    }
    steer
}

/// New position texel for the bird at `index`.
pub fn position_texel(
    index: usize,
    positions: &StateTexture,
    velocities: &StateTexture,
    uniforms: &StepUniforms,
) -> Vec4 {
    let delta = safe_delta(uniforms.delta);
    let current = positions.get(index);
    let velocity = velocities.get(index).xyz();

    let phase = (current.w
        + delta
        + velocity.xz().length() * delta * 3.0
        + velocity.y.max(0.0) * delta * 6.0)
        % PHASE_PERIOD;

    let moved = current.xyz() + velocity * delta * POSITION_SCALE;
    wrap_position(moved, uniforms.bounds).extend(phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FlockParams;

    fn uniforms(params: &FlockParams, delta: f32, predator: Vec3) -> StepUniforms {
        StepUniforms::new(params, 1.0, delta, predator, 800.0, 2)
    }

    fn grid(texels: [Vec4; 4]) -> StateTexture {
        StateTexture::from_texels(2, texels.to_vec())
    }

    const FAR: Vec3 = Vec3::new(1.0e4, 1.0e4, 0.0);

    #[test]
    fn test_safe_delta() {
        assert_eq!(safe_delta(-0.5), 0.0);
        assert_eq!(safe_delta(0.25), 0.25);
        assert_eq!(safe_delta(30.0), MAX_DELTA);
        assert_eq!(safe_delta(f32::NAN), 0.0);
    }

    #[test]
    fn test_hash_range() {
        for i in 0..100 {
            let h = hash(Vec2::new(i as f32 * 0.37, i as f32 * 1.1));
            assert!((0.0..1.0).contains(&h));
        }
    }

    #[test]
    fn test_wrap_coord() {
        assert_eq!(wrap_coord(10.0, 800.0), 10.0);
        assert_eq!(wrap_coord(-400.0, 800.0), -400.0);
        assert_eq!(wrap_coord(400.0, 800.0), -400.0);
        assert!((wrap_coord(410.0, 800.0) - -390.0).abs() < 1e-4);
        assert!((wrap_coord(-410.0, 800.0) - 390.0).abs() < 1e-4);
        assert!((wrap_coord(1210.0, 800.0) - -390.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_delta_keeps_position() {
        let positions = grid([
            Vec4::new(1.0, 2.0, 3.0, 0.5),
            Vec4::new(-100.0, 50.0, 20.0, 1.0),
            Vec4::new(399.0, -399.0, 0.0, 2.0),
            Vec4::new(0.0, 0.0, 0.0, 3.0),
        ]);
        let velocities = grid([Vec4::new(9.0, -9.0, 4.0, 1.0); 4]);
        let u = uniforms(&FlockParams::default(), 0.0, FAR);

        for i in 0..4 {
            assert_eq!(position_texel(i, &positions, &velocities, &u), positions.get(i));
        }
    }

    #[test]
    fn test_position_wraps_one_axis() {
        let positions = grid([Vec4::new(395.0, 10.0, -20.0, 1.0); 4]);
        let velocities = grid([Vec4::new(2.0, 0.0, 0.0, 1.0); 4]);
        let u = uniforms(&FlockParams::default(), 0.5, FAR);

        // 395 + 2 * 0.5 * 15 = 410 -> -390
        let p = position_texel(0, &positions, &velocities, &u);
        assert!((p.x - -390.0).abs() < 1e-3, "x = {}", p.x);
        assert_eq!(p.y, 10.0);
        assert_eq!(p.z, -20.0);
    }

    #[test]
    fn test_position_phase_advances() {
        let positions = grid([Vec4::new(0.0, 0.0, 0.0, 1.0); 4]);
        let velocities = grid([Vec4::new(3.0, 2.0, 4.0, 1.0); 4]);
        let u = uniforms(&FlockParams::default(), 0.1, FAR);

        let p = position_texel(0, &positions, &velocities, &u);
        // 1 + 0.1 + 5 * 0.1 * 3 + 2 * 0.1 * 6
        assert!((p.w - 3.8).abs() < 1e-5, "phase = {}", p.w);
    }

    #[test]
    fn test_speed_limit() {
        let positions = grid([
            Vec4::new(100.0, 100.0, 100.0, 1.0),
            Vec4::new(-300.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 300.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 300.0, 1.0),
        ]);
        let velocities = grid([Vec4::new(50.0, 0.0, 0.0, 1.0); 4]);
        let u = uniforms(&FlockParams::inert(), 1.0 / 60.0, FAR);

        let v = velocity_texel(0, &positions, &velocities, &u);
        assert!((v.xyz().length() - SPEED_LIMIT).abs() < 1e-4);
        assert_eq!(v.w, 1.0);
    }

    #[test]
    fn test_predator_repels() {
        let positions = grid([
            Vec4::new(50.0, 0.0, 0.0, 1.0),
            Vec4::new(-300.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 300.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 300.0, 1.0),
        ]);
        let velocities = grid([Vec4::new(0.0, 0.0, 0.0, 1.0); 4]);
        let params = FlockParams::inert();

        let calm = velocity_texel(0, &positions, &velocities, &uniforms(&params, 0.01, FAR));
        let chased = velocity_texel(0, &positions, &velocities, &uniforms(&params, 0.01, Vec3::ZERO));

        // predator at the origin pushes the bird further along +x
        assert!(chased.x > calm.x);
    }

    #[test]
    fn test_neighbors_ignored_when_rules_off() {
        let positions = grid([
            Vec4::new(10.0, 10.0, 10.0, 1.0),
            Vec4::new(12.0, 10.0, 10.0, 1.0),
            Vec4::new(200.0, 10.0, 10.0, 1.0),
            Vec4::new(10.0, 15.0, 10.0, 1.0),
        ]);
        let velocities = grid([
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(-3.0, 2.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, 4.0, 1.0),
            Vec4::new(0.0, -5.0, 0.0, 1.0),
        ]);
        let lone_positions = grid([
            Vec4::new(10.0, 10.0, 10.0, 1.0),
            Vec4::new(390.0, 390.0, 390.0, 1.0),
            Vec4::new(-390.0, 390.0, 390.0, 1.0),
            Vec4::new(390.0, -390.0, 390.0, 1.0),
        ]);
        let u = uniforms(&FlockParams::inert(), 1.0 / 60.0, FAR);

        let crowded = velocity_texel(0, &positions, &velocities, &u);
        let alone = velocity_texel(0, &lone_positions, &velocities, &u);
        assert_eq!(crowded, alone);
    }

    #[test]
    fn test_separation_pushes_apart() {
        let positions = grid([
            Vec4::new(100.0, 0.0, 0.0, 1.0),
            Vec4::new(102.0, 0.0, 0.0, 1.0),
            Vec4::new(-300.0, 300.0, 0.0, 1.0),
            Vec4::new(-300.0, -300.0, 0.0, 1.0),
        ]);
        let velocities = grid([Vec4::new(0.0, 0.0, 0.0, 1.0); 4]);
        let mut params = FlockParams::inert();
        params.separation = 20.0;

        let with = velocity_texel(0, &positions, &velocities, &uniforms(&params, 0.01, FAR));
        let without = velocity_texel(0, &positions, &velocities, &uniforms(&FlockParams::inert(), 0.01, FAR));
        assert!(with.x < without.x, "separation should push bird 0 toward -x");
    }
}
