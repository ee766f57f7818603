//! End-to-end properties of the CPU backend, the mesh layout and the frame
//! driver working together.

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};
use murmur::compute::{CpuCompute, GridCompute};
use murmur::driver::FrameDriver;
use murmur::flock::{
    wrap_position, CENTER_PULL, CENTER_PULL_Y_SCALE, FLEE_SPEED_BONUS, PHASE_PERIOD, POSITION_SCALE,
    SPEED_LIMIT,
};
use murmur::geometry::{build_mesh, texel_of, VERTICES_PER_BIRD};
use murmur::params::{FlockParams, StepUniforms};
use murmur::session::FlockSession;
use murmur::state::{StateStore, StateTexture};
use murmur::Simulation;

const BOUNDS: f32 = 800.0;
const FAR: Vec3 = Vec3::new(1.0e4, 1.0e4, 0.0);

fn step_once(store: StateStore, params: &FlockParams, delta: f32) -> CpuCompute {
    let width = store.width();
    let mut compute = CpuCompute::new(store).expect("cpu backend");
    compute.step(&StepUniforms::new(params, 1.0, delta, FAR, BOUNDS, width));
    compute
}

// ============================================================================
// Mesh layout
// ============================================================================

#[test]
fn test_mesh_groups_for_many_widths() {
    for width in 1..=8u32 {
        let mesh = build_mesh(width);
        let birds = (width * width) as usize;
        assert_eq!(mesh.vertices().len(), birds * VERTICES_PER_BIRD);

        let mut counts = vec![0usize; birds];
        for (v, vertex) in mesh.vertices().iter().enumerate() {
            let texel = texel_of(v, width);
            let bird = (texel.y * width + texel.x) as usize;
            counts[bird] += 1;

            let expected = texel.as_vec2() / width as f32;
            assert_eq!(vertex.reference(), expected);
        }
        assert!(counts.iter().all(|&c| c == VERTICES_PER_BIRD));
    }
}

// ============================================================================
// State store
// ============================================================================

#[test]
fn test_seeded_initialization_repeats() {
    let a = StateStore::initialize(16, BOUNDS, Some(1234));
    let b = StateStore::initialize(16, BOUNDS, Some(1234));
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_unseeded_initialization_differs() {
    let a = StateStore::initialize(8, BOUNDS, None);
    let b = StateStore::initialize(8, BOUNDS, None);
    assert_ne!(a.snapshot(), b.snapshot());
}

// ============================================================================
// Step semantics
// ============================================================================

#[test]
fn test_zero_delta_leaves_positions() {
    let store = StateStore::initialize(6, BOUNDS, Some(5));
    let before = store.current_position().clone();

    let compute = step_once(store, &FlockParams::default(), 0.0);
    assert_eq!(compute.store().current_position(), &before);
}

#[test]
fn test_wrap_changes_only_the_exiting_axis() {
    let positions = vec![
        Vec4::new(399.0, 120.0, -50.0, 1.0),
        Vec4::new(-300.0, -300.0, -300.0, 1.0),
        Vec4::new(300.0, -300.0, 300.0, 1.0),
        Vec4::new(-300.0, 300.0, 300.0, 1.0),
    ];
    let velocities = vec![
        Vec4::new(2.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    ];
    let store = StateStore::from_textures(
        BOUNDS,
        StateTexture::from_texels(2, positions),
        StateTexture::from_texels(2, velocities),
    );

    // 399 + 2 * 0.1 * 15 = 402, which re-enters at -398
    let compute = step_once(store, &FlockParams::inert(), 0.1);
    let p = compute.store().current_position().get(0);
    assert!((p.x - -398.0).abs() < 1e-3, "x = {}", p.x);
    assert_eq!(p.yz(), Vec2::new(120.0, -50.0));
}

#[test]
fn test_co_located_birds_stay_together() {
    let shared_position = Vec4::new(40.0, -25.0, 10.0, 1.0);
    let shared_velocity = Vec4::new(3.0, 1.0, -2.0, 1.0);
    let positions = vec![
        shared_position,
        shared_position,
        Vec4::new(45.0, -20.0, 12.0, 1.0),
        Vec4::new(-200.0, 100.0, 0.0, 1.0),
    ];
    let velocities = vec![
        shared_velocity,
        shared_velocity,
        Vec4::new(-4.0, 0.0, 4.0, 1.0),
        Vec4::new(0.0, 5.0, 0.0, 1.0),
    ];
    let store = StateStore::from_textures(
        BOUNDS,
        StateTexture::from_texels(2, positions),
        StateTexture::from_texels(2, velocities),
    );

    let mut compute = CpuCompute::new(store).expect("cpu backend");
    let params = FlockParams::inert();
    for i in 0..20 {
        let uniforms = StepUniforms::new(&params, i as f32 / 60.0, 1.0 / 60.0, FAR, BOUNDS, 2);
        compute.step(&uniforms);

        let store = compute.store();
        assert_eq!(store.current_position().get(0), store.current_position().get(1));
        assert_eq!(store.current_velocity().get(0), store.current_velocity().get(1));
    }
}

#[test]
fn test_single_step_matches_hand_integration() {
    let store = StateStore::initialize(2, BOUNDS, Some(77));
    let old_positions = store.current_position().clone();
    let old_velocities = store.current_velocity().clone();
    let delta = 1.0 / 60.0;

    let compute = step_once(store, &FlockParams::inert(), delta);

    for i in 0..4 {
        let p = old_positions.get(i).xyz();
        let v = old_velocities.get(i).xyz();

        let mut pull = p;
        pull.y *= CENTER_PULL_Y_SCALE;
        let mut expected_v = v - pull.normalize() * delta * CENTER_PULL;
        if expected_v.length() > SPEED_LIMIT {
            expected_v = expected_v.normalize() * SPEED_LIMIT;
        }
        let got_v = compute.store().current_velocity().get(i).xyz();
        assert!(got_v.abs_diff_eq(expected_v, 1e-4), "bird {i}: {got_v} vs {expected_v}");

        let expected_p = wrap_position(p + v * delta * POSITION_SCALE, BOUNDS);
        let got_p = compute.store().current_position().get(i).xyz();
        assert!(got_p.abs_diff_eq(expected_p, 1e-3), "bird {i}: {got_p} vs {expected_p}");
    }
}

#[test]
fn test_velocity_stays_under_limit() {
    let mut session = Simulation::new()
        .with_width(6)
        .with_seed(3)
        .cpu_session()
        .expect("cpu session");
    let mut driver = FrameDriver::new(0.0, 800, 600);

    for frame in 1..=30 {
        // drag the predator across the middle of the flock
        driver.submit_steering(Vec2::new(frame as f32 * 10.0 - 150.0, 0.0));
        driver.render_frame(frame as f64 / 60.0, &mut session, &mut ());
    }

    let snapshot = session.snapshot().expect("snapshot");
    for v in &snapshot.velocity {
        let speed = Vec3::new(v[0], v[1], v[2]).length();
        assert!(speed <= SPEED_LIMIT + FLEE_SPEED_BONUS + 1e-3, "speed {speed}");
        assert_eq!(v[3], 1.0);
    }
    for p in &snapshot.position {
        for c in &p[..3] {
            assert!((-400.0..400.0).contains(c));
        }
        assert!((0.0..PHASE_PERIOD).contains(&p[3]));
    }
}

#[test]
fn test_session_reports_steps() {
    let store = StateStore::initialize(2, BOUNDS, Some(1));
    let backend = CpuCompute::new(store).expect("cpu backend");
    let mut session = FlockSession::new(backend, FlockParams::default(), BOUNDS);
    let mut driver = FrameDriver::new(0.0, 800, 600);

    for frame in 1..=3 {
        driver.render_frame(frame as f64 / 60.0, &mut session, &mut ());
    }
    assert_eq!(session.steps(), 3);
    assert_eq!(session.into_backend().steps(), 3);
}
