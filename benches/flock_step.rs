//! Benchmarks for the CPU step and mesh construction.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use murmur::compute::{CpuCompute, GridCompute};
use murmur::geometry::build_mesh;
use murmur::params::{FlockParams, StepUniforms};
use murmur::state::StateStore;

fn bench_cpu_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_step");

    // all-pairs, so cost grows with width⁴
    for width in [8u32, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let store = StateStore::initialize(width, 800.0, Some(1));
            let mut compute = CpuCompute::new(store).expect("cpu backend");
            let uniforms = StepUniforms::new(
                &FlockParams::default(),
                0.0,
                1.0 / 60.0,
                Vec3::splat(1.0e4),
                800.0,
                width,
            );
            b.iter(|| compute.step(black_box(&uniforms)))
        });
    }

    group.finish();
}

fn bench_build_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_mesh");

    for width in [32u32, 64, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| black_box(build_mesh(black_box(width))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cpu_step, bench_build_mesh);
criterion_main!(benches);
