use criterion::{criterion_group, criterion_main, Criterion, black_box};

use brume::atmosphere::{fbm3, gradient_noise3, compute_fog_factor, FogParameters, FogShape};
use brume::atmosphere::{FogConfig, FogSystem};
use brume::render::{build_program_source, ShadowFlags, SurfaceMaterial, STANDARD_SURFACE_WGSL};

use glam::Vec3;

fn bench_gradient_noise(c: &mut Criterion) {
    let p = Vec3::new(0.37, 12.5, -3.2);
    c.bench_function("gradient_noise3", |b| {
        b.iter(|| gradient_noise3(black_box(p)));
    });
}

fn bench_fbm(c: &mut Criterion) {
    let p = Vec3::new(0.37, 12.5, -3.2);
    c.bench_function("fbm3", |b| {
        b.iter(|| fbm3(black_box(p)));
    });
}

fn bench_fog_factor(c: &mut Criterion) {
    let params = FogParameters {
        time: 12.0,
        ..Default::default()
    };
    let shape = FogShape::default();
    let origin = Vec3::new(75.0, 50.0, 100.0);
    let world = Vec3::new(-400.0, 0.0, -900.0);

    c.bench_function("compute_fog_factor", |b| {
        b.iter(|| compute_fog_factor(black_box(world), black_box(origin), &params, &shape));
    });
}

fn bench_compose(c: &mut Criterion) {
    let shape = FogShape::default();
    c.bench_function("build_program_source", |b| {
        b.iter(|| build_program_source("bench", black_box(STANDARD_SURFACE_WGSL), &shape));
    });
}

fn bench_broadcast_100(c: &mut Criterion) {
    let mut fog = FogSystem::new(FogConfig::default(), None).expect("default fog config");
    let mut materials: Vec<SurfaceMaterial> = (0..100)
        .map(|i| SurfaceMaterial::new(format!("mat{i}"), [0.5; 3]))
        .collect();
    for m in &mut materials {
        fog.register_material(m, ShadowFlags::BOTH);
    }

    c.bench_function("broadcast_time_100_programs", |b| {
        b.iter(|| fog.update(black_box(0.016)));
    });
}

criterion_group!(
    benches,
    bench_gradient_noise,
    bench_fbm,
    bench_fog_factor,
    bench_compose,
    bench_broadcast_100,
);
criterion_main!(benches);
