//! Criterion benchmarks for pyramid construction and reconstruction.
//!
//! Run with: cargo bench -p steerpyr_core
//! Run specific: cargo bench -p steerpyr_core -- steerable_build

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use rand::prelude::*;

use steerpyr_core::transforms::{fft2d, ifft2d, Fft2dPlans};
use steerpyr_core::{build_laplacian, build_steerable, reconstruct, to_real_bands};

// =============================================================================
// Helper Functions for Test Data Generation
// =============================================================================

fn random_matrix_f32(rows: usize, cols: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen())
}

fn random_matrix_f64(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen())
}

// =============================================================================
// FFT Benchmarks
// =============================================================================

fn bench_fft2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft2d");

    for size in [64, 128, 256] {
        let input = random_matrix_f64(size, size, 42);
        let plans = Fft2dPlans::new(size, size);

        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("roundtrip", size), &size, |b, _| {
            b.iter(|| {
                let f = fft2d(black_box(input.view()), &plans);
                ifft2d(f.view(), &plans)
            })
        });
    }

    group.finish();
}

// =============================================================================
// Steerable Pyramid Benchmarks
// =============================================================================

fn bench_steerable_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("steerable_build");

    for size in [64, 128, 256] {
        let image = random_matrix_f64(size, size, 7);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("h3_k4", size), &size, |b, _| {
            b.iter(|| build_steerable(black_box(image.view()), 3, 4, 1.0, 0.5))
        });
    }

    group.finish();
}

fn bench_steerable_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("steerable_reconstruct");

    for size in [64, 128, 256] {
        let image = random_matrix_f64(size, size, 11);
        let Ok(pyramid) = build_steerable(image.view(), 3, 4, 1.0, 0.5) else {
            continue;
        };
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("h3_k4", size), &size, |b, _| {
            b.iter(|| reconstruct(black_box(&pyramid)))
        });

        group.bench_with_input(BenchmarkId::new("real_bands", size), &size, |b, _| {
            b.iter(|| to_real_bands(black_box(&pyramid)))
        });
    }

    group.finish();
}

// =============================================================================
// Spatial Pyramid Benchmarks
// =============================================================================

fn bench_laplacian(c: &mut Criterion) {
    let mut group = c.benchmark_group("laplacian");

    for size in [64, 128, 256] {
        let image = random_matrix_f64(size, size, 5);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("roundtrip_h3", size), &size, |b, _| {
            b.iter(|| {
                build_laplacian(black_box(image.view()), 3).and_then(|p| reconstruct(&p))
            })
        });
    }

    group.finish();
}

// =============================================================================
// Precision Comparison
// =============================================================================

fn bench_precision_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("precision");
    let size = 128;
    let image_f32 = random_matrix_f32(size, size, 42);
    let image_f64 = random_matrix_f64(size, size, 42);

    group.throughput(Throughput::Elements((size * size) as u64));

    group.bench_function("build_f32", |b| {
        b.iter(|| build_steerable(black_box(image_f32.view()), 3, 4, 1.0f32, 0.5f32))
    });

    group.bench_function("build_f64", |b| {
        b.iter(|| build_steerable(black_box(image_f64.view()), 3, 4, 1.0f64, 0.5f64))
    });

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_fft2d,
    bench_steerable_build,
    bench_steerable_reconstruct,
    bench_laplacian,
    bench_precision_comparison,
);

criterion_main!(benches);
