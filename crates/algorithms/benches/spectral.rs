//! Benchmarks for reflectance correction and spectral angle mapping

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hypersam_algorithms::atmosphere::{cost_reflectance, dark_object_values, DarkObjectParams, SceneGeometry};
use hypersam_algorithms::imagery::{stretch_raster, StretchParams};
use hypersam_algorithms::spectral::spectral_angles;
use hypersam_core::{Cube, Raster};
use ndarray::{Array2, Array3};

const BANDS: usize = 64;

fn create_cube(size: usize) -> Cube {
    let data = Array3::from_shape_fn((BANDS, size, size), |(b, r, c)| {
        (1 + (r * 7 + c * 13 + b * 3) % 200) as f64
    });
    let labels = (8..8 + BANDS as u16).collect();
    let wavelengths = (0..BANDS).map(|i| 426.0 + 10.0 * i as f64).collect();
    Cube::new(data, labels, wavelengths).unwrap()
}

fn bench_stretch(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/stretch");
    for size in [256, 512, 1024] {
        let band = Raster::from_array(Array2::from_shape_fn((size, size), |(r, c)| {
            ((r * 7 + c * 13) % 200) as f64
        }));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| stretch_raster(black_box(&band), StretchParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("atmosphere/cost");
    let scene = SceneGeometry::from_sun_elevation(1.0, 50.0).unwrap();
    let irradiance = vec![150.0; BANDS];
    for size in [128, 256] {
        let cube = create_cube(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let dark = dark_object_values(black_box(&cube), &DarkObjectParams::default()).unwrap();
                cost_reflectance(&cube, &dark, &irradiance, &scene).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_sam(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectral/sam");
    let references = Array2::from_shape_fn((6, BANDS), |(k, b)| 0.1 + ((k * 17 + b) % 23) as f64 / 50.0);
    for size in [128, 256] {
        let field = create_cube(size).to_pixel_major();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| spectral_angles(black_box(field.view()), references.view()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stretch, bench_cost, bench_sam);
criterion_main!(benches);
