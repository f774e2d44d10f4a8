//! Benchmarks for TIN construction and natural-neighbour raster fills

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lidem_algorithms::interpolation::{fill_raster, NaturalNeighborInterpolator};
use lidem_core::geo::{GeoCoordinate, PixelCenterCoordinate, RasterArea, RasterCoordinate, RasterDims};
use lidem_core::{Raster, ReferenceSystem};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Jittered grid of `n x n` points over [0, 1000)
fn create_points(n: usize) -> Vec<(f64, f64, f64)> {
    let step = 1000.0 / n as f64;
    let mut points = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let jitter_x = ((row * 7 + col * 13) % 17) as f64 / 17.0 - 0.5;
            let jitter_y = ((row * 11 + col * 5) % 19) as f64 / 19.0 - 0.5;
            let x = (col as f64 + 0.5 + 0.8 * jitter_x) * step;
            let y = (row as f64 + 0.5 + 0.8 * jitter_y) * step;
            let z = 100.0 + 0.05 * x + 0.02 * y + ((row + col) % 10) as f64;
            points.push((x, y, z));
        }
    }
    points
}

fn create_interpolator(points: &[(f64, f64, f64)]) -> NaturalNeighborInterpolator {
    let mut nn = NaturalNeighborInterpolator::new();
    for &(x, y, z) in points {
        nn.insert_point(GeoCoordinate::new(x, y), z).unwrap();
    }
    nn
}

fn create_grid(size: u32) -> Raster<f32> {
    let cs = 900.0 / size as f64;
    let area = RasterArea::from_center(
        PixelCenterCoordinate::new(50.0, 950.0),
        RasterDims::new(size, size),
        cs,
        ReferenceSystem::not_defined(),
    )
    .unwrap();
    let mut raster = Raster::new("DEM", area).with_nodata(9999.0);
    raster.format().unwrap();
    raster
}

fn bench_tin_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tin_build");
    group.sample_size(10);

    for n in [100usize, 200, 400].iter() {
        let points = create_points(*n);
        group.bench_with_input(BenchmarkId::new("ordered", n * n), n, |b, _| {
            b.iter(|| create_interpolator(black_box(&points)))
        });

        // flight-line order is far from scanline order
        let mut shuffled = points.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(42));
        group.bench_with_input(BenchmarkId::new("shuffled", n * n), n, |b, _| {
            b.iter(|| create_interpolator(black_box(&shuffled)))
        });
    }

    group.finish();
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");
    group.sample_size(10);
    let nn = create_interpolator(&create_points(200));

    for size in [128u32, 256, 512].iter() {
        group.bench_with_input(BenchmarkId::new("hinted", size), size, |b, &size| {
            b.iter(|| {
                let mut raster = create_grid(size);
                fill_raster(black_box(&nn), &mut raster).unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("cold", size), size, |b, &size| {
            let raster = create_grid(size);
            b.iter(|| {
                let mut sum = 0.0;
                for row in 0..size {
                    for col in 0..size {
                        let c = raster.area().to_geocoordinate(RasterCoordinate::new(col, row));
                        if let Ok(found) = nn.value_at(GeoCoordinate::from(c), None) {
                            sum += found.value;
                        }
                    }
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tin_build, bench_fill);
criterion_main!(benches);
