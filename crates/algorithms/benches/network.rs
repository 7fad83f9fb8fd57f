//! Benchmarks for network referencing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reachline_algorithms::network::{generate_stations, project_points, ObservedPoint, ProjectionParams};
use reachline_algorithms::profile::{assemble_profile, despike, VertexElevation};
use reachline_core::{build_alignment, Alignment, Point3, Polyline};
use std::f64::consts::PI;

/// A comb: one meandering main stem with a tributary joining at every
/// tooth. Each reach has `vertices` vertices.
/// Reach ends land within float noise of each other, well inside the
/// default node epsilon.
fn create_network(teeth: usize, vertices: usize) -> Alignment {
    let mut polylines = Vec::with_capacity(2 * teeth);
    for t in 0..teeth {
        let x0 = t as f64 * 100.0;
        let main: Vec<Point3> = (0..vertices)
            .map(|i| {
                let f = i as f64 / (vertices - 1) as f64;
                let x = x0 + 100.0 * f;
                Point3::new(x, 5.0 * (f * 4.0 * PI).sin(), 1000.0 - x * 0.5)
            })
            .collect();
        polylines.push(Polyline::new(main));

        let trib: Vec<Point3> = (0..vertices)
            .map(|i| {
                let f = i as f64 / (vertices - 1) as f64;
                Point3::new(x0 + 3.0 * (f * 2.0 * PI).sin(), 200.0 * (1.0 - f), 1100.0 - x0 * 0.5 - 100.0 * f)
            })
            .collect();
        polylines.push(Polyline::new(trib));
    }
    build_alignment(polylines).unwrap()
}

fn create_points(n: usize, extent: f64) -> Vec<ObservedPoint> {
    (0..n)
        .map(|i| {
            let x = (i * 7919 % 10_000) as f64 / 10_000.0 * extent;
            let y = ((i * 104_729 % 10_000) as f64 / 10_000.0 - 0.25) * 240.0;
            ObservedPoint::new(format!("p{i}"), (x, y, 0.0))
        })
        .collect()
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_points");
    let network = create_network(50, 64);

    for n in [100, 1_000, 10_000].iter() {
        let points = create_points(*n, 5_000.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| project_points(black_box(&network), black_box(&points), ProjectionParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_stations_and_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("stations");
    let network = create_network(50, 256);
    let source = network.edges()[1].from;
    let path = network.path(source, network.outlet().unwrap()).unwrap();

    for spacing in [1.0, 10.0].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(spacing), spacing, |b, &s| {
            b.iter(|| generate_stations(black_box(&network), black_box(&path), s).unwrap())
        });
    }
    group.finish();

    c.bench_function("profile_despike", |b| {
        b.iter(|| {
            let profile = assemble_profile(black_box(&network), &path, &VertexElevation).unwrap();
            despike(&profile, 0.5).unwrap()
        })
    });
}

criterion_group!(benches, bench_projection, bench_stations_and_profile);
criterion_main!(benches);
