use cellway_backend::{proximity::find_towers_along_route, selector::select_optimized_routes};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::{Coordinate, Route, Tower};

/// Zig-zag route of `points` vertices heading east from (45.0, 5.0).
fn zigzag_route(points: usize, offset: f64, duration: f64) -> Route {
    let coords = (0..points)
        .map(|i| {
            let lat = 45.0 + offset + if i % 2 == 0 { 0.0 } else { 0.002 };
            Coordinate::new(5.0 + i as f64 * 0.001, lat)
        })
        .collect();
    Route::from_path(coords, points as f64 * 80.0, duration)
}

fn random_towers(count: usize, rng: &mut StdRng) -> Vec<Tower> {
    (0..count)
        .map(|_| {
            Tower::at(
                rng.random_range(44.9..45.1),
                rng.random_range(4.9..5.6),
                rng.random_range(-115..=-65),
            )
        })
        .collect()
}

fn benchmark_proximity(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let route = zigzag_route(500, 0.0, 600.0);
    let mut group = c.benchmark_group("towers_along_route");

    for count in [50, 500, 5000] {
        let towers = random_towers(count, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(count), &towers, |b, towers| {
            b.iter(|| find_towers_along_route(black_box(route.coordinates()), towers, 2500.0));
        });
    }

    group.finish();
}

fn benchmark_selection(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let towers = random_towers(500, &mut rng);
    let candidates: Vec<Route> = (0..5)
        .map(|i| zigzag_route(400, i as f64 * 0.01, 600.0 + i as f64 * 45.0))
        .collect();

    c.bench_function("select_optimized_routes_5x500", |b| {
        b.iter(|| select_optimized_routes(black_box(&candidates), black_box(&towers)));
    });
}

criterion_group!(benches, benchmark_proximity, benchmark_selection);
criterion_main!(benches);
