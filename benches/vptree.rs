//! Benchmarks for vantage-point tree construction and search, side by side
//! with the cover tree on the same data.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metric_index::{CoverTree, CoverTreeParams, DistanceMetric, VpTree, VpTreeParams};
use rand::prelude::*;

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect())
        .collect()
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("vptree_construction");

    for n in [1000, 5000, 20000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        let vectors = random_vectors(*n, 8, 42);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bench, _| {
            bench.iter(|| {
                let params = VpTreeParams::default().with_seed(42);
                let mut tree = VpTree::new(&vectors, DistanceMetric::L2, params).unwrap();
                tree.build().unwrap();
                black_box(tree.stats())
            });
        });
    }

    group.finish();
}

fn bench_knn_vs_cover_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("vptree_vs_covertree_knn");

    for dim in [2, 8, 32].iter() {
        let vectors = random_vectors(20000, *dim, 42);
        let queries = random_vectors(100, *dim, 123);

        let mut vp = VpTree::new(&vectors, DistanceMetric::L2, VpTreeParams::default().with_seed(42))
            .unwrap();
        vp.build().unwrap();
        let mut cover =
            CoverTree::new(&vectors, DistanceMetric::L2, CoverTreeParams::default()).unwrap();
        cover.build().unwrap();

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new("vptree", dim), dim, |bench, _| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| vp.knn_by_object(black_box(q), 10).unwrap())
                    .collect::<Vec<_>>()
            });
        });
        group.bench_with_input(BenchmarkId::new("covertree", dim), dim, |bench, _| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| cover.knn_by_object(black_box(q), 10).unwrap())
                    .collect::<Vec<_>>()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_construction, bench_knn_vs_cover_tree);
criterion_main!(benches);
