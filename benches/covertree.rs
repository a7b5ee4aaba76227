//! Benchmarks for cover tree construction and search.
//!
//! Uniform random vectors in a low dimension, where metric trees prune well.
//! Brute force is included as the baseline every tree has to beat.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use metric_index::{CoverTree, CoverTreeParams, DistanceMetric, PrioritySearch};
use rand::prelude::*;

fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect())
        .collect()
}

fn brute_force_knn(data: &[Vec<f32>], q: &[f32], k: usize) -> Vec<(u32, f64)> {
    let mut all: Vec<(u32, f64)> = data
        .iter()
        .enumerate()
        .map(|(i, x)| (i as u32, DistanceMetric::L2.eval(q, x)))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    all.truncate(k);
    all
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("covertree_construction");
    let dim = 8;

    for n in [1000, 5000, 20000].iter() {
        group.throughput(Throughput::Elements(*n as u64));
        let vectors = random_vectors(*n, dim, 42);

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |bench, _| {
            bench.iter(|| {
                let mut tree =
                    CoverTree::new(&vectors, DistanceMetric::L2, CoverTreeParams::default()).unwrap();
                tree.build().unwrap();
                black_box(tree.stats())
            });
        });
    }

    group.finish();
}

fn bench_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("covertree_knn_expansion");
    let vectors = random_vectors(20000, 8, 42);
    let queries = random_vectors(100, 8, 123);

    for expansion in [1.2, 1.3, 1.6, 2.0].iter() {
        let mut tree = CoverTree::new(
            &vectors,
            DistanceMetric::L2,
            CoverTreeParams::default().with_expansion(*expansion),
        )
        .unwrap();
        tree.build().unwrap();

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new("e", expansion), expansion, |bench, _| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| tree.knn_by_object(black_box(q), 10).unwrap())
                    .collect::<Vec<_>>()
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("covertree_search");
    let vectors = random_vectors(20000, 8, 42);
    let queries = random_vectors(100, 8, 123);

    let mut tree =
        CoverTree::new(&vectors, DistanceMetric::L2, CoverTreeParams::default()).unwrap();
    tree.build().unwrap();

    group.throughput(Throughput::Elements(queries.len() as u64));
    for k in [1, 10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("knn", k), k, |bench, &k| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| tree.knn_by_object(black_box(q), k).unwrap())
                    .collect::<Vec<_>>()
            });
        });
        group.bench_with_input(BenchmarkId::new("priority_nearest", k), k, |bench, &k| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| tree.priority_by_object(black_box(q)).unwrap().nearest(k))
                    .collect::<Vec<_>>()
            });
        });
        group.bench_with_input(BenchmarkId::new("brute_force", k), k, |bench, &k| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| brute_force_knn(&vectors, black_box(q), k))
                    .collect::<Vec<_>>()
            });
        });
    }

    for radius in [0.2, 0.4].iter() {
        group.bench_with_input(BenchmarkId::new("range", radius), radius, |bench, &r| {
            bench.iter(|| {
                queries
                    .iter()
                    .map(|q| tree.range_by_object(black_box(q), r).unwrap().len())
                    .sum::<usize>()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_construction, bench_expansion, bench_search);
criterion_main!(benches);
