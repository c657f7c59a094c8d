use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use im::OrdSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::hint::black_box;

use snapset::Forest;

fn random_keys(length: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(length as u64);
    (0..length).map(|_| rng.gen()).collect()
}

fn std_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("std");

    for i in [10, 100, 1000, 10000, 100000].iter() {
        group.throughput(Throughput::Elements(*i));
        group.bench_with_input(BenchmarkId::new("put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            b.iter_with_large_drop(|| BTreeSet::from_iter(black_box(&samples).iter().copied()));
        });
        group.bench_with_input(BenchmarkId::new("snapshot_put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let set = BTreeSet::from_iter(samples.iter().copied());
            b.iter_with_large_drop(|| {
                let mut copy = black_box(&set).clone();
                copy.insert(black_box(0));
                copy
            });
        });
        group.bench_with_input(BenchmarkId::new("range", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let set = BTreeSet::from_iter(samples.iter().copied());
            b.iter(|| black_box(&set).range(-(1i64 << 62)..=(1i64 << 62)).count());
        });
    }
    group.finish();
}

fn im_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("im");

    for i in [10, 100, 1000, 10000, 100000].iter() {
        group.throughput(Throughput::Elements(*i));
        group.bench_with_input(BenchmarkId::new("put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            b.iter_with_large_drop(|| OrdSet::from_iter(black_box(&samples).iter().copied()));
        });
        group.bench_with_input(BenchmarkId::new("snapshot_put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let set = OrdSet::from_iter(samples.iter().copied());
            b.iter_with_large_drop(|| {
                let mut copy = black_box(&set).clone();
                copy.insert(black_box(0));
                copy
            });
        });
        group.bench_with_input(BenchmarkId::new("range", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let set = OrdSet::from_iter(samples.iter().copied());
            b.iter(|| black_box(&set).range(-(1i64 << 62)..=(1i64 << 62)).count());
        });
    }
    group.finish();
}

fn treap_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("treap");

    for i in [10, 100, 1000, 10000, 100000].iter() {
        group.throughput(Throughput::Elements(*i));
        group.bench_with_input(BenchmarkId::new("put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            b.iter_with_large_drop(|| {
                let forest = Forest::seeded(0);
                let set = forest.set_from(black_box(&samples).iter().copied());
                (forest, set)
            });
        });
        group.bench_with_input(BenchmarkId::new("snapshot_put", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let forest = Forest::seeded(0);
            let set = forest.set_from(samples.iter().copied());
            b.iter_with_large_drop(|| {
                let mut copy = black_box(&set).clone();
                copy.emplace(black_box(0));
                copy
            });
        });
        group.bench_with_input(BenchmarkId::new("range", i), i, |b, &i| {
            let samples = random_keys(i as usize);
            let forest = Forest::seeded(0);
            let mut set = forest.set_from(samples.iter().copied());
            b.iter(|| black_box(&mut set).range(-(1 << 62), 1 << 62));
        });
    }
    group.finish();
}

criterion_group!(benches, std_benchmark, im_benchmark, treap_benchmark);

criterion_main!(benches);
