// Accumulator benchmarks for the VeriPay protocol.
//
// The root is recomputed from every leaf on each append, so cost grows
// linearly with the leaf count. These benches track that curve.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use veripay_protocol::crypto::{DigestBackend, FieldElement, SharedBackend};
use veripay_protocol::identity::{compute_root, UniquenessAccumulator};
use veripay_protocol::storage::MemoryStore;

fn leaves(n: u64) -> Vec<FieldElement> {
    (1..=n).map(FieldElement::from_u64).collect()
}

fn bench_compute_root(c: &mut Criterion) {
    let backend = DigestBackend;
    let mut group = c.benchmark_group("accumulator/compute_root");
    for size in [16u64, 256, 4096] {
        let items = leaves(size);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| compute_root(&backend, items));
        });
    }
    group.finish();
}

fn bench_append(c: &mut Criterion) {
    let backend: SharedBackend = Arc::new(DigestBackend);
    let mut group = c.benchmark_group("accumulator/append_onto");
    for size in [16u64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let mut acc =
                        UniquenessAccumulator::load(backend.clone(), Arc::new(MemoryStore::new()))
                            .unwrap();
                    for leaf in leaves(size) {
                        acc.append(leaf).unwrap();
                    }
                    acc
                },
                |mut acc| acc.append(FieldElement::from_u64(size + 1)).unwrap(),
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compute_root, bench_append);
criterion_main!(benches);
