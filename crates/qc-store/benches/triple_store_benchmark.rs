//! Throughput benchmarks for the in-memory reference store: batched
//! `apply_deltas` insert and direction-indexed scan lookup.
//!
//! Run with: cargo bench --bench triple_store_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qc_iter::{Cursor, Shape};
use qc_model::{Direction, Quad, Value};
use qc_store::{CancellationToken, Delta, IgnoreOpts, MemoryReferenceStore, Options, Store};

fn quad(i: usize) -> Quad<Value> {
    Quad::new(
        Value::iri(format!("http://example.org/subject{i}")).unwrap(),
        Value::iri("http://example.org/predicate").unwrap(),
        Value::iri(format!("http://example.org/object{i}")).unwrap(),
        None,
    )
}

fn benchmark_apply_deltas(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_deltas");
    let cancel = CancellationToken::none();

    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = MemoryReferenceStore::new(&Options::new());
                let deltas: Vec<Delta> = (0..size).map(|i| Delta::add(quad(i))).collect();
                let report = store.apply_deltas(&deltas, IgnoreOpts::strict(), &cancel).unwrap();
                black_box(report)
            });
        });
    }

    group.finish();
}

fn benchmark_direction_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("direction_scan");
    let cancel = CancellationToken::none();

    let store = MemoryReferenceStore::new(&Options::new());
    let deltas: Vec<Delta> = (0..10_000).map(|i| Delta::add(quad(i))).collect();
    store.apply_deltas(&deltas, IgnoreOpts::strict(), &cancel).unwrap();

    group.bench_function("predicate_scan", |b| {
        b.iter(|| {
            let predicate = store.value_of(&Value::iri("http://example.org/predicate").unwrap());
            let shape = Shape::links_to(Shape::Fixed(vec![predicate]), Direction::Predicate);
            let mut cursor = Cursor::build(&store, &shape).unwrap();
            let mut count = 0;
            while cursor.next() {
                count += 1;
            }
            black_box(count)
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_apply_deltas, benchmark_direction_scan);
criterion_main!(benches);
