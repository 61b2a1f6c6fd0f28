//! SDK performance benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qc_sdk::{GraphDb, Quad, Value};

fn person(i: usize) -> Quad<Value> {
    Quad::new(
        Value::iri(format!("http://example.org/person{i}")).unwrap(),
        Value::iri("http://xmlns.com/foaf/0.1/name").unwrap(),
        Value::string(format!("Person {i}")),
        None,
    )
}

fn benchmark_insert_single(c: &mut Criterion) {
    c.bench_function("sdk_insert_single", |b| {
        b.iter(|| {
            let db = GraphDb::in_memory();
            db.insert(person(0)).expect("insert should succeed");
            black_box(db);
        });
    });
}

fn benchmark_insert_batch(c: &mut Criterion) {
    c.bench_function("sdk_insert_100", |b| {
        b.iter(|| {
            let db = GraphDb::in_memory();
            db.insert_all((0..100).map(person)).expect("insert should succeed");
            black_box(db);
        });
    });
}

fn benchmark_remove_node(c: &mut Criterion) {
    c.bench_function("sdk_remove_node", |b| {
        b.iter(|| {
            let db = GraphDb::in_memory();
            db.insert_all((0..100).map(person)).expect("insert should succeed");
            db.remove_node(&Value::iri("http://example.org/person0").unwrap()).expect("remove should succeed");
            black_box(db);
        });
    });
}

criterion_group!(benches, benchmark_insert_single, benchmark_insert_batch, benchmark_remove_node);
criterion_main!(benches);
