//! Benchmarks for path resolution and document compilation.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quarry_mapping::{MappedClass, MappedField, Mapper};
use quarry_query::{FilterOperator, Query, path};

fn mapper() -> Arc<Mapper> {
    let mapper = Mapper::new();
    mapper
        .add_class(
            MappedClass::new("Address")
                .field(MappedField::new("city").stored_as("c"))
                .field(MappedField::new("zip").stored_as("z")),
        )
        .unwrap();
    mapper
        .add_class(
            MappedClass::new("Person")
                .collection("people")
                .field(MappedField::new("id").id())
                .field(MappedField::new("name"))
                .field(MappedField::new("age").stored_as("a"))
                .field(MappedField::new("tags").collection())
                .field(MappedField::new("addresses").collection().embedded("Address")),
        )
        .unwrap();
    Arc::new(mapper)
}

// ============================================================================
// Path Resolution Benchmarks
// ============================================================================

fn bench_path_resolution(c: &mut Criterion) {
    let mapper = mapper();
    let class = mapper.class("Person").unwrap();
    let mut group = c.benchmark_group("path_resolution");

    for path_str in ["name", "age", "addresses.0.zip", "addresses.$.city"] {
        group.bench_with_input(BenchmarkId::from_parameter(path_str), path_str, |b, p| {
            b.iter(|| black_box(path::resolve(&mapper, &class, p, true).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// Operator Lookup Benchmarks
// ============================================================================

fn bench_operator_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_lookup");

    for token in ["=", ">=", "in", "geoWithin"] {
        group.bench_with_input(BenchmarkId::from_parameter(token), token, |b, t| {
            b.iter(|| black_box(FilterOperator::from_token(t).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// Query Compilation Benchmarks
// ============================================================================

fn bench_query_compilation(c: &mut Criterion) {
    let mapper = mapper();
    let class = mapper.class("Person").unwrap();
    let mut group = c.benchmark_group("query_compilation");

    group.bench_function("build_simple", |b| {
        b.iter(|| {
            let mut query: Query<(), ()> =
                Query::new(Arc::clone(&mapper), Arc::clone(&class), "people", ());
            query.filter("age >", 21).unwrap().filter("name", "Bob").unwrap();
            black_box(query.get_query_document())
        })
    });

    let mut query: Query<(), ()> =
        Query::new(Arc::clone(&mapper), Arc::clone(&class), "people", ());
    query
        .filter("age >=", 18)
        .unwrap()
        .filter("age <", 65)
        .unwrap()
        .filter("tags in", vec!["a", "b", "c"])
        .unwrap()
        .filter("addresses.0.zip", "0150")
        .unwrap();
    let young = query.criteria("age").less_than(18).unwrap();
    let old = query.criteria("age").greater_than(65).unwrap();
    query.or([young, old]);

    group.bench_function("compile_nested", |b| {
        b.iter(|| black_box(query.get_query_document()))
    });

    group.bench_function("clone_query", |b| b.iter(|| black_box(query.clone_query())));

    group.finish();
}

criterion_group!(
    benches,
    bench_path_resolution,
    bench_operator_lookup,
    bench_query_compilation,
);
criterion_main!(benches);
