//! Build and encode throughput on cyclic documents.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relink_core::codec::{encode, Document};
use relink_core::graph::{apply_defaults, Node};
use relink_core::build_generic;
use serde_json::json;

/// A product with `coverages` coverages, each pointing back at the product
/// and owning one deductible that points back at the coverage.
fn cyclic_document(coverages: usize) -> Document {
    let mut included = Vec::with_capacity(coverages * 2);
    let mut references = Vec::with_capacity(coverages);
    for i in 0..coverages {
        references.push(json!({"type": "coverage", "id": format!("c{i}")}));
        included.push(json!({
            "type": "coverage",
            "id": format!("c{i}"),
            "attributes": {"base_premium": i * 100},
            "relationships": {
                "product": {"data": {"type": "product", "id": "p1"}},
                "deductibles": {"data": [{"type": "deductible", "id": format!("d{i}")}]}
            }
        }));
        included.push(json!({
            "type": "deductible",
            "id": format!("d{i}"),
            "attributes": {"amount": "500.00"},
            "relationships": {"coverage": {"data": {"type": "coverage", "id": format!("c{i}")}}}
        }));
    }

    Document::from_value(json!({
        "primary": {
            "type": "product",
            "id": "p1",
            "relationships": {"coverages": {"data": references}}
        },
        "included": included
    }))
    .unwrap()
}

fn release(root: &Node) {
    for node in relink_core::graph::walk(root).collect::<Vec<_>>() {
        node.clear_relationships();
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in [10, 100, 1000] {
        let document = cyclic_document(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, document| {
            b.iter(|| {
                let root = build_generic(black_box(document)).unwrap().into_one().unwrap();
                release(&root);
            })
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for size in [10, 100, 1000] {
        let root = build_generic(&cyclic_document(size)).unwrap().into_one().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &root, |b, root| {
            b.iter(|| encode(black_box(root)).unwrap())
        });
        release(&root);
    }
    group.finish();
}

fn bench_defaults(c: &mut Criterion) {
    let root = build_generic(&cyclic_document(1000)).unwrap().into_one().unwrap();
    c.bench_function("apply_defaults/1000", |b| b.iter(|| apply_defaults(black_box(&root))));
    release(&root);
}

criterion_group!(benches, bench_build, bench_encode, bench_defaults);
criterion_main!(benches);
