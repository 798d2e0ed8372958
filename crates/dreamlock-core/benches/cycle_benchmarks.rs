use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dreamlock_core::{resolve_cycles, DependencyGraph, ReconcileInput, Reconciler};
use dreamlock_runtime::MockBackend;
use dreamlock_schema::{NodeKey, RawLock};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

fn node(i: usize) -> NodeKey {
    NodeKey::new(format!("pkg-{i:05}"), "1.0.0")
}

/// `n` nodes in one ring, plus a chord every 10 nodes.
fn ring_graph(n: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        graph.add_edge(node(i), node((i + 1) % n));
        if i % 10 == 0 {
            graph.add_edge(node(i), node((i + n / 2) % n));
        }
    }
    graph
}

fn ring_raw_lock(n: usize) -> RawLock {
    let mut deps = Map::new();
    let mut sources = Map::new();
    for i in 0..n {
        let next = node((i + 1) % n);
        let name = node(i).name.to_string();
        deps.insert(name.clone(), json!({ "1.0.0": [[next.name.as_str(), "1.0.0"]] }));
        sources.insert(
            name.clone(),
            json!({ "1.0.0": { "type": "http", "url": format!("https://example.invalid/{name}.tgz"), "hash": "sha256-x" } }),
        );
    }
    RawLock::from_value(json!({
        "_generic": { "mainPackageName": node(0).name.as_str(), "mainPackageVersion": "1.0.0" },
        "sources": Value::Object(sources),
        "dependencies": Value::Object(deps),
    }))
    .unwrap()
}

fn bench_resolve_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_cycles_ring");
    for n in [100usize, 1_000, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_with_setup(
                || ring_graph(n),
                |mut graph| {
                    let report = resolve_cycles(&mut graph);
                    assert!(!report.is_empty());
                },
            );
        });
    }
    group.finish();
}

fn bench_resolve_acyclic(c: &mut Criterion) {
    c.bench_function("resolve_cycles_chain_5000", |b| {
        b.iter_with_setup(
            || {
                let mut graph = DependencyGraph::new();
                for i in 0..4_999 {
                    graph.add_edge(node(i), node(i + 1));
                }
                graph
            },
            |mut graph| {
                assert!(resolve_cycles(&mut graph).is_empty());
            },
        );
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let oracle = MockBackend::new();
    c.bench_function("reconcile_ring_1000_combined", |b| {
        b.iter_with_setup(
            || (tempfile::tempdir().unwrap(), ring_raw_lock(1_000)),
            |(dir, raw)| {
                Reconciler::new(&oracle, dir.path())
                    .reconcile(ReconcileInput {
                        raw,
                        main_source: None,
                        translator: "mock.pure.raw".to_owned(),
                        extra_args: BTreeMap::new(),
                        combined: true,
                    })
                    .unwrap();
            },
        );
    });
}

criterion_group!(
    benches,
    bench_resolve_ring,
    bench_resolve_acyclic,
    bench_reconcile
);
criterion_main!(benches);
