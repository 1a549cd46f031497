//! 路径求值基准：随机稀疏图上比较解释执行与编译执行

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use greql::query::{compile, evaluate, Environment};
use greql::schema::{EndSpec, SchemaBuilder};
use greql::{Graph, VertexId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn random_graph(vertices: u32, edges_per_vertex: u32, seed: u64) -> Graph {
    let mut b = SchemaBuilder::new("bench.Net");
    let node = b.vertex_class("bench.Node").add().unwrap();
    let link = b
        .edge_class("bench.Link")
        .from(EndSpec::new(node))
        .to(EndSpec::new(node))
        .add()
        .unwrap();
    b.edge_class("bench.Fast").superclass(link).add().unwrap();

    let mut g = Graph::new("bench", Arc::new(b.build().unwrap()));
    let link = g.class_named("Link").unwrap();
    let fast = g.class_named("Fast").unwrap();
    for _ in 0..vertices {
        g.add_vertex(node).unwrap();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..vertices * edges_per_vertex {
        let alpha = VertexId(rng.gen_range(1..=vertices));
        let omega = VertexId(rng.gen_range(1..=vertices));
        let class = if rng.gen_bool(0.2) { fast } else { link };
        g.add_edge(class, alpha, omega).unwrap();
    }
    g
}

const QUERIES: &[(&str, &str)] = &[
    ("star", "count(getVertex(1) -->*)"),
    ("alternative", "count(getVertex(1) (-->{Fast} | <--)+)"),
    ("exponent", "count(getVertex(1) (-->^2)^T)"),
    ("path_system", "depth(pathSystem(getVertex(1), (--> [<->{Fast}])*))"),
];

fn bench_path_queries(c: &mut Criterion) {
    for &size in &[100u32, 1_000] {
        let graph = random_graph(size, 3, 42);
        let mut group = c.benchmark_group(format!("path_eval/{}", size));
        for &(name, text) in QUERIES {
            group.bench_function(BenchmarkId::new("interpreted", name), |b| {
                b.iter(|| {
                    let mut env = Environment::new();
                    black_box(evaluate(text, Some(&graph), &mut env).unwrap())
                });
            });
            let unit = compile(text).unwrap();
            group.bench_function(BenchmarkId::new("compiled", name), |b| {
                b.iter(|| {
                    let mut env = Environment::new();
                    black_box(unit.execute(Some(&graph), &mut env).unwrap())
                });
            });
        }
        group.finish();
    }
}

criterion_group!(benches, bench_path_queries);
criterion_main!(benches);
