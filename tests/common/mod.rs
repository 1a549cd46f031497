//! 集成测试共用的路线图
//!
//! 顶点 1..=20 是 Town，21..=150 是 Crossroad。街道：
//! - 19 → 2
//! - 21 → 22 → 13（第二段是 Highway）
//! - 144 → 145 → 146 → 147 → 16 与 144 → 148 → 16
//! - 环路 30 → 31 → 32 → 30
//!
//! Town 1 包含 Crossroad 21、22，Town 2 包含 Crossroad 30。

#![allow(dead_code)]

use greql::error::ErrorKind;
use greql::query::{self, Environment};
use greql::schema::{AggregationKind, Domain, EndSpec, SchemaBuilder};
use greql::{Graph, Result, Value, VertexId};
use proptest::prelude::*;
use std::sync::Arc;

pub const VERTICES: u32 = 150;

pub const STREETS: &[(u32, u32)] = &[
    (19, 2),
    (21, 22),
    (144, 145),
    (145, 146),
    (146, 147),
    (147, 16),
    (144, 148),
    (148, 16),
    (30, 31),
    (31, 32),
    (32, 30),
];

pub const HIGHWAYS: &[(u32, u32)] = &[(22, 13)];

pub const CONTAINS: &[(u32, u32)] = &[(1, 21), (1, 22), (2, 30)];

pub fn route_schema() -> SchemaBuilder {
    let mut b = SchemaBuilder::new("routemap.RouteMap");
    let location = b
        .vertex_class("routemap.Location")
        .abstract_class()
        .attribute("name", Domain::String)
        .add()
        .unwrap();
    let town = b
        .vertex_class("routemap.localities.Town")
        .superclass(location)
        .attribute("inhabitants", Domain::Integer)
        .add()
        .unwrap();
    let crossroad = b
        .vertex_class("routemap.junctions.Crossroad")
        .superclass(location)
        .add()
        .unwrap();
    let street = b
        .edge_class("routemap.connections.Street")
        .from(EndSpec::new(location))
        .to(EndSpec::new(location))
        .attribute("length", Domain::Integer)
        .add()
        .unwrap();
    b.edge_class("routemap.connections.Highway")
        .superclass(street)
        .add()
        .unwrap();
    b.edge_class("routemap.ContainsCrossroad")
        .from(
            EndSpec::new(town)
                .multiplicity(0, Some(1))
                .aggregation(AggregationKind::Composite)
                .role("town"),
        )
        .to(EndSpec::new(crossroad).role("crossroad"))
        .add()
        .unwrap();
    b
}

pub fn route_map() -> Graph {
    let schema = Arc::new(route_schema().build().unwrap());
    let mut g = Graph::new("routes", schema);
    let town = g.class_named("Town").unwrap();
    let crossroad = g.class_named("Crossroad").unwrap();
    for i in 1..=VERTICES {
        let class = if i <= 20 { town } else { crossroad };
        let v = g.add_vertex(class).unwrap();
        assert_eq!(v, VertexId(i));
        let name = if i <= 20 {
            format!("Town{}", i)
        } else {
            format!("X{}", i)
        };
        g.set_vertex_attribute(v, "name", Value::Str(name)).unwrap();
        if i <= 20 {
            g.set_vertex_attribute(v, "inhabitants", Value::Int(i as i64 * 1000))
                .unwrap();
        }
    }
    add_edges(&mut g, "Street", STREETS);
    add_edges(&mut g, "Highway", HIGHWAYS);
    add_edges(&mut g, "ContainsCrossroad", CONTAINS);
    g
}

fn add_edges(g: &mut Graph, class: &str, pairs: &[(u32, u32)]) {
    let class = g.class_named(class).unwrap();
    for (n, &(a, b)) in pairs.iter().enumerate() {
        let e = g.add_edge(class, VertexId(a), VertexId(b)).unwrap();
        if g.schema().attribute(class, "length").is_some() {
            g.set_edge_attribute(e, "length", Value::Int(n as i64 + 1)).unwrap();
        }
    }
}

/// 分别用两种方式求值；两者必须给出相同的值或相同类别的错误
pub fn both(text: &str, graph: Option<&Graph>) -> Result<Value> {
    let mut env = Environment::new();
    both_in(text, graph, &mut env)
}

pub fn both_in(text: &str, graph: Option<&Graph>, env: &mut Environment) -> Result<Value> {
    let mut compiled_env = env.clone();
    let interpreted = query::evaluate(text, graph, env);
    let compiled = query::compile(text).and_then(|unit| unit.execute(graph, &mut compiled_env));
    match (&interpreted, &compiled) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "modes disagree on {}", text),
        (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind(), "error kinds differ on {}", text),
        _ => panic!(
            "modes disagree on {}: {:?} vs {:?}",
            text, interpreted, compiled
        ),
    }
    assert_eq!(*env, compiled_env, "environments differ after {}", text);
    interpreted
}

pub fn eval_bool(text: &str, graph: &Graph) -> bool {
    match both(text, Some(graph)) {
        Ok(Value::Bool(b)) => b,
        other => panic!("{} gave {:?}", text, other),
    }
}

pub fn error_kind(text: &str, graph: Option<&Graph>) -> ErrorKind {
    match both(text, graph) {
        Err(e) => e.kind(),
        Ok(v) => panic!("{} unexpectedly gave {}", text, v),
    }
}

// ============================================================================
// 随机图
// ============================================================================

/// 随机图的描述：顶点类（0 = A，1 = B ⊂ A，2 = C）与边（起点, 终点, 类）
#[derive(Debug, Clone)]
pub struct GraphSpec {
    pub classes: Vec<u8>,
    pub edges: Vec<(usize, usize, u8)>,
}

pub fn random_schema() -> SchemaBuilder {
    let mut b = SchemaBuilder::new("net.Net");
    let a = b.vertex_class("net.A").attribute("w", Domain::Integer).add().unwrap();
    b.vertex_class("net.B").superclass(a).add().unwrap();
    let c = b.vertex_class("net.C").add().unwrap();
    let root = b.vertex_root();
    let link = b
        .edge_class("net.Link")
        .from(EndSpec::new(root))
        .to(EndSpec::new(root))
        .add()
        .unwrap();
    b.edge_class("net.Fast").superclass(link).add().unwrap();
    b.edge_class("net.Part")
        .from(EndSpec::new(c).aggregation(AggregationKind::Composite).role("whole"))
        .to(EndSpec::new(a).role("part"))
        .add()
        .unwrap();
    b
}

impl GraphSpec {
    pub fn build(&self) -> Graph {
        let schema = Arc::new(random_schema().build().unwrap());
        let mut g = Graph::new("random", schema);
        let classes = [
            g.class_named("A").unwrap(),
            g.class_named("B").unwrap(),
            g.class_named("C").unwrap(),
        ];
        let edge_classes = [
            g.class_named("Link").unwrap(),
            g.class_named("Fast").unwrap(),
            g.class_named("Part").unwrap(),
        ];
        for (i, &c) in self.classes.iter().enumerate() {
            let v = g.add_vertex(classes[c as usize % 3]).unwrap();
            if c % 3 != 2 {
                g.set_vertex_attribute(v, "w", Value::Int(i as i64)).unwrap();
            }
        }
        let n = self.classes.len();
        for &(a, b, c) in &self.edges {
            let (a, b) = (a % n, b % n);
            let mut class = c as usize % 3;
            // Part 只能从 C 指向 A/B
            if class == 2 && !(self.classes[a] % 3 == 2 && self.classes[b] % 3 != 2) {
                class = 0;
            }
            g.add_edge(
                edge_classes[class],
                VertexId(a as u32 + 1),
                VertexId(b as u32 + 1),
            )
            .unwrap();
        }
        g
    }
}

pub fn arb_graph() -> impl Strategy<Value = GraphSpec> {
    (1usize..8).prop_flat_map(|n| {
        (
            prop::collection::vec(0u8..3, n),
            prop::collection::vec((0..n, 0..n, 0u8..3), 0..14),
        )
            .prop_map(|(classes, edges)| GraphSpec { classes, edges })
    })
}

/// 随机路径描述（文本形式）
pub fn arb_path() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("-->".to_string()),
        Just("<--".to_string()),
        Just("<->".to_string()),
        Just("-->{Link}".to_string()),
        Just("-->{Link!}".to_string()),
        Just("<--{Fast}".to_string()),
        Just("<->{^Fast}".to_string()),
        Just("<>--".to_string()),
        Just("--<>".to_string()),
        Just("-->{part}".to_string()),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} | {})", a, b)),
            inner.clone().prop_map(|a| format!("[{}]", a)),
            inner.clone().prop_map(|a| format!("({})*", a)),
            inner.clone().prop_map(|a| format!("({})+", a)),
            (inner.clone(), 1u8..4).prop_map(|(a, n)| format!("({})^{}", a, n)),
            inner.clone().prop_map(|a| format!("({})^T", a)),
            inner.clone().prop_map(|a| format!("(&{{B}} {})", a)),
            inner.prop_map(|a| format!("({} &{{^C}})", a)),
        ]
    })
}
