//! `using` / `store as` 与调用方持有的环境

mod common;

use common::{both_in, route_map};
use greql::error::Error;
use greql::query::{compile, evaluate, Environment, QueryEngine};
use greql::{EngineConfig, ExecutionMode, Value, VertexId};

#[test]
fn test_stored_values_feed_later_queries() {
    let g = route_map();
    let mut env = Environment::new();
    both_in("getVertex(144) -->+ store as downstream", Some(&g), &mut env).unwrap();
    assert_eq!(
        env.get("downstream").and_then(|v| v.elements()).map(|it| it.count()),
        Some(5)
    );
    assert_eq!(
        both_in("using downstream: count(downstream)", Some(&g), &mut env).unwrap(),
        Value::Int(5)
    );
    assert_eq!(
        both_in(
            "using downstream: from v : downstream with v -->^1 getVertex(16) reportSet v end",
            Some(&g),
            &mut env
        )
        .unwrap(),
        Value::vertex_set([VertexId(147), VertexId(148)])
    );
}

#[test]
fn test_env_vertex_as_path_start() {
    let g = route_map();
    let mut env = Environment::new();
    env.set("home", Value::Vertex(VertexId(21)));
    assert_eq!(
        both_in("using home: home -->^2 getVertex(13)", Some(&g), &mut env).unwrap(),
        Value::Bool(true)
    );
    // 未声明 using 时同样能读取环境
    assert_eq!(
        both_in("home --> getVertex(22)", Some(&g), &mut env).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_using_requires_binding() {
    let mut env = Environment::new();
    assert_eq!(
        evaluate("using missing: 1", None, &mut env).unwrap_err(),
        Error::UndefinedVariable("missing".into())
    );
    let unit = compile("using missing: 1").unwrap();
    assert_eq!(
        unit.execute(None, &mut env).unwrap_err(),
        Error::UndefinedVariable("missing".into())
    );
}

#[test]
fn test_failed_query_stores_nothing() {
    let mut env = Environment::new();
    assert!(evaluate("1 / 0 store as broken", None, &mut env).is_err());
    assert!(!env.contains("broken"));
    let unit = compile("1 / 0 store as broken").unwrap();
    assert!(unit.execute(None, &mut env).is_err());
    assert!(!env.contains("broken"));
}

#[test]
fn test_unit_runs_against_different_graphs_and_envs() {
    let g = route_map();
    let unit = compile("using n: count(getVertex(n) -->*) store as reach").unwrap();

    let mut first = Environment::new();
    first.set("n", Value::Int(21));
    assert_eq!(unit.execute(Some(&g), &mut first).unwrap(), Value::Int(3));

    let mut second = Environment::new();
    second.set("n", Value::Int(30));
    assert_eq!(unit.execute(Some(&g), &mut second).unwrap(), Value::Int(3));
    assert_eq!(second.get("reach"), Some(&Value::Int(3)));

    let mut third = Environment::new();
    third.set("n", Value::Int(1));
    assert_eq!(unit.execute(Some(&g), &mut third).unwrap(), Value::Int(4));
}

#[test]
fn test_engine_timeout_aborts() {
    let g = route_map();
    let mut env = Environment::new();
    let mut engine = QueryEngine::new(EngineConfig {
        timeout_ms: Some(0),
        ..EngineConfig::default()
    });
    for mode in [ExecutionMode::Interpreted, ExecutionMode::Compiled] {
        engine.set_mode(mode);
        assert_eq!(
            engine
                .evaluate("count(from v : V, w : V with v -->* w report v end)", Some(&g), &mut env)
                .unwrap_err(),
            Error::Aborted
        );
    }
}
