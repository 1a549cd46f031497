//! 路线图上的路径表达式场景，每个查询都在两种执行方式下求值

mod common;

use common::{both, error_kind, eval_bool, route_map};
use greql::error::ErrorKind;
use greql::{Value, VertexId};

fn vertices(ids: &[u32]) -> Value {
    Value::vertex_set(ids.iter().map(|&i| VertexId(i)))
}

#[test]
fn test_simple_path_direction() {
    let g = route_map();
    assert!(eval_bool("getVertex(19) --> getVertex(2)", &g));
    assert!(!eval_bool("getVertex(19) <-- getVertex(2)", &g));
    assert!(eval_bool("getVertex(2) <-- getVertex(19)", &g));
    assert!(eval_bool("getVertex(19) <-> getVertex(2)", &g));
    assert!(!eval_bool("getVertex(2) --> getVertex(19)", &g));
}

#[test]
fn test_exponent() {
    let g = route_map();
    assert!(eval_bool("getVertex(21) -->^2 getVertex(13)", &g));
    assert!(!eval_bool("getVertex(21) -->^1 getVertex(13)", &g));
    assert!(!eval_bool("getVertex(21) -->^3 getVertex(13)", &g));
}

#[test]
fn test_zero_exponent_fails() {
    let g = route_map();
    assert_eq!(
        error_kind("getVertex(21) -->^0 getVertex(21)", Some(&g)),
        ErrorKind::Greql
    );
    assert_eq!(error_kind("getVertex(21) (<->*)^0", Some(&g)), ErrorKind::Greql);
    // 起点不在视图中也会失败
    assert_eq!(
        error_kind(
            "on vertexSetSubgraph(set(getVertex(2))): isReachable(getVertex(1), getVertex(2), -->^0)",
            Some(&g)
        ),
        ErrorKind::Greql
    );
}

#[test]
fn test_alternative_of_exponents() {
    let g = route_map();
    assert!(eval_bool("getVertex(144) -->^4 | -->^2 getVertex(16)", &g));
    assert!(eval_bool("getVertex(144) -->^4 getVertex(16)", &g));
    assert!(eval_bool("getVertex(144) -->^2 getVertex(16)", &g));
    assert!(!eval_bool("getVertex(144) -->^3 getVertex(16)", &g));
}

#[test]
fn test_edge_type_restrictions() {
    let g = route_map();
    // Highway 是 Street 的子类
    assert!(eval_bool("getVertex(21) -->{Street}^2 getVertex(13)", &g));
    assert!(!eval_bool("getVertex(21) -->{Street!}^2 getVertex(13)", &g));
    assert!(!eval_bool("getVertex(21) -->{^Highway}^2 getVertex(13)", &g));
    assert!(eval_bool("getVertex(22) -->{Highway} getVertex(13)", &g));
    assert!(eval_bool(
        "import routemap.connections.*; getVertex(22) -->{routemap.connections.Highway} getVertex(13)",
        &g
    ));
}

#[test]
fn test_vertex_restrictions() {
    let g = route_map();
    assert_eq!(both("getVertex(19) --> &{Town}", Some(&g)).unwrap(), vertices(&[2]));
    assert_eq!(both("getVertex(21) --> &{Town}", Some(&g)).unwrap(), vertices(&[]));
    assert_eq!(both("getVertex(21) -->^2 &{Town}", Some(&g)).unwrap(), vertices(&[13]));
}

#[test]
fn test_forward_and_backward_sets() {
    let g = route_map();
    assert_eq!(both("getVertex(19) -->{Street}*", Some(&g)).unwrap(), vertices(&[2, 19]));
    assert_eq!(both("getVertex(19) -->{Street}+", Some(&g)).unwrap(), vertices(&[2]));
    // Town 2 包含 Crossroad 30
    assert_eq!(both("getVertex(19) -->+", Some(&g)).unwrap(), vertices(&[2, 30, 31, 32]));
    assert_eq!(both("getVertex(30) -->+", Some(&g)).unwrap(), vertices(&[30, 31, 32]));
    assert_eq!(
        both("-->+ getVertex(16)", Some(&g)).unwrap(),
        vertices(&[144, 145, 146, 147, 148])
    );
    assert_eq!(
        both("reachableVertices(getVertex(21), [-->] -->)", Some(&g)).unwrap(),
        vertices(&[13, 22])
    );
}

#[test]
fn test_aggregation_paths() {
    let g = route_map();
    assert_eq!(both("getVertex(1) <>--", Some(&g)).unwrap(), vertices(&[21, 22]));
    assert_eq!(both("getVertex(21) --<>", Some(&g)).unwrap(), vertices(&[1]));
    assert_eq!(both("getVertex(21) <>--", Some(&g)).unwrap(), vertices(&[]));
}

#[test]
fn test_transposition() {
    let g = route_map();
    assert!(eval_bool("getVertex(2) (-->)^T getVertex(19)", &g));
    assert!(eval_bool("getVertex(13) (--> -->{Highway})^T getVertex(21)", &g));
    assert!(!eval_bool("getVertex(21) (--> -->)^T getVertex(13)", &g));
}

#[test]
fn test_edge_paths() {
    let g = route_map();
    assert!(eval_bool("getVertex(21) --getEdge(2)-> getVertex(22)", &g));
    assert!(!eval_bool("getVertex(21) --getEdge(3)-> getVertex(22)", &g));
    assert!(eval_bool("getVertex(22) <-getEdge(2)-- getVertex(21)", &g));
    assert_eq!(
        error_kind("getVertex(21) --getVertex(22)-> getVertex(22)", Some(&g)),
        ErrorKind::Greql
    );
}

#[test]
fn test_path_system() {
    let g = route_map();
    let ps = "pathSystem(getVertex(144), -->*)";
    assert_eq!(
        both(&format!("leaves({})", ps), Some(&g)).unwrap(),
        vertices(&[16, 144, 145, 146, 147, 148])
    );
    assert_eq!(
        both(&format!("distance({}, getVertex(16))", ps), Some(&g)).unwrap(),
        Value::Int(2)
    );
    assert_eq!(both(&format!("depth({})", ps), Some(&g)).unwrap(), Value::Int(3));
    assert_eq!(
        both(&format!("pathLength(extractPath({}, getVertex(16)))", ps), Some(&g)).unwrap(),
        Value::Int(2)
    );
    assert_eq!(
        both(&format!("nodeTrace(extractPath({}, getVertex(16)))", ps), Some(&g)).unwrap(),
        Value::List(vec![
            Value::Vertex(VertexId(144)),
            Value::Vertex(VertexId(148)),
            Value::Vertex(VertexId(16)),
        ])
    );
    assert_eq!(
        both("distance(pathSystem(getVertex(144), -->^4), getVertex(16))", Some(&g)).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn test_subgraph_views() {
    let g = route_map();
    let sub = "vertexSetSubgraph(set(getVertex(30), getVertex(31)))";
    assert_eq!(both(&format!("on {}: count(E)", sub), Some(&g)).unwrap(), Value::Int(1));
    assert_eq!(
        both(&format!("on {}: getVertex(30) -->+", sub), Some(&g)).unwrap(),
        vertices(&[31])
    );
    assert_eq!(
        both("on vertexTypeSubgraph{Town}: count(E)", Some(&g)).unwrap(),
        Value::Int(1)
    );
    assert_eq!(
        both("on edgeTypeSubgraph{Highway}: count(V)", Some(&g)).unwrap(),
        Value::Int(2)
    );
}

#[test]
fn test_queries_over_the_map() {
    let g = route_map();
    assert_eq!(
        both(
            "from v : V{Town} with count(v -->{Street}) > 0 report v.name end",
            Some(&g)
        )
        .unwrap(),
        Value::List(vec![Value::Str("Town19".into())])
    );
    assert!(eval_bool("forall c : V{Crossroad} @ count(c --<>) <= 1", &g));
    assert!(eval_bool("exists! v : V{Town} @ v --> getVertex(2)", &g));
    assert_eq!(both("count(V{Location})", Some(&g)).unwrap(), Value::Int(150));
    assert_eq!(
        both("import routemap.localities.*; count(V{Town})", Some(&g)).unwrap(),
        Value::Int(20)
    );
    assert_eq!(both("count(E{Street})", Some(&g)).unwrap(), Value::Int(11));
    assert_eq!(both("count(E{Street, Highway})", Some(&g)).unwrap(), Value::Int(12));
    assert_eq!(both("count(E{^Street})", Some(&g)).unwrap(), Value::Int(4));
}

#[test]
fn test_variable_followed_by_grouped_path() {
    let g = route_map();
    assert!(eval_bool("let w := getVertex(19) in w (-->) getVertex(2)", &g));
    assert!(eval_bool(
        "let w := getVertex(144) in w (-->{Street})+ getVertex(16)",
        &g
    ));
    assert!(eval_bool(
        "exists w : getVertex(144) --> @ w (-->)* getVertex(16)",
        &g
    ));
    assert_eq!(
        both("let w := getVertex(30) in w (-->)*", Some(&g)).unwrap(),
        vertices(&[30, 31, 32])
    );
    assert_eq!(
        both("from x : V{Town} with x ((-->{Street})) getVertex(2) report x end", Some(&g)).unwrap(),
        Value::List(vec![Value::Vertex(VertexId(19))])
    );
}

#[test]
fn test_oversized_requests_fail_cleanly() {
    let g = route_map();
    assert_eq!(
        error_kind("getVertex(21) -->^50000000 getVertex(13)", Some(&g)),
        ErrorKind::Parse
    );
    assert_eq!(
        error_kind("pathSystem(getVertex(21), (-->^1000)^1000)", Some(&g)),
        ErrorKind::Parse
    );
    assert_eq!(error_kind("count(list(1..10000000000000))", None), ErrorKind::Greql);
    assert_eq!(both("count(list(1..1000))", None).unwrap(), Value::Int(1000));
}

#[test]
fn test_error_kinds() {
    let g = route_map();
    assert_eq!(error_kind("V{Village}", Some(&g)), ErrorKind::UnknownType);
    assert_eq!(error_kind("import nowhere.*; 1", Some(&g)), ErrorKind::UnknownType);
    assert_eq!(error_kind("x -->", Some(&g)), ErrorKind::UndefinedVariable);
    assert_eq!(error_kind("getVertex(1) -->{Town}", Some(&g)), ErrorKind::UnknownType);
    assert_eq!(error_kind("getVertex(1) -->", None), ErrorKind::Greql);
    assert_eq!(error_kind("1 -->", Some(&g)), ErrorKind::Greql);
}
