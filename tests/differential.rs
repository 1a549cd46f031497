//! 解释执行与编译执行的差分测试
//!
//! 随机生成图和查询，两种方式必须给出相同的值或相同类别的错误
//! （比较在 `common::both` 中完成）。

mod common;

use common::{arb_graph, arb_path, both, both_in, route_map};
use greql::error::ErrorKind;
use greql::query::Environment;
use greql::Value;
use proptest::prelude::*;

/// 随机起点/终点：超出范围的 id 得到 null
fn arb_vertex() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (1u32..8).prop_map(|i| format!("getVertex({})", i)),
        1 => Just("getVertex(99)".to_string()),
        1 => Just("first(V{A})".to_string()),
    ]
}

fn arb_path_query() -> impl Strategy<Value = String> {
    (arb_vertex(), arb_path(), arb_vertex(), 0u8..9).prop_map(|(v, p, w, shape)| match shape {
        0 => format!("{} {} {}", v, p, w),
        1 => format!("{} {}", v, p),
        2 => format!("{} {}", p, w),
        3 => format!("pathSystem({}, {})", v, p),
        4 => format!("leaves(pathSystem({}, {}))", v, p),
        5 => format!("on vertexSetSubgraph({} <->*): {} {}", v, w, p),
        6 => format!("from x : V{{A}} with x {} {} report x, x.w end", p, w),
        7 => format!("exists x : V @ x {} x", p),
        _ => format!("let s := {} {} in tup(count(s), isEmpty(s))", v, p),
    })
}

/// 不涉及路径的表达式，覆盖短路、类型错误和作用域
fn arb_expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (-3i64..6).prop_map(|i| i.to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("null".to_string()),
        Just("x".to_string()),
        Just("y".to_string()),
        Just("\"ab\"".to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} + {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} * {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} / {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} < {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} = {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} and {})", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({} or {})", a, b)),
            inner.clone().prop_map(|a| format!("(not {})", a)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("({} ? {} : {})", c, a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("(let y := {} in {})", a, b)),
            inner.clone().prop_map(|a| format!("(forall y : list(1..3) @ {})", a)),
            inner.clone().prop_map(|a| format!("(exists! y : set(1, 2) @ {})", a)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("count(list({}, {}))", a, b)),
            inner.prop_map(|a| format!("from y : list(0..2) report {} end", a)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn path_queries_agree(spec in arb_graph(), query in arb_path_query()) {
        let graph = spec.build();
        if let Err(e) = both(&query, Some(&graph)) {
            prop_assert_ne!(e.kind(), ErrorKind::Parse, "{} did not parse: {}", query, e);
        }
    }

    #[test]
    fn expressions_agree(query in arb_expression(), bind_x in any::<bool>()) {
        let mut env = Environment::new();
        if bind_x {
            env.set("x", Value::Int(2));
        }
        let text = if bind_x { format!("using x: {}", query) } else { query };
        let _ = both_in(&text, None, &mut env);
    }

    #[test]
    fn stored_results_agree(query in arb_expression()) {
        let mut env = Environment::new();
        env.set("x", Value::Bool(true));
        let _ = both_in(&format!("using x: {} store as out", query), None, &mut env);
    }
}

#[test]
fn test_route_map_scenarios_agree() {
    let g = route_map();
    let queries = [
        "getVertex(19) --> getVertex(2)",
        "getVertex(21) -->^0 getVertex(21)",
        "pathSystem(getVertex(144), (-->^4 | -->^2) &{Town})",
        "from v : V{Crossroad} with v --<> getVertex(1) reportSet v end",
        "on vertexTypeSubgraph{Crossroad}: getVertex(30) -->*",
        "from t : V{Town}, c : t <>-- reportMap t.name -> c end",
        "extractPath(pathSystem(getVertex(30), -->+))",
    ];
    for q in queries {
        let _ = both(q, Some(&g));
    }
}
