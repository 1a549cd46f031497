//! GReQL function library
//!
//! A fixed registry of built-in functions, looked up by name at call time
//! by the interpreter and at lowering time by the compiler. Arguments are
//! always evaluated before the call; an unknown name or a wrong number of
//! arguments is an evaluation error, never a parse error.

use crate::error::{Error, Result};
use crate::graph::{EdgeId, Graph, GraphView, VertexId};
use crate::query::operators::{compare, no_graph, values_equal};
use crate::schema::{ElementKind, Imports, TypeCollection, TypeExpression, TypeToken};
use crate::types::Value;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// What a built-in may see of the evaluation state.
#[derive(Clone, Copy)]
pub struct FunctionContext<'a> {
    pub graph: Option<&'a Graph>,
    pub view: Option<GraphView<'a>>,
    pub imports: &'a Imports,
}

impl<'a> FunctionContext<'a> {
    fn graph(&self) -> Result<&'a Graph> {
        self.graph.ok_or_else(no_graph)
    }

    fn view(&self) -> Result<GraphView<'a>> {
        self.view.ok_or_else(no_graph)
    }
}

type Builtin = fn(&[Value], &FunctionContext<'_>) -> Result<Value>;

pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    /// `null` in any argument yields `null` without calling the function
    pub null_safe: bool,
    pub description: &'static str,
    f: Builtin,
}

impl FunctionDef {
    pub fn invoke(&self, args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
        if args.len() < self.min_args || args.len() > self.max_args {
            return Err(Error::greql(format!(
                "{} expects {} argument(s), got {}",
                self.name,
                if self.min_args == self.max_args {
                    self.min_args.to_string()
                } else {
                    format!("{}..{}", self.min_args, self.max_args)
                },
                args.len()
            )));
        }
        if self.null_safe && args.iter().any(Value::is_undefined) {
            return Ok(Value::Undefined);
        }
        (self.f)(args, ctx)
    }
}

macro_rules! builtin {
    ($name:expr, $min:expr, $max:expr, $null_safe:expr, $desc:expr, $f:expr) => {
        FunctionDef {
            name: $name,
            min_args: $min,
            max_args: $max,
            null_safe: $null_safe,
            description: $desc,
            f: $f,
        }
    };
}

static FUNCTIONS: Lazy<HashMap<&'static str, FunctionDef>> = Lazy::new(|| {
    let defs = vec![
        // ==================== 图访问 ====================
        builtin!("getVertex", 1, 1, true, "vertex with the given id, or null", get_vertex),
        builtin!("getEdge", 1, 1, true, "edge with the given id, or null", get_edge),
        builtin!("id", 1, 1, true, "id of a vertex or edge", id),
        builtin!("alpha", 1, 1, true, "start vertex of an edge", alpha),
        builtin!("omega", 1, 1, true, "end vertex of an edge", omega),
        builtin!("degree", 1, 1, true, "number of incidences of a vertex", degree),
        builtin!("inDegree", 1, 1, true, "number of incoming edges", in_degree),
        builtin!("outDegree", 1, 1, true, "number of outgoing edges", out_degree),
        builtin!("edgesConnected", 1, 1, true, "incident edges in incidence order", edges_connected),
        builtin!("edgesFrom", 1, 1, true, "outgoing edges in incidence order", edges_from),
        builtin!("edgesTo", 1, 1, true, "incoming edges in incidence order", edges_to),
        builtin!("hasType", 2, 2, true, "whether an element's class is (a subclass of) a type", has_type),
        builtin!("typeName", 1, 1, true, "qualified class name of an element", type_name),
        // ==================== 集合 ====================
        builtin!("count", 1, 1, true, "number of elements", count),
        builtin!("isEmpty", 1, 1, true, "whether a collection has no elements", is_empty),
        builtin!("contains", 2, 2, false, "membership test", contains),
        builtin!("union", 2, 2, true, "set union", union),
        builtin!("intersection", 2, 2, true, "set intersection", intersection),
        builtin!("difference", 2, 2, true, "set difference", difference),
        builtin!("toSet", 1, 1, true, "collection as a set", to_set),
        builtin!("toList", 1, 1, true, "collection as a list", to_list),
        builtin!("sum", 1, 1, true, "sum of numbers", sum),
        builtin!("min", 1, 1, true, "smallest element", min),
        builtin!("max", 1, 1, true, "largest element", max),
        builtin!("avg", 1, 1, true, "average of numbers", avg),
        builtin!("concat", 2, 2, true, "concatenation of strings or lists", concat),
        builtin!("first", 1, 1, true, "first element", first),
        builtin!("last", 1, 1, true, "last element", last),
        builtin!("sort", 1, 1, true, "elements in ascending order", sort),
        builtin!("reverse", 1, 1, true, "elements in reverse order", reverse),
        // ==================== 标量 ====================
        builtin!("abs", 1, 1, true, "absolute value", abs),
        builtin!("toString", 1, 1, false, "textual form of a value", to_string),
        // ==================== 路径系统与路径 ====================
        builtin!("leaves", 1, 1, true, "leaves of a path system", leaves),
        builtin!("distance", 2, 2, true, "shortest accepted walk length to a leaf", distance),
        builtin!("depth", 1, 1, true, "largest leaf distance", depth),
        builtin!("extractPath", 1, 2, true, "path(s) from the root of a path system", extract_path),
        builtin!("pathLength", 1, 1, true, "number of edges of a path", path_length),
        builtin!("startVertex", 1, 1, true, "first vertex of a path", start_vertex),
        builtin!("endVertex", 1, 1, true, "last vertex of a path", end_vertex),
        builtin!("nodeTrace", 1, 1, true, "vertices of a path", node_trace),
        builtin!("edgeTrace", 1, 1, true, "edges of a path", edge_trace),
        // ==================== 子图 ====================
        builtin!("vertexSetSubgraph", 1, 1, true, "vertices plus edges between them", vertex_set_subgraph),
        builtin!("edgeSetSubgraph", 1, 1, true, "edges plus their end vertices", edge_set_subgraph),
    ];
    defs.into_iter().map(|d| (d.name, d)).collect()
});

pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    FUNCTIONS.get(name)
}

pub fn unknown_function(name: &str) -> Error {
    Error::greql(format!("unknown function '{}'", name))
}

/// Look up and invoke a function with evaluated arguments.
pub fn call(name: &str, args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    lookup(name)
        .ok_or_else(|| unknown_function(name))?
        .invoke(args, ctx)
}

/// All function names, sorted
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = FUNCTIONS.keys().copied().collect();
    names.sort_unstable();
    names
}

// ==================== 参数辅助 ====================

fn wrong(name: &str, value: &Value) -> Error {
    Error::greql(format!("{} not applicable to {}", name, value.type_name()))
}

fn int_arg(name: &str, value: &Value) -> Result<i64> {
    value.as_int().ok_or_else(|| wrong(name, value))
}

fn vertex_arg(name: &str, value: &Value) -> Result<VertexId> {
    value.as_vertex().ok_or_else(|| wrong(name, value))
}

fn edge_arg(name: &str, value: &Value) -> Result<EdgeId> {
    value.as_edge().ok_or_else(|| wrong(name, value))
}

fn items(name: &str, value: &Value) -> Result<Vec<Value>> {
    value
        .elements()
        .map(|it| it.cloned().collect())
        .ok_or_else(|| wrong(name, value))
}

fn path_system_arg<'v>(name: &str, value: &'v Value) -> Result<&'v crate::algorithm::PathSystem> {
    match value {
        Value::PathSystem(ps) => Ok(ps),
        other => Err(wrong(name, other)),
    }
}

fn path_arg<'v>(name: &str, value: &'v Value) -> Result<&'v crate::types::Path> {
    match value {
        Value::Path(p) => Ok(p),
        other => Err(wrong(name, other)),
    }
}

// ==================== 图访问 ====================

fn get_vertex(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let id = int_arg("getVertex", &args[0])?;
    let graph = ctx.graph()?;
    Ok(u32::try_from(id)
        .ok()
        .map(VertexId)
        .filter(|v| graph.contains_vertex(*v))
        .map_or(Value::Undefined, Value::Vertex))
}

fn get_edge(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let id = int_arg("getEdge", &args[0])?;
    let graph = ctx.graph()?;
    Ok(u32::try_from(id)
        .ok()
        .map(EdgeId)
        .filter(|e| graph.contains_edge(*e))
        .map_or(Value::Undefined, Value::Edge))
}

fn id(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    match &args[0] {
        Value::Vertex(v) => Ok(Value::Int(v.0 as i64)),
        Value::Edge(e) => Ok(Value::Int(e.0 as i64)),
        other => Err(wrong("id", other)),
    }
}

fn alpha(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let e = edge_arg("alpha", &args[0])?;
    Ok(ctx
        .graph()?
        .edge(e)
        .map_or(Value::Undefined, |edge| Value::Vertex(edge.alpha())))
}

fn omega(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let e = edge_arg("omega", &args[0])?;
    Ok(ctx
        .graph()?
        .edge(e)
        .map_or(Value::Undefined, |edge| Value::Vertex(edge.omega())))
}

/// Incident edges of `v` in the current view, filtered by orientation.
fn incident_edges(name: &str, args: &[Value], ctx: &FunctionContext<'_>, normal: Option<bool>) -> Result<Vec<EdgeId>> {
    let v = vertex_arg(name, &args[0])?;
    Ok(ctx
        .view()?
        .incidences(v)
        .filter(|inc| normal.map_or(true, |n| inc.is_normal() == n))
        .map(|inc| inc.edge())
        .collect())
}

fn degree(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Int(incident_edges("degree", args, ctx, None)?.len() as i64))
}

fn in_degree(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Int(incident_edges("inDegree", args, ctx, Some(false))?.len() as i64))
}

fn out_degree(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Int(incident_edges("outDegree", args, ctx, Some(true))?.len() as i64))
}

fn edges_connected(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let edges = incident_edges("edgesConnected", args, ctx, None)?;
    Ok(Value::List(edges.into_iter().map(Value::Edge).collect()))
}

fn edges_from(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let edges = incident_edges("edgesFrom", args, ctx, Some(true))?;
    Ok(Value::List(edges.into_iter().map(Value::Edge).collect()))
}

fn edges_to(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let edges = incident_edges("edgesTo", args, ctx, Some(false))?;
    Ok(Value::List(edges.into_iter().map(Value::Edge).collect()))
}

fn element_class(name: &str, value: &Value, graph: &Graph) -> Result<(crate::schema::ClassId, ElementKind)> {
    match value {
        Value::Vertex(v) => graph
            .vertex_class(*v)
            .map(|c| (c, ElementKind::Vertex))
            .ok_or(Error::VertexNotFound(v.0)),
        Value::Edge(e) => graph
            .edge_class(*e)
            .map(|c| (c, ElementKind::Edge))
            .ok_or(Error::EdgeNotFound(e.0)),
        other => Err(wrong(name, other)),
    }
}

fn has_type(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let graph = ctx.graph()?;
    let (class, kind) = element_class("hasType", &args[0], graph)?;
    let type_name = args[1].as_str().ok_or_else(|| wrong("hasType", &args[1]))?;
    let expression = TypeExpression::new(vec![TypeToken::new(type_name)]);
    let types = TypeCollection::resolve(&expression, graph.schema(), ctx.imports, kind)?;
    Ok(Value::Bool(types.accepts_class(graph.schema(), class)))
}

fn type_name(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let graph = ctx.graph()?;
    let (class, _) = element_class("typeName", &args[0], graph)?;
    Ok(Value::Str(graph.schema().class(class).qualified_name().to_string()))
}

// ==================== 集合 ====================

fn count(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let n = match &args[0] {
        Value::List(v) | Value::Tuple(v) => v.len(),
        Value::Set(s) => s.len(),
        Value::Map(m) => m.len(),
        Value::Record(r) => r.len(),
        Value::Str(s) => s.chars().count(),
        other => return Err(wrong("count", other)),
    };
    Ok(Value::Int(n as i64))
}

fn is_empty(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Bool(count(args, ctx)? == Value::Int(0)))
}

fn contains(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let found = match (&args[0], &args[1]) {
        (Value::Undefined, _) => return Ok(Value::Undefined),
        (Value::Set(s), x) => s.contains(x) || s.iter().any(|e| values_equal(e, x)),
        (Value::List(v) | Value::Tuple(v), x) => v.iter().any(|e| values_equal(e, x)),
        (Value::Map(m), x) => m.contains_key(x),
        (Value::Str(s), Value::Str(sub)) => s.contains(sub.as_str()),
        (Value::Subgraph(sg), Value::Vertex(v)) => sg.contains_vertex(*v),
        (Value::Subgraph(sg), Value::Edge(e)) => sg.contains_edge(*e),
        (Value::PathSystem(ps), Value::Vertex(v)) => ps.vertices().contains(v),
        (Value::Path(p), Value::Vertex(v)) => p.vertices().contains(v),
        (Value::Path(p), Value::Edge(e)) => p.edges().contains(e),
        (other, _) => return Err(wrong("contains", other)),
    };
    Ok(Value::Bool(found))
}

fn as_set(name: &str, value: &Value) -> Result<BTreeSet<Value>> {
    Ok(items(name, value)?.into_iter().collect())
}

fn union(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    if let (Value::Map(a), Value::Map(b)) = (&args[0], &args[1]) {
        let mut merged = a.clone();
        merged.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
        return Ok(Value::Map(merged));
    }
    let mut a = as_set("union", &args[0])?;
    a.extend(as_set("union", &args[1])?);
    Ok(Value::Set(a))
}

fn intersection(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let a = as_set("intersection", &args[0])?;
    let b = as_set("intersection", &args[1])?;
    Ok(Value::Set(a.intersection(&b).cloned().collect()))
}

fn difference(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let a = as_set("difference", &args[0])?;
    let b = as_set("difference", &args[1])?;
    Ok(Value::Set(a.difference(&b).cloned().collect()))
}

fn to_set(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Set(as_set("toSet", &args[0])?))
}

fn to_list(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::List(items("toList", &args[0])?))
}

fn sum(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let mut int_total: i64 = 0;
    let mut double_total: Option<f64> = None;
    for item in items("sum", &args[0])? {
        match item {
            Value::Int(i) if double_total.is_none() => {
                int_total = int_total
                    .checked_add(i)
                    .ok_or_else(|| Error::greql("integer overflow"))?;
            }
            Value::Int(_) | Value::Double(_) => {
                let base = double_total.unwrap_or(int_total as f64);
                double_total = Some(base + item.as_number().unwrap_or(0.0));
            }
            other => return Err(wrong("sum", &other)),
        }
    }
    Ok(double_total.map_or(Value::Int(int_total), Value::Double))
}

fn extreme(name: &str, value: &Value, wanted: Ordering) -> Result<Value> {
    let mut best: Option<Value> = None;
    for item in items(name, value)? {
        best = match best {
            None => Some(item),
            Some(current) => {
                if compare(&item, &current)? == wanted {
                    Some(item)
                } else {
                    Some(current)
                }
            }
        };
    }
    Ok(best.unwrap_or(Value::Undefined))
}

fn min(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    extreme("min", &args[0], Ordering::Less)
}

fn max(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    extreme("max", &args[0], Ordering::Greater)
}

fn avg(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let values = items("avg", &args[0])?;
    if values.is_empty() {
        return Ok(Value::Undefined);
    }
    let mut total = 0.0;
    for v in &values {
        total += v.as_number().ok_or_else(|| wrong("avg", v))?;
    }
    Ok(Value::Double(total / values.len() as f64))
}

fn concat(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => Ok(Value::List(a.iter().chain(b).cloned().collect())),
        (other, _) => Err(wrong("concat", other)),
    }
}

fn first(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(items("first", &args[0])?
        .into_iter()
        .next()
        .unwrap_or(Value::Undefined))
}

fn last(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(items("last", &args[0])?.pop().unwrap_or(Value::Undefined))
}

fn sort(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let mut values = items("sort", &args[0])?;
    values.sort();
    Ok(Value::List(values))
}

fn reverse(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        other => {
            let mut values = items("reverse", other)?;
            values.reverse();
            Ok(Value::List(values))
        }
    }
}

// ==================== 标量 ====================

fn abs(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    match &args[0] {
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| Error::greql("integer overflow")),
        Value::Double(d) => Ok(Value::Double(d.abs())),
        other => Err(wrong("abs", other)),
    }
}

fn to_string(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Str(args[0].to_string()))
}

// ==================== 路径系统与路径 ====================

fn leaves(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::vertex_set(path_system_arg("leaves", &args[0])?.leaves()))
}

fn distance(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let ps = path_system_arg("distance", &args[0])?;
    let v = vertex_arg("distance", &args[1])?;
    Ok(ps
        .distance(v)
        .map_or(Value::Undefined, |d| Value::Int(d as i64)))
}

fn depth(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Int(path_system_arg("depth", &args[0])?.depth() as i64))
}

fn extract_path(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let ps = path_system_arg("extractPath", &args[0])?;
    match args.get(1) {
        Some(target) => {
            let v = vertex_arg("extractPath", target)?;
            Ok(ps.extract_path(v).map_or(Value::Undefined, Value::Path))
        }
        None => Ok(Value::List(
            ps.extract_paths().into_iter().map(Value::Path).collect(),
        )),
    }
}

fn path_length(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Int(path_arg("pathLength", &args[0])?.length() as i64))
}

fn start_vertex(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Vertex(path_arg("startVertex", &args[0])?.start_vertex()))
}

fn end_vertex(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    Ok(Value::Vertex(path_arg("endVertex", &args[0])?.end_vertex()))
}

fn node_trace(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let p = path_arg("nodeTrace", &args[0])?;
    Ok(Value::List(p.vertices().into_iter().map(Value::Vertex).collect()))
}

fn edge_trace(args: &[Value], _: &FunctionContext<'_>) -> Result<Value> {
    let p = path_arg("edgeTrace", &args[0])?;
    Ok(Value::List(p.edges().into_iter().map(Value::Edge).collect()))
}

// ==================== 子图 ====================

fn vertex_set_subgraph(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let vertices = items("vertexSetSubgraph", &args[0])?
        .iter()
        .map(|v| vertex_arg("vertexSetSubgraph", v))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Subgraph(Arc::new(
        ctx.view()?.vertex_set_subgraph(vertices),
    )))
}

fn edge_set_subgraph(args: &[Value], ctx: &FunctionContext<'_>) -> Result<Value> {
    let edges = items("edgeSetSubgraph", &args[0])?
        .iter()
        .map(|e| edge_arg("edgeSetSubgraph", e))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Subgraph(Arc::new(ctx.view()?.edge_set_subgraph(edges))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(imports: &Imports) -> FunctionContext<'_> {
        FunctionContext {
            graph: None,
            view: None,
            imports,
        }
    }

    #[test]
    fn test_unknown_and_arity() {
        let imports = Imports::new();
        let c = ctx(&imports);
        assert!(matches!(call("noSuchFunction", &[], &c), Err(Error::GreqlError(_))));
        assert!(matches!(call("count", &[], &c), Err(Error::GreqlError(_))));
        assert!(lookup("getVertex").is_some());
        assert!(names().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_collection_functions() {
        let imports = Imports::new();
        let c = ctx(&imports);
        let list = Value::List(vec![Value::Int(3), Value::Int(1), Value::Double(2.5)]);
        assert_eq!(call("count", &[list.clone()], &c).unwrap(), Value::Int(3));
        assert_eq!(call("sum", &[list.clone()], &c).unwrap(), Value::Double(6.5));
        assert_eq!(call("min", &[list.clone()], &c).unwrap(), Value::Int(1));
        assert_eq!(call("max", &[list.clone()], &c).unwrap(), Value::Int(3));
        assert_eq!(
            call("contains", &[list.clone(), Value::Double(1.0)], &c).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call("first", &[Value::List(vec![])], &c).unwrap(), Value::Undefined);
        assert_eq!(call("count", &[Value::Undefined], &c).unwrap(), Value::Undefined);
        let a = Value::Set([Value::Int(1), Value::Int(2)].into_iter().collect());
        let b = Value::Set([Value::Int(2)].into_iter().collect());
        assert_eq!(
            call("difference", &[a, b], &c).unwrap(),
            Value::Set([Value::Int(1)].into_iter().collect())
        );
    }

    #[test]
    fn test_graph_functions_need_graph() {
        let imports = Imports::new();
        let c = ctx(&imports);
        assert!(matches!(
            call("getVertex", &[Value::Int(1)], &c),
            Err(Error::GreqlError(_))
        ));
        assert_eq!(call("getVertex", &[Value::Undefined], &c).unwrap(), Value::Undefined);
        assert_eq!(call("toString", &[Value::Undefined], &c).unwrap(), Value::Str("null".into()));
    }
}
