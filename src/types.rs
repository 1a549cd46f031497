//! 查询结果值类型定义
//!
//! `Value` 是两种执行模式共享的封闭结果类型

use crate::algorithm::PathSystem;
use crate::graph::{EdgeId, SubgraphMarker, VertexId};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// 路径：起点加上 (边, 到达顶点) 序列
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Path {
    start: VertexId,
    steps: Vec<(EdgeId, VertexId)>,
}

impl Path {
    pub fn new(start: VertexId) -> Self {
        Self {
            start,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, edge: EdgeId, vertex: VertexId) {
        self.steps.push((edge, vertex));
    }

    pub fn start_vertex(&self) -> VertexId {
        self.start
    }

    pub fn end_vertex(&self) -> VertexId {
        self.steps.last().map(|&(_, v)| v).unwrap_or(self.start)
    }

    /// 边数
    pub fn length(&self) -> usize {
        self.steps.len()
    }

    pub fn vertices(&self) -> Vec<VertexId> {
        std::iter::once(self.start)
            .chain(self.steps.iter().map(|&(_, v)| v))
            .collect()
    }

    pub fn edges(&self) -> Vec<EdgeId> {
        self.steps.iter().map(|&(e, _)| e).collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)?;
        for (e, v) in &self.steps {
            write!(f, " -{}-> {}", e, v)?;
        }
        Ok(())
    }
}

/// 查询结果值
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    /// 枚举常量
    Enum(String),
    Vertex(VertexId),
    Edge(EdgeId),
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Tuple(Vec<Value>),
    Record(BTreeMap<String, Value>),
    Map(BTreeMap<Value, Value>),
    Path(Path),
    PathSystem(Arc<PathSystem>),
    Subgraph(Arc<SubgraphMarker>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "Undefined",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Double(_) => "Double",
            Value::Str(_) => "String",
            Value::Enum(_) => "Enum",
            Value::Vertex(_) => "Vertex",
            Value::Edge(_) => "Edge",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Tuple(_) => "Tuple",
            Value::Record(_) => "Record",
            Value::Map(_) => "Map",
            Value::Path(_) => "Path",
            Value::PathSystem(_) => "PathSystem",
            Value::Subgraph(_) => "Subgraph",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Undefined => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Double(_) => 3,
            Value::Str(_) => 4,
            Value::Enum(_) => 5,
            Value::Vertex(_) => 6,
            Value::Edge(_) => 7,
            Value::List(_) => 8,
            Value::Set(_) => 9,
            Value::Tuple(_) => 10,
            Value::Record(_) => 11,
            Value::Map(_) => 12,
            Value::Path(_) => 13,
            Value::PathSystem(_) => 14,
            Value::Subgraph(_) => 15,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 数值（整数提升为浮点）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vertex(&self) -> Option<VertexId> {
        match self {
            Value::Vertex(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<EdgeId> {
        match self {
            Value::Edge(e) => Some(*e),
            _ => None,
        }
    }

    /// 集合类值的元素迭代（list / set / tuple）
    pub fn elements(&self) -> Option<Box<dyn Iterator<Item = &Value> + '_>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(Box::new(items.iter())),
            Value::Set(items) => Some(Box::new(items.iter())),
            _ => None,
        }
    }

    pub fn vertex_set<I: IntoIterator<Item = VertexId>>(ids: I) -> Self {
        Value::Set(ids.into_iter().map(Value::Vertex).collect())
    }

    pub fn edge_set<I: IntoIterator<Item = EdgeId>>(ids: I) -> Self {
        Value::Set(ids.into_iter().map(Value::Edge).collect())
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        fn join<'a, I: Iterator<Item = &'a Value>>(
            f: &mut fmt::Formatter<'_>,
            items: I,
        ) -> fmt::Result {
            for (i, item) in items.enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                item.fmt_nested(f, true)?;
            }
            Ok(())
        }

        match self {
            Value::Undefined => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) if nested => write!(f, "\"{}\"", s),
            Value::Str(s) | Value::Enum(s) => write!(f, "{}", s),
            Value::Vertex(v) => write!(f, "{}", v),
            Value::Edge(e) => write!(f, "{}", e),
            Value::List(items) => {
                write!(f, "[")?;
                join(f, items.iter())?;
                write!(f, "]")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                join(f, items.iter())?;
                write!(f, "}}")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                join(f, items.iter())?;
                write!(f, ")")
            }
            Value::Record(fields) => {
                write!(f, "rec(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", name)?;
                    value.fmt_nested(f, true)?;
                }
                write!(f, ")")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    k.fmt_nested(f, true)?;
                    write!(f, " -> ")?;
                    v.fmt_nested(f, true)?;
                }
                write!(f, "}}")
            }
            Value::Path(p) => write!(f, "{}", p),
            Value::PathSystem(ps) => write!(f, "{}", ps),
            Value::Subgraph(sg) => write!(f, "{}", sg),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, false)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) | (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Vertex(a), Value::Vertex(b)) => a.cmp(b),
            (Value::Edge(a), Value::Edge(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Path(a), Value::Path(b)) => a.cmp(b),
            (Value::PathSystem(a), Value::PathSystem(b)) => a.cmp(b),
            (Value::Subgraph(a), Value::Subgraph(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::Str(s) | Value::Enum(s) => serializer.serialize_str(s),
            Value::Vertex(v) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("vertex", &v.0)?;
                map.end()
            }
            Value::Edge(e) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("edge", &e.0)?;
                map.end()
            }
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            // JSON 对象的键只能是字符串，映射输出为键值对数组
            Value::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(&entry)?;
                }
                seq.end()
            }
            Value::Path(p) => p.serialize(serializer),
            Value::PathSystem(ps) => ps.as_ref().serialize(serializer),
            Value::Subgraph(sg) => sg.as_ref().serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<VertexId> for Value {
    fn from(v: VertexId) -> Self {
        Value::Vertex(v)
    }
}

impl From<EdgeId> for Value {
    fn from(v: EdgeId) -> Self {
        Value::Edge(v)
    }
}
