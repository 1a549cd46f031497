//! 数据导入模块
//!
//! 从 JSON 图文档导入：文档包含 schema（顶点类、边类、属性域、约束）
//! 以及顶点和边。顶点在文档内用整数键引用，导入后映射为图中的顶点 ID。
//!
//! ```json
//! {
//!   "id": "routes",
//!   "schema": {
//!     "name": "routes.RouteSchema",
//!     "vertex_classes": [{ "name": "Town", "attributes": { "name": "String" } }],
//!     "edge_classes": [{ "name": "Street", "from": { "class": "Town" }, "to": { "class": "Town" } }]
//!   },
//!   "vertices": [{ "key": 1, "class": "Town", "attributes": { "name": "A" } }],
//!   "edges": []
//! }
//! ```

use crate::error::{Error, Result};
use crate::graph::{Graph, VertexId};
use crate::schema::{AggregationKind, ClassId, Constraint, Domain, EndSpec, Schema, SchemaBuilder};
use crate::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 导入统计
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    pub classes_declared: usize,
    pub vertices_imported: usize,
    pub edges_imported: usize,
    pub duration_ms: u64,
}

// ============================================================================
// 文档格式
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub id: String,
    pub schema: SchemaDocument,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// 图类的限定名
    pub name: String,
    /// 属性名 → 域（如 `Integer`、`List<String>`）
    #[serde(default)]
    pub graph_attributes: IndexMap<String, String>,
    /// 超类必须先于子类声明
    #[serde(default)]
    pub vertex_classes: Vec<ClassRecord>,
    #[serde(default)]
    pub edge_classes: Vec<ClassRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub superclasses: Vec<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// 边类的 alpha 端
    #[serde(default)]
    pub from: Option<EndRecord>,
    /// 边类的 omega 端
    #[serde(default)]
    pub to: Option<EndRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndRecord {
    pub class: String,
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: Option<u32>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aggregation: AggregationKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexRecord {
    /// 文档内的键
    pub key: u32,
    pub class: String,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub class: String,
    pub alpha: u32,
    pub omega: u32,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

// ============================================================================
// 导入
// ============================================================================

impl SchemaDocument {
    pub fn build(&self) -> Result<Schema> {
        let mut builder = SchemaBuilder::new(self.name.clone());
        for (name, domain) in &self.graph_attributes {
            builder.graph_attribute(name.clone(), Domain::parse(domain)?);
        }
        for record in &self.vertex_classes {
            declare(&mut builder, record, false)?;
        }
        for record in &self.edge_classes {
            declare(&mut builder, record, true)?;
        }
        builder.build()
    }
}

fn lookup_class(builder: &SchemaBuilder, name: &str) -> Result<ClassId> {
    builder
        .class_by_name(name)
        .ok_or_else(|| Error::ImportError(format!("未声明的类: {}", name)))
}

fn end_spec(builder: &SchemaBuilder, end: &EndRecord) -> Result<EndSpec> {
    let mut spec = EndSpec::new(lookup_class(builder, &end.class)?)
        .multiplicity(end.min, end.max)
        .aggregation(end.aggregation);
    if let Some(role) = &end.role {
        spec = spec.role(role.clone());
    }
    Ok(spec)
}

fn declare(builder: &mut SchemaBuilder, record: &ClassRecord, edge: bool) -> Result<ClassId> {
    let superclasses = record
        .superclasses
        .iter()
        .map(|s| lookup_class(builder, s))
        .collect::<Result<Vec<_>>>()?;
    let ends = if edge {
        (
            record.from.as_ref().map(|e| end_spec(builder, e)).transpose()?,
            record.to.as_ref().map(|e| end_spec(builder, e)).transpose()?,
        )
    } else {
        (None, None)
    };
    let mut attributes = Vec::with_capacity(record.attributes.len());
    for (name, domain) in &record.attributes {
        attributes.push((name.clone(), Domain::parse(domain)?));
    }

    let mut draft = if edge {
        builder.edge_class(record.name.clone())
    } else {
        builder.vertex_class(record.name.clone())
    };
    for s in superclasses {
        draft = draft.superclass(s);
    }
    if record.is_abstract {
        draft = draft.abstract_class();
    }
    for (name, domain) in attributes {
        draft = draft.attribute(name, domain);
    }
    if let Some(from) = ends.0 {
        draft = draft.from(from);
    }
    if let Some(to) = ends.1 {
        draft = draft.to(to);
    }
    let id = draft.add()?;

    for constraint in &record.constraints {
        builder.add_constraint(id, constraint.clone());
    }
    Ok(id)
}

/// 按属性域把 JSON 值转换为 `Value`
pub fn convert_value(domain: &Domain, json: &serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    let mismatch = || Error::ImportError(format!("{} 不是 {} 类型的值", json, domain));
    if json.is_null() {
        return Ok(Value::Undefined);
    }
    Ok(match domain {
        Domain::Boolean => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
        Domain::Integer | Domain::Long => Value::Int(json.as_i64().ok_or_else(mismatch)?),
        Domain::Double => Value::Double(json.as_f64().ok_or_else(mismatch)?),
        Domain::String => Value::Str(json.as_str().ok_or_else(mismatch)?.to_string()),
        Domain::Enum(_) => Value::Enum(json.as_str().ok_or_else(mismatch)?.to_string()),
        Domain::List(inner) | Domain::Set(inner) => {
            let items = json
                .as_array()
                .ok_or_else(mismatch)?
                .iter()
                .map(|item| convert_value(inner, item))
                .collect::<Result<Vec<_>>>()?;
            match domain {
                Domain::Set(_) => Value::Set(items.into_iter().collect()),
                _ => Value::List(items),
            }
        }
        Domain::Map(key, value) => {
            let mut map = BTreeMap::new();
            for (k, v) in json.as_object().ok_or_else(mismatch)? {
                // 非字符串键写成 JSON 文本，如 "1"
                let k = match key.as_ref() {
                    Domain::String | Domain::Enum(_) => Json::String(k.clone()),
                    _ => serde_json::from_str(k)?,
                };
                map.insert(convert_value(key, &k)?, convert_value(value, v)?);
            }
            Value::Map(map)
        }
        Domain::Record(fields) => {
            let object = json.as_object().ok_or_else(mismatch)?;
            let mut record = BTreeMap::new();
            for (name, field) in fields {
                let v = object.get(name).unwrap_or(&Json::Null);
                record.insert(name.clone(), convert_value(field, v)?);
            }
            Value::Record(record)
        }
    })
}

fn attribute_value(graph: &Graph, class: ClassId, name: &str, json: &serde_json::Value) -> Result<Value> {
    let schema = graph.schema();
    let attribute = schema.attribute(class, name).ok_or_else(|| {
        Error::ImportError(format!("{} 没有属性 {}", schema.class(class).qualified_name(), name))
    })?;
    convert_value(&attribute.domain, json)
}

impl GraphDocument {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 构建 schema 与图
    pub fn build(&self) -> Result<(Graph, ImportStats)> {
        let start = std::time::Instant::now();
        let schema = Arc::new(self.schema.build()?);
        let mut graph = Graph::new(self.id.clone(), schema.clone());
        let mut stats = ImportStats {
            classes_declared: self.schema.vertex_classes.len() + self.schema.edge_classes.len(),
            ..ImportStats::default()
        };

        let graph_class = schema.graph_class();
        for (name, json) in &self.attributes {
            let value = attribute_value(&graph, graph_class, name, json)?;
            graph.set_graph_attribute(name, value)?;
        }

        let mut keys: HashMap<u32, VertexId> = HashMap::with_capacity(self.vertices.len());
        for record in &self.vertices {
            let class = graph.class_named(&record.class)?;
            let id = graph.add_vertex(class)?;
            if keys.insert(record.key, id).is_some() {
                return Err(Error::ImportError(format!("重复的顶点键: {}", record.key)));
            }
            for (name, json) in &record.attributes {
                let value = attribute_value(&graph, class, name, json)?;
                graph.set_vertex_attribute(id, name, value)?;
            }
            stats.vertices_imported += 1;
        }

        let vertex = |key: u32| {
            keys.get(&key)
                .copied()
                .ok_or_else(|| Error::ImportError(format!("边引用了不存在的顶点键: {}", key)))
        };
        for record in &self.edges {
            let class = graph.class_named(&record.class)?;
            let id = graph.add_edge(class, vertex(record.alpha)?, vertex(record.omega)?)?;
            for (name, json) in &record.attributes {
                let value = attribute_value(&graph, class, name, json)?;
                graph.set_edge_attribute(id, name, value)?;
            }
            stats.edges_imported += 1;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        debug!(graph = %self.id, ?stats, "graph document built");
        Ok((graph, stats))
    }
}

/// 从 JSON 文件导入图
pub fn import_json<P: AsRef<Path>>(path: P) -> Result<(Graph, ImportStats)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let result = GraphDocument::from_json_str(&text)?.build()?;
    info!(
        path = %path.display(),
        vertices = result.1.vertices_imported,
        edges = result.1.edges_imported,
        "graph imported"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{evaluate, Environment};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DOCUMENT: &str = r#"{
        "id": "routes",
        "schema": {
            "name": "routes.RouteSchema",
            "graph_attributes": { "title": "String" },
            "vertex_classes": [
                { "name": "Place", "abstract": true, "attributes": { "name": "String" } },
                { "name": "Town", "superclasses": ["Place"], "attributes": { "tags": "Set<String>" } }
            ],
            "edge_classes": [
                { "name": "Street", "from": { "class": "Town", "role": "src" },
                  "to": { "class": "Town", "role": "dst" },
                  "attributes": { "length": "Map<Integer, Double>" } }
            ]
        },
        "attributes": { "title": "demo" },
        "vertices": [
            { "key": 10, "class": "Town", "attributes": { "name": "A", "tags": ["x", "y"] } },
            { "key": 20, "class": "Town", "attributes": { "name": "B" } }
        ],
        "edges": [
            { "class": "Street", "alpha": 10, "omega": 20, "attributes": { "length": { "1": 2.5 } } }
        ]
    }"#;

    #[test]
    fn test_import_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", DOCUMENT).unwrap();

        let (graph, stats) = import_json(file.path()).unwrap();
        assert_eq!(stats.classes_declared, 3);
        assert_eq!(stats.vertices_imported, 2);
        assert_eq!(stats.edges_imported, 1);
        assert_eq!(graph.graph_attribute("title"), Some(&Value::Str("demo".into())));

        let mut env = Environment::new();
        assert_eq!(
            evaluate("getVertex(1).name", Some(&graph), &mut env).unwrap(),
            Value::Str("A".into())
        );
        assert_eq!(
            evaluate("count(V{Place})", Some(&graph), &mut env).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            evaluate("getVertex(1) --> getVertex(2)", Some(&graph), &mut env).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_convert_value() {
        let domain = Domain::parse("List<Integer>").unwrap();
        assert_eq!(
            convert_value(&domain, &serde_json::json!([1, 2])).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(convert_value(&domain, &serde_json::json!("no")).is_err());
        assert_eq!(
            convert_value(&Domain::String, &serde_json::Value::Null).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn test_dangling_vertex_key() {
        let text = DOCUMENT.replace("\"omega\": 20", "\"omega\": 30");
        let err = GraphDocument::from_json_str(&text).unwrap().build().unwrap_err();
        assert!(matches!(err, Error::ImportError(_)));
    }
}
