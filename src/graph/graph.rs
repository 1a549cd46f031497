//! 图数据结构
//!
//! 内存中的类型化图：顶点/边按 ID 存放在数组中，每个顶点维护关联列表

use super::edge::{Edge, EdgeId, Incidence};
use super::index::ClassIndex;
use super::vertex::{Vertex, VertexId};
use crate::error::{Error, Result};
use crate::schema::{ClassId, ElementKind, IncidenceClass, Schema};
use crate::types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// 类型化图
#[derive(Debug, Clone)]
pub struct Graph {
    /// 图 ID
    id: String,
    /// 图所遵循的 schema
    schema: Arc<Schema>,
    /// 图属性
    attributes: BTreeMap<String, Value>,
    /// 顶点数组（下标 = ID - 1，删除后留空）
    vertices: Vec<Option<Vertex>>,
    /// 边数组（下标 = ID - 1，删除后留空）
    edges: Vec<Option<Edge>>,
    /// 类索引
    index: ClassIndex,
    vertex_count: usize,
    edge_count: usize,
}

impl Graph {
    /// 创建空图
    pub fn new(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        let attributes = default_attributes(&schema, schema.graph_class());
        Self {
            id: id.into(),
            schema,
            attributes,
            vertices: Vec::new(),
            edges: Vec::new(),
            index: ClassIndex::new(),
            vertex_count: 0,
            edge_count: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// 按限定名或唯一简单名查找类
    pub fn class_named(&self, name: &str) -> Result<ClassId> {
        if let Some(c) = self.schema.class_by_name(name) {
            return Ok(c);
        }
        match self.schema.classes_by_simple_name(name) {
            [c] => Ok(*c),
            [] => Err(Error::SchemaError(format!("未知的类: {}", name))),
            _ => Err(Error::SchemaError(format!("类名不唯一: {}", name))),
        }
    }

    // ==================== 顶点操作 ====================

    /// 添加顶点
    pub fn add_vertex(&mut self, class: ClassId) -> Result<VertexId> {
        self.check_instantiable(class, ElementKind::Vertex)?;
        let id = VertexId::new(self.vertices.len() as u32 + 1);
        let attributes = default_attributes(&self.schema, class);
        self.vertices.push(Some(Vertex::new(id, class, attributes)));
        self.index.add_vertex(class, id);
        self.vertex_count += 1;
        trace!(vertex = %id, class = %self.schema.class(class), "vertex added");
        Ok(id)
    }

    /// 获取顶点
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.slot()).and_then(|v| v.as_ref())
    }

    fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        self.vertices
            .get_mut(id.slot())
            .and_then(|v| v.as_mut())
            .ok_or(Error::VertexNotFound(id.0))
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex(id).is_some()
    }

    /// 按 ID 顺序遍历所有顶点
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().flatten()
    }

    /// 获取顶点数量
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// 删除顶点及其所有关联边
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<()> {
        let edges: Vec<EdgeId> = self
            .vertex(id)
            .ok_or(Error::VertexNotFound(id.0))?
            .incidences()
            .iter()
            .map(|i| i.edge())
            .collect();
        for e in edges {
            if self.contains_edge(e) {
                self.remove_edge(e)?;
            }
        }
        if let Some(v) = self.vertices[id.slot()].take() {
            self.index.remove_vertex(v.class(), id);
            self.vertex_count -= 1;
        }
        Ok(())
    }

    // ==================== 边操作 ====================

    /// 添加边，端点必须符合边类两端的顶点类
    pub fn add_edge(&mut self, class: ClassId, alpha: VertexId, omega: VertexId) -> Result<EdgeId> {
        self.check_instantiable(class, ElementKind::Edge)?;
        let alpha_class = self.vertex(alpha).ok_or(Error::VertexNotFound(alpha.0))?.class();
        let omega_class = self.vertex(omega).ok_or(Error::VertexNotFound(omega.0))?.class();

        let (from, to) = match (self.schema.from_incidence(class), self.schema.to_incidence(class)) {
            (Some(f), Some(t)) => (f.vertex_class(), t.vertex_class()),
            _ => {
                return Err(Error::SchemaError(format!(
                    "边类 {} 缺少关联类",
                    self.schema.class(class)
                )))
            }
        };
        if !self.schema.is_subclass_of(alpha_class, from) {
            return Err(Error::GraphError(format!(
                "起点 {} 的类 {} 不符合 {} 的 from 端 {}",
                alpha,
                self.schema.class(alpha_class),
                self.schema.class(class),
                self.schema.class(from)
            )));
        }
        if !self.schema.is_subclass_of(omega_class, to) {
            return Err(Error::GraphError(format!(
                "终点 {} 的类 {} 不符合 {} 的 to 端 {}",
                omega,
                self.schema.class(omega_class),
                self.schema.class(class),
                self.schema.class(to)
            )));
        }

        let id = EdgeId::new(self.edges.len() as u32 + 1);
        let attributes = default_attributes(&self.schema, class);
        self.edges
            .push(Some(Edge::new(id, class, alpha, omega, attributes)));
        self.vertex_mut(alpha)?.push_incidence(Incidence::new(id, true));
        self.vertex_mut(omega)?.push_incidence(Incidence::new(id, false));
        self.index.add_edge(class, id);
        self.edge_count += 1;
        trace!(edge = %id, %alpha, %omega, "edge added");
        Ok(id)
    }

    /// 获取边
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.slot()).and_then(|e| e.as_ref())
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// 按 ID 顺序遍历所有边
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().flatten()
    }

    /// 获取边数量
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// 删除边
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self
            .edges
            .get_mut(id.slot())
            .and_then(|e| e.take())
            .ok_or(Error::EdgeNotFound(id.0))?;
        self.vertex_mut(edge.alpha())?.remove_incidences_of(id);
        if !edge.is_loop() {
            self.vertex_mut(edge.omega())?.remove_incidences_of(id);
        }
        self.index.remove_edge(edge.class(), id);
        self.edge_count -= 1;
        Ok(())
    }

    // ==================== 关联遍历 ====================

    /// 顶点的关联列表（插入顺序）
    pub fn incidences(&self, v: VertexId) -> &[Incidence] {
        self.vertex(v).map(|v| v.incidences()).unwrap_or(&[])
    }

    pub fn first_incidence(&self, v: VertexId) -> Option<Incidence> {
        self.incidences(v).first().copied()
    }

    pub fn last_incidence(&self, v: VertexId) -> Option<Incidence> {
        self.incidences(v).last().copied()
    }

    /// 关联列表中的后继
    pub fn next_incidence(&self, v: VertexId, current: Incidence) -> Option<Incidence> {
        let list = self.incidences(v);
        let pos = list.iter().position(|&i| i == current)?;
        list.get(pos + 1).copied()
    }

    /// 关联列表中的前驱
    pub fn prev_incidence(&self, v: VertexId, current: Incidence) -> Option<Incidence> {
        let list = self.incidences(v);
        let pos = list.iter().position(|&i| i == current)?;
        pos.checked_sub(1).and_then(|p| list.get(p).copied())
    }

    /// 关联所在的顶点
    pub fn this_vertex(&self, incidence: Incidence) -> Option<VertexId> {
        self.edge(incidence.edge()).map(|e| e.this_vertex(incidence))
    }

    /// 关联对面的顶点
    pub fn that_vertex(&self, incidence: Incidence) -> Option<VertexId> {
        self.edge(incidence.edge()).map(|e| e.that_vertex(incidence))
    }

    /// 关联在 schema 中对应的关联类
    pub fn incidence_class(&self, incidence: Incidence) -> Option<&IncidenceClass> {
        let edge = self.edge(incidence.edge())?;
        if incidence.is_normal() {
            self.schema.from_incidence(edge.class())
        } else {
            self.schema.to_incidence(edge.class())
        }
    }

    // ==================== 类型与属性 ====================

    /// 元素所属的类
    pub fn vertex_class(&self, v: VertexId) -> Option<ClassId> {
        self.vertex(v).map(|v| v.class())
    }

    pub fn edge_class(&self, e: EdgeId) -> Option<ClassId> {
        self.edge(e).map(|e| e.class())
    }

    /// 某个类（不含子类）的全部顶点
    pub fn vertices_of_class(&self, class: ClassId) -> impl Iterator<Item = VertexId> + '_ {
        self.index.vertices_of(class)
    }

    /// 某个类（不含子类）的全部边
    pub fn edges_of_class(&self, class: ClassId) -> impl Iterator<Item = EdgeId> + '_ {
        self.index.edges_of(class)
    }

    pub fn class_index(&self) -> &ClassIndex {
        &self.index
    }

    /// 设置顶点属性
    pub fn set_vertex_attribute(&mut self, v: VertexId, name: &str, value: Value) -> Result<()> {
        let class = self.vertex(v).ok_or(Error::VertexNotFound(v.0))?.class();
        self.check_attribute(class, name, &value)?;
        self.vertex_mut(v)?.set_attribute(name, value);
        Ok(())
    }

    /// 设置边属性
    pub fn set_edge_attribute(&mut self, e: EdgeId, name: &str, value: Value) -> Result<()> {
        let class = self.edge(e).ok_or(Error::EdgeNotFound(e.0))?.class();
        self.check_attribute(class, name, &value)?;
        match self.edges.get_mut(e.slot()).and_then(|e| e.as_mut()) {
            Some(edge) => edge.set_attribute(name, value),
            None => return Err(Error::EdgeNotFound(e.0)),
        }
        Ok(())
    }

    /// 设置图属性
    pub fn set_graph_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        self.check_attribute(self.schema.graph_class(), name, &value)?;
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    pub fn graph_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn check_attribute(&self, class: ClassId, name: &str, value: &Value) -> Result<()> {
        let attribute = self.schema.attribute(class, name).ok_or_else(|| {
            Error::GraphError(format!("{} 没有属性 {}", self.schema.class(class), name))
        })?;
        if !attribute.domain.conforms(value) {
            return Err(Error::GraphError(format!(
                "值 {} 不符合属性 {} 的域 {}",
                value, name, attribute.domain
            )));
        }
        Ok(())
    }

    fn check_instantiable(&self, class: ClassId, kind: ElementKind) -> Result<()> {
        if class.index() >= self.schema.class_count() {
            return Err(Error::SchemaError(format!("未知的类 {:?}", class)));
        }
        let c = self.schema.class(class);
        if c.kind() != kind {
            return Err(Error::SchemaError(format!("{} 不是{}类", c, kind)));
        }
        if c.is_abstract() {
            return Err(Error::SchemaError(format!("抽象类 {} 不能实例化", c)));
        }
        Ok(())
    }
}

fn default_attributes(schema: &Schema, class: ClassId) -> BTreeMap<String, Value> {
    schema
        .attributes(class)
        .into_iter()
        .map(|a| (a.name.clone(), a.domain.default_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Domain, EndSpec, SchemaBuilder};

    fn small_graph() -> (Graph, ClassId, ClassId) {
        let mut b = SchemaBuilder::new("test.G");
        let node = b
            .vertex_class("Node")
            .attribute("name", Domain::String)
            .add()
            .unwrap();
        let link = b
            .edge_class("Link")
            .from(EndSpec::new(node))
            .to(EndSpec::new(node))
            .attribute("weight", Domain::Integer)
            .add()
            .unwrap();
        let schema = Arc::new(b.build().unwrap());
        (Graph::new("g", schema), node, link)
    }

    #[test]
    fn test_graph_basic() {
        let (mut g, node, link) = small_graph();
        let v1 = g.add_vertex(node).unwrap();
        let v2 = g.add_vertex(node).unwrap();
        let e = g.add_edge(link, v1, v2).unwrap();

        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(e).unwrap().alpha(), v1);
        assert_eq!(g.incidences(v1), &[Incidence::new(e, true)]);
        assert_eq!(g.incidences(v2), &[Incidence::new(e, false)]);
        assert_eq!(g.that_vertex(Incidence::new(e, true)), Some(v2));
        assert_eq!(g.edge(e).unwrap().attribute("weight"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_incidence_navigation() {
        let (mut g, node, link) = small_graph();
        let v1 = g.add_vertex(node).unwrap();
        let v2 = g.add_vertex(node).unwrap();
        let e1 = g.add_edge(link, v1, v2).unwrap();
        let e2 = g.add_edge(link, v2, v1).unwrap();
        let e3 = g.add_edge(link, v1, v1).unwrap();

        let first = g.first_incidence(v1).unwrap();
        assert_eq!(first, Incidence::new(e1, true));
        let second = g.next_incidence(v1, first).unwrap();
        assert_eq!(second, Incidence::new(e2, false));
        assert_eq!(g.prev_incidence(v1, second), Some(first));
        assert_eq!(g.prev_incidence(v1, first), None);
        // 自环在关联列表中出现两次
        assert_eq!(g.incidences(v1).len(), 4);
        assert_eq!(g.last_incidence(v1), Some(Incidence::new(e3, false)));

        g.remove_edge(e3).unwrap();
        assert_eq!(g.incidences(v1).len(), 2);
        g.remove_vertex(v2).unwrap();
        assert_eq!(g.edge_count(), 0);
        assert!(g.incidences(v1).is_empty());
        assert!(g.vertex(v2).is_none());
    }

    #[test]
    fn test_attribute_checks() {
        let (mut g, node, _) = small_graph();
        let v = g.add_vertex(node).unwrap();
        g.set_vertex_attribute(v, "name", Value::from("a")).unwrap();
        assert_eq!(g.vertex(v).unwrap().attribute("name"), Some(&Value::from("a")));
        assert!(g.set_vertex_attribute(v, "name", Value::Int(1)).is_err());
        assert!(g.set_vertex_attribute(v, "missing", Value::Int(1)).is_err());
    }

    #[test]
    fn test_abstract_and_kind_checks() {
        let (mut g, node, link) = small_graph();
        let root = g.schema().vertex_root();
        assert!(matches!(g.add_vertex(root), Err(Error::SchemaError(_))));
        assert!(matches!(g.add_vertex(link), Err(Error::SchemaError(_))));
        let v = g.add_vertex(node).unwrap();
        assert!(matches!(g.add_edge(link, v, VertexId(99)), Err(Error::VertexNotFound(99))));
        assert_eq!(g.class_named("Node").unwrap(), node);
    }
}
