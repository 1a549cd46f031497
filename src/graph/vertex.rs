//! 顶点定义
//!
//! 顶点持有按插入顺序排列的关联（incidence）列表

use crate::graph::edge::Incidence;
use crate::schema::ClassId;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 顶点 ID（图内唯一，从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn slot(&self) -> usize {
        (self.0 as usize).wrapping_sub(1)
    }
}

impl From<u32> for VertexId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// 顶点
#[derive(Debug, Clone)]
pub struct Vertex {
    /// 顶点 ID
    id: VertexId,
    /// 顶点类
    class: ClassId,
    /// 属性（按名称排序）
    attributes: BTreeMap<String, Value>,
    /// 关联列表（插入顺序）
    incidences: Vec<Incidence>,
}

impl Vertex {
    /// 创建新顶点
    pub(crate) fn new(id: VertexId, class: ClassId, attributes: BTreeMap<String, Value>) -> Self {
        Self {
            id,
            class,
            attributes,
            incidences: Vec::new(),
        }
    }

    /// 获取顶点 ID
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// 获取顶点类
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// 获取属性
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// 获取所有属性
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    /// 关联列表
    pub fn incidences(&self) -> &[Incidence] {
        &self.incidences
    }

    /// 度数（自环计两次）
    pub fn degree(&self) -> usize {
        self.incidences.len()
    }

    pub(crate) fn push_incidence(&mut self, incidence: Incidence) {
        self.incidences.push(incidence);
    }

    pub(crate) fn remove_incidences_of(&mut self, edge: crate::graph::EdgeId) {
        self.incidences.retain(|i| i.edge() != edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeId;

    #[test]
    fn test_vertex_incidences() {
        let mut v = Vertex::new(VertexId(1), ClassId(3), BTreeMap::new());
        v.push_incidence(Incidence::new(EdgeId(1), true));
        v.push_incidence(Incidence::new(EdgeId(2), false));
        v.push_incidence(Incidence::new(EdgeId(1), false));
        assert_eq!(v.degree(), 3);

        v.remove_incidences_of(EdgeId(1));
        assert_eq!(v.incidences(), &[Incidence::new(EdgeId(2), false)]);
    }

    #[test]
    fn test_vertex_id_display() {
        assert_eq!(VertexId(12).to_string(), "v12");
        assert_eq!(VertexId(1).slot(), 0);
    }
}
