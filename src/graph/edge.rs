//! 边与关联定义
//!
//! 每条边有 alpha（起点）和 omega（终点），并在两个端点的关联列表中各登记一次

use crate::graph::vertex::VertexId;
use crate::schema::ClassId;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 边 ID（图内唯一，从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl EdgeId {
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

impl From<u32> for EdgeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// 关联：边在某个端点处的出现
///
/// `normal` 为 true 表示该端点是边的 alpha（即沿边方向离开该顶点）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Incidence {
    edge: EdgeId,
    normal: bool,
}

impl Incidence {
    pub fn new(edge: EdgeId, normal: bool) -> Self {
        Self { edge, normal }
    }

    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn is_normal(&self) -> bool {
        self.normal
    }

    /// 同一条边在另一端的关联
    pub fn reversed(&self) -> Self {
        Self {
            edge: self.edge,
            normal: !self.normal,
        }
    }
}

/// 边
#[derive(Debug, Clone)]
pub struct Edge {
    /// 边 ID
    id: EdgeId,
    /// 边类
    class: ClassId,
    /// 起点
    alpha: VertexId,
    /// 终点
    omega: VertexId,
    /// 属性
    attributes: BTreeMap<String, Value>,
}

impl Edge {
    /// 创建新边
    pub(crate) fn new(
        id: EdgeId,
        class: ClassId,
        alpha: VertexId,
        omega: VertexId,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id,
            class,
            alpha,
            omega,
            attributes,
        }
    }

    /// 获取边 ID
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// 获取边类
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// 起点
    pub fn alpha(&self) -> VertexId {
        self.alpha
    }

    /// 终点
    pub fn omega(&self) -> VertexId {
        self.omega
    }

    /// 是否自环
    pub fn is_loop(&self) -> bool {
        self.alpha == self.omega
    }

    /// 关联所在的顶点
    pub fn this_vertex(&self, incidence: Incidence) -> VertexId {
        if incidence.normal {
            self.alpha
        } else {
            self.omega
        }
    }

    /// 关联对面的顶点
    pub fn that_vertex(&self, incidence: Incidence) -> VertexId {
        if incidence.normal {
            self.omega
        } else {
            self.alpha
        }
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
}
