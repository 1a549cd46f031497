//! 图索引
//!
//! 按元素类索引顶点和边，用于 `V{T}` / `E{T}` 这类按类型取集合的查询

use crate::graph::edge::EdgeId;
use crate::graph::vertex::VertexId;
use crate::schema::ClassId;
use std::collections::{BTreeSet, HashMap};

/// 类索引
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    /// 顶点类到顶点 ID 集合的映射
    vertices: HashMap<ClassId, BTreeSet<VertexId>>,
    /// 边类到边 ID 集合的映射
    edges: HashMap<ClassId, BTreeSet<EdgeId>>,
}

impl ClassIndex {
    /// 创建新索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加顶点索引
    pub fn add_vertex(&mut self, class: ClassId, id: VertexId) {
        self.vertices.entry(class).or_default().insert(id);
    }

    /// 添加边索引
    pub fn add_edge(&mut self, class: ClassId, id: EdgeId) {
        self.edges.entry(class).or_default().insert(id);
    }

    /// 移除顶点
    pub fn remove_vertex(&mut self, class: ClassId, id: VertexId) {
        if let Some(set) = self.vertices.get_mut(&class) {
            set.remove(&id);
            if set.is_empty() {
                self.vertices.remove(&class);
            }
        }
    }

    /// 移除边
    pub fn remove_edge(&mut self, class: ClassId, id: EdgeId) {
        if let Some(set) = self.edges.get_mut(&class) {
            set.remove(&id);
            if set.is_empty() {
                self.edges.remove(&class);
            }
        }
    }

    /// 获取某个类（不含子类）的所有顶点
    pub fn vertices_of(&self, class: ClassId) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.get(&class).into_iter().flatten().copied()
    }

    /// 获取某个类（不含子类）的所有边
    pub fn edges_of(&self, class: ClassId) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.get(&class).into_iter().flatten().copied()
    }

    /// 有实例的顶点类
    pub fn vertex_classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.vertices.keys().copied()
    }

    /// 有实例的边类
    pub fn edge_classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.edges.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index() {
        let mut index = ClassIndex::new();
        index.add_vertex(ClassId(3), VertexId(2));
        index.add_vertex(ClassId(3), VertexId(1));
        index.add_edge(ClassId(7), EdgeId(1));

        assert_eq!(
            index.vertices_of(ClassId(3)).collect::<Vec<_>>(),
            vec![VertexId(1), VertexId(2)]
        );
        assert_eq!(index.edges_of(ClassId(7)).count(), 1);
        assert_eq!(index.vertices_of(ClassId(9)).count(), 0);

        index.remove_vertex(ClassId(3), VertexId(1));
        index.remove_vertex(ClassId(3), VertexId(2));
        assert_eq!(index.vertex_classes().count(), 0);
    }
}
