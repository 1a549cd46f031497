//! 子图视图
//!
//! `SubgraphMarker` 标记一组顶点和边，且每条被标记的边的两个端点都被标记。
//! `GraphView` 是求值器看到的图：整个图，或者被某个标记限制后的部分。

use super::edge::{EdgeId, Incidence};
use super::graph::Graph;
use super::vertex::VertexId;
use crate::schema::{ElementKind, TypeCollection};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// 子图标记
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubgraphMarker {
    vertices: BTreeSet<VertexId>,
    edges: BTreeSet<EdgeId>,
}

impl SubgraphMarker {
    pub fn vertices(&self) -> &BTreeSet<VertexId> {
        &self.vertices
    }

    pub fn edges(&self) -> &BTreeSet<EdgeId> {
        &self.edges
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(&v)
    }

    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.edges.contains(&e)
    }
}

impl fmt::Display for SubgraphMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Subgraph({} vertices, {} edges)",
            self.vertices.len(),
            self.edges.len()
        )
    }
}

/// 求值时的图视图
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'g> {
    graph: &'g Graph,
    marker: Option<&'g SubgraphMarker>,
}

impl<'g> GraphView<'g> {
    /// 整个图
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            marker: None,
        }
    }

    /// 受子图标记限制的视图
    pub fn restricted(graph: &'g Graph, marker: &'g SubgraphMarker) -> Self {
        Self {
            graph,
            marker: Some(marker),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn marker(&self) -> Option<&'g SubgraphMarker> {
        self.marker
    }

    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.graph.contains_vertex(v) && self.marker.map_or(true, |m| m.contains_vertex(v))
    }

    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.graph.contains_edge(e) && self.marker.map_or(true, |m| m.contains_edge(e))
    }

    /// 视图中的顶点（ID 顺序）
    pub fn vertices(&self) -> Box<dyn Iterator<Item = VertexId> + 'g> {
        match self.marker {
            Some(m) => Box::new(m.vertices.iter().copied()),
            None => Box::new(self.graph.vertices().map(|v| v.id())),
        }
    }

    /// 视图中的边（ID 顺序）
    pub fn edges(&self) -> Box<dyn Iterator<Item = EdgeId> + 'g> {
        match self.marker {
            Some(m) => Box::new(m.edges.iter().copied()),
            None => Box::new(self.graph.edges().map(|e| e.id())),
        }
    }

    /// 视图中某个顶点的关联（插入顺序）
    pub fn incidences(&self, v: VertexId) -> impl Iterator<Item = Incidence> + 'g {
        let marker = self.marker;
        let list = if self.contains_vertex(v) {
            self.graph.incidences(v)
        } else {
            &[]
        };
        list.iter()
            .copied()
            .filter(move |i| marker.map_or(true, |m| m.contains_edge(i.edge())))
    }

    /// 视图中按类型限制取顶点
    pub fn vertices_of_type(&self, types: &TypeCollection) -> BTreeSet<VertexId> {
        let schema = self.graph.schema();
        let mut result = BTreeSet::new();
        for class in self.graph.class_index().vertex_classes() {
            if types.accepts_class(schema, class) {
                result.extend(
                    self.graph
                        .vertices_of_class(class)
                        .filter(|&v| self.marker.map_or(true, |m| m.contains_vertex(v))),
                );
            }
        }
        result
    }

    /// 视图中按类型限制取边
    pub fn edges_of_type(&self, types: &TypeCollection) -> BTreeSet<EdgeId> {
        let schema = self.graph.schema();
        let mut result = BTreeSet::new();
        for class in self.graph.class_index().edge_classes() {
            if types.accepts_class(schema, class) {
                result.extend(
                    self.graph
                        .edges_of_class(class)
                        .filter(|&e| self.marker.map_or(true, |m| m.contains_edge(e))),
                );
            }
        }
        result
    }

    // ==================== 子图构造 ====================

    /// 给定顶点集合（与视图求交），包含两端都在集合内的边
    pub fn vertex_set_subgraph<I: IntoIterator<Item = VertexId>>(&self, vertices: I) -> SubgraphMarker {
        let vertices: BTreeSet<VertexId> = vertices
            .into_iter()
            .filter(|&v| self.contains_vertex(v))
            .collect();
        let mut edges = BTreeSet::new();
        for &v in &vertices {
            for inc in self.incidences(v) {
                if let Some(w) = self.graph.that_vertex(inc) {
                    if vertices.contains(&w) {
                        edges.insert(inc.edge());
                    }
                }
            }
        }
        SubgraphMarker { vertices, edges }
    }

    /// 给定边集合（与视图求交），包含所有端点
    pub fn edge_set_subgraph<I: IntoIterator<Item = EdgeId>>(&self, edges: I) -> SubgraphMarker {
        let edges: BTreeSet<EdgeId> = edges
            .into_iter()
            .filter(|&e| self.contains_edge(e))
            .collect();
        let mut vertices = BTreeSet::new();
        for &e in &edges {
            if let Some(edge) = self.graph.edge(e) {
                vertices.insert(edge.alpha());
                vertices.insert(edge.omega());
            }
        }
        SubgraphMarker { vertices, edges }
    }

    /// 被接受类型的顶点，以及两端都被接受的边
    pub fn vertex_type_subgraph(&self, types: &TypeCollection) -> SubgraphMarker {
        debug_assert_eq!(types.kind(), ElementKind::Vertex);
        self.vertex_set_subgraph(self.vertices_of_type(types))
    }

    /// 被接受类型的边及其端点
    pub fn edge_type_subgraph(&self, types: &TypeCollection) -> SubgraphMarker {
        debug_assert_eq!(types.kind(), ElementKind::Edge);
        self.edge_set_subgraph(self.edges_of_type(types))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EndSpec, Imports, SchemaBuilder, TypeExpression, TypeToken};
    use std::sync::Arc;

    fn graph() -> Graph {
        let mut b = SchemaBuilder::new("t.G");
        let a = b.vertex_class("A").add().unwrap();
        let bb = b.vertex_class("B").add().unwrap();
        let root = b.vertex_root();
        b.edge_class("L")
            .from(EndSpec::new(root))
            .to(EndSpec::new(root))
            .add()
            .unwrap();
        let schema = Arc::new(b.build().unwrap());
        let mut g = Graph::new("g", schema);
        let l = g.class_named("L").unwrap();
        let v1 = g.add_vertex(a).unwrap();
        let v2 = g.add_vertex(bb).unwrap();
        let v3 = g.add_vertex(a).unwrap();
        g.add_edge(l, v1, v2).unwrap();
        g.add_edge(l, v2, v3).unwrap();
        g.add_edge(l, v3, v1).unwrap();
        g
    }

    #[test]
    fn test_vertex_set_subgraph_closure() {
        let g = graph();
        let view = GraphView::new(&g);
        let sg = view.vertex_set_subgraph([VertexId(1), VertexId(2), VertexId(99)]);
        assert_eq!(sg.vertices().len(), 2);
        assert_eq!(sg.edges().iter().copied().collect::<Vec<_>>(), vec![EdgeId(1)]);
    }

    #[test]
    fn test_edge_set_subgraph_closure() {
        let g = graph();
        let view = GraphView::new(&g);
        let sg = view.edge_set_subgraph([EdgeId(2)]);
        assert_eq!(
            sg.vertices().iter().copied().collect::<Vec<_>>(),
            vec![VertexId(2), VertexId(3)]
        );
    }

    #[test]
    fn test_nested_views() {
        let g = graph();
        let imports = Imports::new();
        let only_a = TypeCollection::resolve(
            &TypeExpression::new(vec![TypeToken::new("A")]),
            g.schema(),
            &imports,
            ElementKind::Vertex,
        )
        .unwrap();
        let view = GraphView::new(&g);
        let sg = view.vertex_type_subgraph(&only_a);
        assert_eq!(sg.vertices().len(), 2);
        assert_eq!(sg.edges().iter().copied().collect::<Vec<_>>(), vec![EdgeId(3)]);

        let inner = GraphView::restricted(&g, &sg);
        assert_eq!(inner.incidences(VertexId(1)).count(), 1);
        assert_eq!(inner.incidences(VertexId(2)).count(), 0);
        let narrowed = inner.edge_set_subgraph([EdgeId(1), EdgeId(3)]);
        assert_eq!(narrowed.edges().len(), 1);
    }
}
