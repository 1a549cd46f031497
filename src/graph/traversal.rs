//! 单步遍历
//!
//! 路径表达式中的一跳（`-->`、`<--`、`<->`、`<>--`、`--<>`、`--e->` 等）
//! 在关联层面的判定规则

use super::edge::EdgeId;
use super::subgraph::GraphView;
use super::vertex::VertexId;
use crate::schema::TypeCollection;
use serde::{Deserialize, Serialize};

/// 遍历方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// 沿边方向（离开 alpha）
    Out,
    /// 逆边方向（离开 omega）
    In,
    /// 任意方向
    Any,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
            Direction::Any => Direction::Any,
        }
    }
}

/// 一跳的两端：离开的一端（this）和到达的一端（that）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HopEnd {
    This,
    That,
}

impl HopEnd {
    pub fn opposite(self) -> Self {
        match self {
            HopEnd::This => HopEnd::That,
            HopEnd::That => HopEnd::This,
        }
    }
}

/// 一跳的判定条件
#[derive(Debug, Clone, Copy)]
pub struct HopFilter<'a> {
    pub direction: Direction,
    /// 要求该端的关联类是聚合端
    pub aggregation: Option<HopEnd>,
    /// 角色名在哪一端检查
    pub role_end: HopEnd,
    pub types: Option<&'a TypeCollection>,
    /// 仅允许这条边（`--e->`）
    pub edge: Option<EdgeId>,
}

impl<'a> HopFilter<'a> {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            aggregation: None,
            role_end: HopEnd::That,
            types: None,
            edge: None,
        }
    }

    /// 逆关系：反方向走同一跳
    pub fn converse(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            aggregation: self.aggregation.map(HopEnd::opposite),
            role_end: self.role_end.opposite(),
            types: self.types,
            edge: self.edge,
        }
    }
}

impl<'g> GraphView<'g> {
    /// 从 `v` 出发满足条件的所有 (边, 到达顶点)，按关联顺序
    pub fn hops<'f>(
        &self,
        v: VertexId,
        filter: &'f HopFilter<'f>,
    ) -> impl Iterator<Item = (EdgeId, VertexId)> + 'f
    where
        'g: 'f,
    {
        let graph = self.graph();
        let schema = graph.schema();
        self.incidences(v).filter_map(move |inc| {
            if let Some(only) = filter.edge {
                if inc.edge() != only {
                    return None;
                }
            }
            let ok_direction = match filter.direction {
                Direction::Out => inc.is_normal(),
                Direction::In => !inc.is_normal(),
                Direction::Any => true,
            };
            if !ok_direction {
                return None;
            }
            let edge = graph.edge(inc.edge())?;
            let this_class = graph.incidence_class(inc)?;
            let that_class = graph.incidence_class(inc.reversed())?;
            if let Some(end) = filter.aggregation {
                let at = match end {
                    HopEnd::This => this_class,
                    HopEnd::That => that_class,
                };
                if !at.aggregation().is_aggregation() {
                    return None;
                }
            }
            if let Some(types) = filter.types {
                let role_class = match filter.role_end {
                    HopEnd::This => this_class,
                    HopEnd::That => that_class,
                };
                if !types.accepts_hop(schema, edge.class(), schema.role_set(role_class.id())) {
                    return None;
                }
            }
            Some((inc.edge(), edge.that_vertex(inc)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::schema::{
        AggregationKind, ElementKind, EndSpec, Imports, SchemaBuilder, TypeExpression, TypeToken,
    };
    use std::sync::Arc;

    fn graph() -> Graph {
        let mut b = SchemaBuilder::new("t.G");
        let part = b.vertex_class("Part").add().unwrap();
        let whole = b.vertex_class("Whole").add().unwrap();
        b.edge_class("HasPart")
            .from(EndSpec::new(whole).aggregation(AggregationKind::Composite).role("owner"))
            .to(EndSpec::new(part).role("piece"))
            .add()
            .unwrap();
        b.edge_class("Next")
            .from(EndSpec::new(part))
            .to(EndSpec::new(part))
            .add()
            .unwrap();
        let mut g = Graph::new("g", Arc::new(b.build().unwrap()));
        let has_part = g.class_named("HasPart").unwrap();
        let next = g.class_named("Next").unwrap();
        let w = g.add_vertex(whole).unwrap();
        let p1 = g.add_vertex(part).unwrap();
        let p2 = g.add_vertex(part).unwrap();
        g.add_edge(has_part, w, p1).unwrap();
        g.add_edge(has_part, w, p2).unwrap();
        g.add_edge(next, p1, p2).unwrap();
        g
    }

    #[test]
    fn test_direction() {
        let g = graph();
        let view = GraphView::new(&g);
        let out = HopFilter::new(Direction::Out);
        let any = HopFilter::new(Direction::Any);
        let p1 = VertexId(2);
        assert_eq!(view.hops(p1, &out).collect::<Vec<_>>(), vec![(EdgeId(3), VertexId(3))]);
        assert_eq!(view.hops(p1, &any).count(), 2);
        assert_eq!(view.hops(p1, &out.converse()).collect::<Vec<_>>(), vec![(EdgeId(1), VertexId(1))]);
    }

    #[test]
    fn test_aggregation_ends() {
        let g = graph();
        let view = GraphView::new(&g);
        let mut from_whole = HopFilter::new(Direction::Any);
        from_whole.aggregation = Some(HopEnd::This);
        assert_eq!(view.hops(VertexId(1), &from_whole).count(), 2);
        assert_eq!(view.hops(VertexId(2), &from_whole).count(), 0);

        let to_whole = from_whole.converse();
        assert_eq!(
            view.hops(VertexId(2), &to_whole).collect::<Vec<_>>(),
            vec![(EdgeId(1), VertexId(1))]
        );
    }

    #[test]
    fn test_role_restriction() {
        let g = graph();
        let view = GraphView::new(&g);
        let types = TypeCollection::resolve(
            &TypeExpression::new(vec![TypeToken::new("piece")]),
            g.schema(),
            &Imports::new(),
            ElementKind::Edge,
        )
        .unwrap();
        let mut filter = HopFilter::new(Direction::Any);
        filter.types = Some(&types);
        assert_eq!(view.hops(VertexId(1), &filter).count(), 2);
        assert_eq!(view.hops(VertexId(2), &filter).count(), 0);
        // 逆向时角色仍指原来的到达端
        assert_eq!(view.hops(VertexId(2), &filter.converse()).count(), 1);
    }
}
