//! 图核心模块
//!
//! 定义顶点、边、关联、子图视图和图的核心数据结构

mod edge;
#[allow(clippy::module_inception)]
mod graph;
mod index;
mod subgraph;
mod traversal;
mod vertex;

pub use edge::{Edge, EdgeId, Incidence};
pub use graph::Graph;
pub use index::ClassIndex;
pub use subgraph::{GraphView, SubgraphMarker};
pub use traversal::{Direction, HopEnd, HopFilter};
pub use vertex::{Vertex, VertexId};
