//! 路径系统
//!
//! 路径系统是以根顶点为起点、满足某个正则路径描述的所有被接受遍历的合并结果：
//! 位于被接受遍历上的跳 (from, edge, to)，以及每个叶子（被接受的终点）的最短距离。

use crate::graph::{EdgeId, VertexId};
use crate::types::Path;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

/// 路径系统中的一跳，按遍历方向记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Hop {
    pub from: VertexId,
    pub edge: EdgeId,
    pub to: VertexId,
}

impl Hop {
    pub fn new(from: VertexId, edge: EdgeId, to: VertexId) -> Self {
        Self { from, edge, to }
    }
}

/// 路径系统
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PathSystem {
    /// 根顶点
    root: VertexId,
    /// 位于被接受遍历上的跳
    hops: BTreeSet<Hop>,
    /// 叶子及其最短距离
    leaves: BTreeMap<VertexId, usize>,
}

impl PathSystem {
    pub fn new(root: VertexId, hops: BTreeSet<Hop>, leaves: BTreeMap<VertexId, usize>) -> Self {
        Self { root, hops, leaves }
    }

    /// 没有任何被接受遍历的路径系统
    pub fn empty(root: VertexId) -> Self {
        Self::new(root, BTreeSet::new(), BTreeMap::new())
    }

    pub fn root(&self) -> VertexId {
        self.root
    }

    pub fn hops(&self) -> &BTreeSet<Hop> {
        &self.hops
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// 叶子（ID 顺序）
    pub fn leaves(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.leaves.keys().copied()
    }

    pub fn leaf_distances(&self) -> &BTreeMap<VertexId, usize> {
        &self.leaves
    }

    pub fn is_leaf(&self, v: VertexId) -> bool {
        self.leaves.contains_key(&v)
    }

    /// 根到叶子的最短被接受遍历长度
    pub fn distance(&self, v: VertexId) -> Option<usize> {
        self.leaves.get(&v).copied()
    }

    /// 叶子的最大距离
    pub fn depth(&self) -> usize {
        self.leaves.values().copied().max().unwrap_or(0)
    }

    /// 路径系统中出现的所有顶点
    pub fn vertices(&self) -> BTreeSet<VertexId> {
        let mut result: BTreeSet<VertexId> = self.leaves.keys().copied().collect();
        if !self.hops.is_empty() {
            result.insert(self.root);
        }
        for hop in &self.hops {
            result.insert(hop.from);
            result.insert(hop.to);
        }
        result
    }

    /// 路径系统中出现的所有边
    pub fn edges(&self) -> BTreeSet<EdgeId> {
        self.hops.iter().map(|h| h.edge).collect()
    }

    /// 从根到 `target` 的最短遍历（只走路径系统中的跳，边 ID 小者优先）
    pub fn extract_path(&self, target: VertexId) -> Option<Path> {
        if !self.is_leaf(target) {
            return None;
        }
        if target == self.root {
            return Some(Path::new(self.root));
        }

        let mut adjacency: HashMap<VertexId, Vec<(EdgeId, VertexId)>> = HashMap::new();
        for hop in &self.hops {
            adjacency.entry(hop.from).or_default().push((hop.edge, hop.to));
        }
        for next in adjacency.values_mut() {
            next.sort();
        }

        let mut parent: HashMap<VertexId, (VertexId, EdgeId)> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        parent.insert(self.root, (self.root, EdgeId(0)));

        while let Some(current) = queue.pop_front() {
            for &(edge, neighbor) in adjacency.get(&current).into_iter().flatten() {
                if parent.contains_key(&neighbor) {
                    continue;
                }
                parent.insert(neighbor, (current, edge));
                if neighbor == target {
                    return Some(self.reconstruct_path(target, &parent));
                }
                queue.push_back(neighbor);
            }
        }
        None
    }

    /// 所有叶子的路径
    pub fn extract_paths(&self) -> Vec<Path> {
        self.leaves().filter_map(|v| self.extract_path(v)).collect()
    }

    /// 重构路径
    fn reconstruct_path(
        &self,
        target: VertexId,
        parent: &HashMap<VertexId, (VertexId, EdgeId)>,
    ) -> Path {
        let mut steps = Vec::new();
        let mut current = target;
        while current != self.root {
            match parent.get(&current) {
                Some(&(prev, edge)) => {
                    steps.push((edge, current));
                    current = prev;
                }
                None => break,
            }
        }
        steps.reverse();

        let mut path = Path::new(self.root);
        for (edge, vertex) in steps {
            path.push(edge, vertex);
        }
        path
    }
}

impl fmt::Display for PathSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PathSystem(root {}, {} leaves, {} hops)",
            self.root,
            self.leaves.len(),
            self.hops.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VertexId {
        VertexId(i)
    }

    fn e(i: u32) -> EdgeId {
        EdgeId(i)
    }

    fn sample() -> PathSystem {
        // 1 -e1-> 2 -e2-> 3, 1 -e3-> 3, 3 -e4-> 4
        let hops = [
            Hop::new(v(1), e(1), v(2)),
            Hop::new(v(2), e(2), v(3)),
            Hop::new(v(1), e(3), v(3)),
            Hop::new(v(3), e(4), v(4)),
        ]
        .into_iter()
        .collect();
        let leaves = [(v(3), 1), (v(4), 2), (v(1), 0)].into_iter().collect();
        PathSystem::new(v(1), hops, leaves)
    }

    #[test]
    fn test_distances() {
        let ps = sample();
        assert_eq!(ps.distance(v(4)), Some(2));
        assert_eq!(ps.distance(v(2)), None);
        assert_eq!(ps.depth(), 2);
        assert_eq!(ps.leaves().collect::<Vec<_>>(), vec![v(1), v(3), v(4)]);
        assert_eq!(ps.vertices().len(), 4);
    }

    #[test]
    fn test_extract_path() {
        let ps = sample();
        let p = ps.extract_path(v(4)).unwrap();
        assert_eq!(p.edges(), vec![e(3), e(4)]);
        assert_eq!(p.vertices(), vec![v(1), v(3), v(4)]);
        assert_eq!(ps.extract_path(v(1)).unwrap().length(), 0);
        assert!(ps.extract_path(v(2)).is_none());
        assert_eq!(ps.extract_paths().len(), 3);
    }

    #[test]
    fn test_empty() {
        let ps = PathSystem::empty(v(7));
        assert!(ps.is_empty());
        assert_eq!(ps.depth(), 0);
        assert!(ps.vertices().is_empty());
    }
}
