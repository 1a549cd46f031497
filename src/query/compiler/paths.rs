//! Compiled path descriptions
//!
//! A compiled path description is a relation over the vertices of the
//! current view. Each operator knows two things about its relation:
//!
//! - `image`: minimum walk length from a weighted set of sources to every
//!   vertex it relates them to (or, with `rev`, of the converse relation)
//! - `hops`: every hop lying on a walk that starts in one vertex set and
//!   ends in another, oriented the way the walk traverses it
//!
//! Sequences and exponents find the hops of their parts by intersecting
//! forward and backward layers; closures iterate `image` to a fixpoint.

use super::{Code, Compiler, Frame};
use crate::algorithm::{Hop, PathSystem};
use crate::error::{Error, Result};
use crate::graph::{Direction, EdgeId, GraphView, HopEnd, HopFilter, VertexId};
use crate::metrics::global_metrics;
use crate::query::ast::{PathDescription, PathKind};
use crate::query::operators::expect_edge;
use crate::query::AbortHandle;
use crate::schema::{ElementKind, TypeCollection};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub(crate) type Distances = BTreeMap<VertexId, usize>;
pub(crate) type VertexSet = BTreeSet<VertexId>;

/// Builds the relation of one path description. Runs at evaluation time
/// because restrictions and edge expressions depend on the frame.
pub(crate) type PathCode = Box<dyn Fn(&mut Frame<'_>) -> Result<Box<dyn PathOp>> + Send + Sync>;

/// Everything a relation needs while it is being walked.
pub(crate) struct Walk<'w> {
    pub view: GraphView<'w>,
    pub abort: &'w AbortHandle,
}

impl Walk<'_> {
    fn accepts(&self, types: &TypeCollection, vertex: VertexId) -> bool {
        let graph = self.view.graph();
        graph
            .vertex_class(vertex)
            .map_or(false, |class| types.accepts_class(graph.schema(), class))
    }
}

pub(crate) trait PathOp {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances>;

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()>;
}

fn keys(distances: &Distances) -> VertexSet {
    distances.keys().copied().collect()
}

fn zero(vertices: &VertexSet) -> Distances {
    vertices.iter().map(|&v| (v, 0)).collect()
}

/// Keep the smaller distance per vertex.
fn merge(into: &mut Distances, from: &Distances) {
    for (&v, &d) in from {
        let known = into.entry(v).or_insert(usize::MAX);
        *known = (*known).min(d);
    }
}

// ============================================================================
// Operators
// ============================================================================

struct Step {
    direction: Direction,
    aggregation: Option<HopEnd>,
    types: Option<Arc<TypeCollection>>,
    edge: Option<EdgeId>,
}

impl Step {
    fn filter(&self, rev: bool) -> HopFilter<'_> {
        let filter = HopFilter {
            direction: self.direction,
            aggregation: self.aggregation,
            role_end: HopEnd::That,
            types: self.types.as_deref(),
            edge: self.edge,
        };
        if rev {
            filter.converse()
        } else {
            filter
        }
    }
}

impl PathOp for Step {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let filter = self.filter(rev);
        let mut out = Distances::new();
        for (&from, &d) in input {
            walk.abort.check()?;
            for (_, to) in walk.view.hops(from, &filter) {
                let known = out.entry(to).or_insert(usize::MAX);
                *known = (*known).min(d + 1);
            }
        }
        Ok(out)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        let filter = self.filter(rev);
        for &from in sources {
            walk.abort.check()?;
            out.extend(
                walk.view
                    .hops(from, &filter)
                    .filter(|(_, to)| targets.contains(to))
                    .map(|(edge, to)| Hop::new(from, edge, to)),
            );
        }
        Ok(())
    }
}

/// `&{A} P &{B}`
struct Restricted {
    inner: Box<dyn PathOp>,
    start: Option<Arc<TypeCollection>>,
    goal: Option<Arc<TypeCollection>>,
}

impl Restricted {
    fn ends(&self, rev: bool) -> (Option<&TypeCollection>, Option<&TypeCollection>) {
        if rev {
            (self.goal.as_deref(), self.start.as_deref())
        } else {
            (self.start.as_deref(), self.goal.as_deref())
        }
    }
}

impl PathOp for Restricted {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let (first, last) = self.ends(rev);
        let entered: Distances = match first {
            Some(types) => input
                .iter()
                .filter(|(v, _)| walk.accepts(types, **v))
                .map(|(&v, &d)| (v, d))
                .collect(),
            None => input.clone(),
        };
        let mut out = self.inner.image(walk, &entered, rev)?;
        if let Some(types) = last {
            out.retain(|v, _| walk.accepts(types, *v));
        }
        Ok(out)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        let (first, last) = self.ends(rev);
        let filter = |set: &VertexSet, types: Option<&TypeCollection>| -> VertexSet {
            match types {
                Some(types) => set.iter().copied().filter(|&v| walk.accepts(types, v)).collect(),
                None => set.clone(),
            }
        };
        self.inner
            .hops(walk, &filter(sources, first), &filter(targets, last), rev, out)
    }
}

/// Concatenation of parts. Shared by sequences and exponents.
struct Chain {
    parts: Vec<Arc<dyn PathOp>>,
}

impl Chain {
    fn ordered(&self, rev: bool) -> Vec<&dyn PathOp> {
        let mut parts: Vec<&dyn PathOp> = self.parts.iter().map(|p| p.as_ref()).collect();
        if rev {
            parts.reverse();
        }
        parts
    }
}

impl PathOp for Chain {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let mut current = input.clone();
        for part in self.ordered(rev) {
            if current.is_empty() {
                break;
            }
            current = part.image(walk, &current, rev)?;
        }
        Ok(current)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        let parts = self.ordered(rev);
        let n = parts.len();

        // forward[i]: reached from `sources` by the first i parts
        let mut forward = Vec::with_capacity(n + 1);
        forward.push(sources.clone());
        for (i, part) in parts.iter().enumerate() {
            let next = keys(&part.image(walk, &zero(&forward[i]), rev)?);
            forward.push(next);
        }

        // backward[i]: reaches `targets` by the parts from i on
        let mut backward = vec![VertexSet::new(); n + 1];
        backward[n] = targets.clone();
        for i in (0..n).rev() {
            backward[i] = keys(&parts[i].image(walk, &zero(&backward[i + 1]), !rev)?);
        }

        let layers: Vec<VertexSet> = forward
            .iter()
            .zip(&backward)
            .map(|(f, b)| f.intersection(b).copied().collect())
            .collect();
        for (i, part) in parts.iter().enumerate() {
            if layers[i].is_empty() || layers[i + 1].is_empty() {
                continue;
            }
            part.hops(walk, &layers[i], &layers[i + 1], rev, out)?;
        }
        Ok(())
    }
}

struct Alternative {
    parts: Vec<Box<dyn PathOp>>,
}

impl PathOp for Alternative {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let mut out = Distances::new();
        for part in &self.parts {
            merge(&mut out, &part.image(walk, input, rev)?);
        }
        Ok(out)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        for part in &self.parts {
            part.hops(walk, sources, targets, rev, out)?;
        }
        Ok(())
    }
}

/// `[P]`
struct Optional {
    inner: Box<dyn PathOp>,
}

impl PathOp for Optional {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let mut out = input.clone();
        merge(&mut out, &self.inner.image(walk, input, rev)?);
        Ok(out)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        self.inner.hops(walk, sources, targets, rev, out)
    }
}

/// Least fixpoint of `D ∪ image(P, D)`: reflexive transitive closure.
fn closure(op: &dyn PathOp, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
    let mut reached = input.clone();
    let mut frontier = input.clone();
    let mut rounds = 0usize;
    while !frontier.is_empty() {
        rounds += 1;
        let image = op.image(walk, &frontier, rev)?;
        frontier = image
            .into_iter()
            .filter(|(v, d)| reached.get(v).map_or(true, |known| d < known))
            .collect();
        merge(&mut reached, &frontier);
    }
    global_metrics().record_fixpoint_rounds(rounds);
    Ok(reached)
}

/// `P*` (`plus == false`) and `P+`
struct Repeat {
    inner: Box<dyn PathOp>,
    plus: bool,
}

impl PathOp for Repeat {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        let star = closure(self.inner.as_ref(), walk, input, rev)?;
        if self.plus {
            self.inner.image(walk, &star, rev)
        } else {
            Ok(star)
        }
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        let inner = self.inner.as_ref();
        let from = keys(&closure(inner, walk, &zero(sources), rev)?);
        let to = keys(&closure(inner, walk, &zero(targets), !rev)?);
        if from.is_empty() || to.is_empty() {
            return Ok(());
        }
        inner.hops(walk, &from, &to, rev, out)
    }
}

/// `P^T`
struct Transposed {
    inner: Box<dyn PathOp>,
}

impl PathOp for Transposed {
    fn image(&self, walk: &Walk<'_>, input: &Distances, rev: bool) -> Result<Distances> {
        self.inner.image(walk, input, !rev)
    }

    fn hops(
        &self,
        walk: &Walk<'_>,
        sources: &VertexSet,
        targets: &VertexSet,
        rev: bool,
        out: &mut BTreeSet<Hop>,
    ) -> Result<()> {
        self.inner.hops(walk, sources, targets, !rev, out)
    }
}

// ============================================================================
// Root queries
// ============================================================================

fn single(v: VertexId) -> Distances {
    Distances::from([(v, 0)])
}

/// End vertices of the walks from `start` (`rev == false`) or the start
/// vertices of the walks into `start` (`rev == true`).
pub(crate) fn reachable(op: &dyn PathOp, walk: &Walk<'_>, start: VertexId, rev: bool) -> Result<VertexSet> {
    if !walk.view.contains_vertex(start) {
        return Ok(VertexSet::new());
    }
    Ok(keys(&op.image(walk, &single(start), rev)?))
}

pub(crate) fn reaches(op: &dyn PathOp, walk: &Walk<'_>, start: VertexId, target: VertexId) -> Result<bool> {
    Ok(reachable(op, walk, start, false)?.contains(&target))
}

pub(crate) fn path_system(op: &dyn PathOp, walk: &Walk<'_>, root: VertexId) -> Result<PathSystem> {
    if !walk.view.contains_vertex(root) {
        return Ok(PathSystem::empty(root));
    }
    let leaves = op.image(walk, &single(root), false)?;
    let mut hops = BTreeSet::new();
    if !leaves.is_empty() {
        op.hops(walk, &VertexSet::from([root]), &keys(&leaves), false, &mut hops)?;
    }
    Ok(PathSystem::new(root, hops, leaves))
}

// ============================================================================
// Compilation
// ============================================================================

impl Compiler {
    /// Children are built in pre-order at evaluation time: restrictions,
    /// then the node's own part, then its operands left to right.
    pub(crate) fn compile_path(&mut self, path: &PathDescription) -> PathCode {
        let start = path.start_restriction.clone();
        let goal = path.goal_restriction.clone();
        let kind = self.compile_kind(&path.kind);
        if start.is_none() && goal.is_none() {
            return kind;
        }
        Box::new(move |frame| {
            let start = start
                .as_ref()
                .map(|t| frame.types(t, ElementKind::Vertex))
                .transpose()?;
            let goal = goal
                .as_ref()
                .map(|t| frame.types(t, ElementKind::Vertex))
                .transpose()?;
            Ok(Box::new(Restricted {
                inner: kind(frame)?,
                start,
                goal,
            }))
        })
    }

    fn compile_paths(&mut self, items: &[PathDescription]) -> Vec<PathCode> {
        items.iter().map(|p| self.compile_path(p)).collect()
    }

    fn compile_kind(&mut self, kind: &PathKind) -> PathCode {
        match kind {
            PathKind::Simple {
                direction,
                aggregation,
                restriction,
            } => {
                let (direction, aggregation) = (*direction, *aggregation);
                let restriction = restriction.clone();
                Box::new(move |frame| {
                    let types = restriction
                        .as_ref()
                        .map(|t| frame.types(t, ElementKind::Edge))
                        .transpose()?;
                    Ok(Box::new(Step {
                        direction,
                        aggregation,
                        types,
                        edge: None,
                    }))
                })
            }
            PathKind::Edge { direction, edge } => {
                let direction = *direction;
                let edge: Code = self.compile(edge);
                Box::new(move |frame| {
                    let value = edge(frame)?;
                    let edge = expect_edge(&value, "edge path")?;
                    Ok(Box::new(Step {
                        direction,
                        aggregation: None,
                        types: None,
                        edge: Some(edge),
                    }))
                })
            }
            PathKind::Sequence(items) => {
                let parts = self.compile_paths(items);
                Box::new(move |frame| {
                    let mut built: Vec<Arc<dyn PathOp>> = Vec::with_capacity(parts.len());
                    for part in &parts {
                        built.push(Arc::from(part(frame)?));
                    }
                    Ok(Box::new(Chain { parts: built }))
                })
            }
            PathKind::Alternative(items) => {
                let parts = self.compile_paths(items);
                Box::new(move |frame| {
                    let built = parts
                        .iter()
                        .map(|part| part(frame))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Box::new(Alternative { parts: built }))
                })
            }
            PathKind::Optional(inner) => {
                let inner = self.compile_path(inner);
                Box::new(move |frame| Ok(Box::new(Optional { inner: inner(frame)? })))
            }
            PathKind::Star(inner) | PathKind::Plus(inner) => {
                let plus = matches!(kind, PathKind::Plus(_));
                let inner = self.compile_path(inner);
                Box::new(move |frame| {
                    Ok(Box::new(Repeat {
                        inner: inner(frame)?,
                        plus,
                    }))
                })
            }
            PathKind::Exponent(inner, n) => {
                let n = *n as usize;
                let inner = self.compile_path(inner);
                Box::new(move |frame| {
                    if n == 0 {
                        return Err(Error::greql("path exponent must be at least 1"));
                    }
                    let part: Arc<dyn PathOp> = Arc::from(inner(frame)?);
                    Ok(Box::new(Chain {
                        parts: vec![part; n],
                    }))
                })
            }
            PathKind::Group(inner) => self.compile_path(inner),
            PathKind::Transposed(inner) => {
                let inner = self.compile_path(inner);
                Box::new(move |frame| Ok(Box::new(Transposed { inner: inner(frame)? })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::schema::{EndSpec, SchemaBuilder};

    /// 1 -> 2 -> 3 -> 1, 3 -> 4
    fn graph() -> Graph {
        let mut b = SchemaBuilder::new("t.G");
        let node = b.vertex_class("Node").add().unwrap();
        b.edge_class("Link")
            .from(EndSpec::new(node))
            .to(EndSpec::new(node))
            .add()
            .unwrap();
        let mut g = Graph::new("g", Arc::new(b.build().unwrap()));
        let link = g.class_named("Link").unwrap();
        let v: Vec<_> = (0..4).map(|_| g.add_vertex(node).unwrap()).collect();
        g.add_edge(link, v[0], v[1]).unwrap();
        g.add_edge(link, v[1], v[2]).unwrap();
        g.add_edge(link, v[2], v[0]).unwrap();
        g.add_edge(link, v[2], v[3]).unwrap();
        g
    }

    fn out() -> Box<dyn PathOp> {
        Box::new(Step {
            direction: Direction::Out,
            aggregation: None,
            types: None,
            edge: None,
        })
    }

    #[test]
    fn test_closure_distances() {
        let g = graph();
        let abort = AbortHandle::new();
        let walk = Walk {
            view: GraphView::new(&g),
            abort: &abort,
        };
        let star = Repeat {
            inner: out(),
            plus: false,
        };
        let ps = path_system(&star, &walk, VertexId(1)).unwrap();
        assert_eq!(ps.distance(VertexId(1)), Some(0));
        assert_eq!(ps.distance(VertexId(4)), Some(3));
        assert_eq!(ps.hops().len(), 4);

        let plus = Repeat {
            inner: out(),
            plus: true,
        };
        // 1 is only reached again through the cycle
        assert_eq!(
            plus.image(&walk, &single(VertexId(1)), false).unwrap()[&VertexId(1)],
            3
        );
    }

    #[test]
    fn test_chain_hops_use_both_layers() {
        let g = graph();
        let abort = AbortHandle::new();
        let walk = Walk {
            view: GraphView::new(&g),
            abort: &abort,
        };
        let step: Arc<dyn PathOp> = Arc::from(out());
        let twice = Chain {
            parts: vec![step.clone(), step],
        };
        let ps = path_system(&twice, &walk, VertexId(1)).unwrap();
        assert_eq!(ps.leaves().collect::<Vec<_>>(), vec![VertexId(3)]);
        assert_eq!(
            ps.hops().iter().map(|h| h.edge).collect::<Vec<_>>(),
            vec![EdgeId(1), EdgeId(2)]
        );
        assert!(reaches(&twice, &walk, VertexId(1), VertexId(3)).unwrap());
        assert!(!reaches(&twice, &walk, VertexId(1), VertexId(4)).unwrap());
    }

    #[test]
    fn test_transposed_image() {
        let g = graph();
        let abort = AbortHandle::new();
        let walk = Walk {
            view: GraphView::new(&g),
            abort: &abort,
        };
        let back = Transposed { inner: out() };
        let sources = reachable(&back, &walk, VertexId(1), false).unwrap();
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec![VertexId(3)]);
        let ps = path_system(&back, &walk, VertexId(1)).unwrap();
        let hop = ps.hops().iter().next().unwrap();
        assert_eq!((hop.from, hop.edge, hop.to), (VertexId(1), EdgeId(3), VertexId(3)));
    }

    #[test]
    fn test_aborted_walk() {
        let g = graph();
        let abort = AbortHandle::new();
        abort.abort();
        let walk = Walk {
            view: GraphView::new(&g),
            abort: &abort,
        };
        assert_eq!(
            reachable(out().as_ref(), &walk, VertexId(1), false),
            Err(Error::Aborted)
        );
    }
}
