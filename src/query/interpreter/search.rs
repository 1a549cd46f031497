//! Search over the product of graph view and path automaton
//!
//! States are `(vertex, automaton state)` pairs. Hops cost one, epsilon
//! moves and vertex tests cost nothing, so a 0-1 breadth-first search
//! yields the minimum accepted walk length for every reached vertex.

use super::automaton::{Automaton, StateId, Transition};
use crate::algorithm::{Hop, PathSystem};
use crate::error::Result;
use crate::graph::{EdgeId, GraphView, VertexId};
use crate::metrics::global_metrics;
use crate::query::AbortHandle;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::trace;

type ProductState = (VertexId, StateId);

/// A move of the product graph that was generated while exploring.
struct Move {
    from: ProductState,
    edge: Option<EdgeId>,
    to: ProductState,
}

struct Exploration {
    distances: HashMap<ProductState, usize>,
    moves: Vec<Move>,
    found: bool,
}

fn successors(
    view: &GraphView<'_>,
    automaton: &Automaton,
    (vertex, state): ProductState,
    out: &mut Vec<(Option<EdgeId>, ProductState)>,
) {
    out.clear();
    for (transition, next) in automaton.transitions(state) {
        match transition {
            Transition::Epsilon => out.push((None, (vertex, *next))),
            Transition::Test(types) => {
                let graph = view.graph();
                let accepted = graph
                    .vertex_class(vertex)
                    .map_or(false, |class| types.accepts_class(graph.schema(), class));
                if accepted {
                    out.push((None, (vertex, *next)));
                }
            }
            Transition::Hop(spec) => {
                let filter = spec.filter();
                out.extend(
                    view.hops(vertex, &filter)
                        .map(|(edge, reached)| (Some(edge), (reached, *next))),
                );
            }
        }
    }
}

/// 0-1 BFS from `(start, initial)`. Stops as soon as `goal` is popped in
/// the accepting state; records every generated move when asked to.
fn explore(
    view: &GraphView<'_>,
    automaton: &Automaton,
    start: VertexId,
    goal: Option<VertexId>,
    record: bool,
    abort: &AbortHandle,
) -> Result<Exploration> {
    let mut result = Exploration {
        distances: HashMap::new(),
        moves: Vec::new(),
        found: false,
    };
    if !view.contains_vertex(start) {
        return Ok(result);
    }

    let accepting = automaton.accepting();
    let initial = (start, automaton.initial());
    let mut expanded: HashSet<ProductState> = HashSet::new();
    let mut queue = VecDeque::new();
    let mut next = Vec::new();
    result.distances.insert(initial, 0);
    queue.push_back(initial);

    while let Some(current) = queue.pop_front() {
        if !expanded.insert(current) {
            continue;
        }
        abort.check()?;
        if goal == Some(current.0) && current.1 == accepting {
            result.found = true;
            break;
        }
        let distance = result.distances[&current];
        successors(view, automaton, current, &mut next);
        for &(edge, target) in &next {
            if record {
                result.moves.push(Move {
                    from: current,
                    edge,
                    to: target,
                });
            }
            let cost = if edge.is_some() { 1 } else { 0 };
            let candidate = distance + cost;
            let improved = result
                .distances
                .get(&target)
                .map_or(true, |&known| candidate < known);
            if improved {
                result.distances.insert(target, candidate);
                if cost == 0 {
                    queue.push_front(target);
                } else {
                    queue.push_back(target);
                }
            }
        }
    }

    global_metrics().record_path_search(result.distances.len());
    trace!(
        start = %start,
        states = result.distances.len(),
        automaton = automaton.state_count(),
        "product search finished"
    );
    Ok(result)
}

fn accepted(exploration: &Exploration, automaton: &Automaton) -> BTreeMap<VertexId, usize> {
    let accepting = automaton.accepting();
    exploration
        .distances
        .iter()
        .filter(|((_, state), _)| *state == accepting)
        .map(|(&(vertex, _), &distance)| (vertex, distance))
        .collect()
}

/// Is there an accepted walk from `start` to `target`?
pub(crate) fn reaches(
    view: &GraphView<'_>,
    automaton: &Automaton,
    start: VertexId,
    target: VertexId,
    abort: &AbortHandle,
) -> Result<bool> {
    Ok(explore(view, automaton, start, Some(target), false, abort)?.found)
}

/// End vertices of all accepted walks from `start`.
pub(crate) fn reachable(
    view: &GraphView<'_>,
    automaton: &Automaton,
    start: VertexId,
    abort: &AbortHandle,
) -> Result<BTreeSet<VertexId>> {
    let exploration = explore(view, automaton, start, None, false, abort)?;
    Ok(accepted(&exploration, automaton).into_keys().collect())
}

/// Path system rooted at `root`: leaves with their minimum distance, plus
/// every hop on some accepted walk. A hop qualifies when its move leaves a
/// forward-reached state and enters a state that can still reach acceptance.
pub(crate) fn path_system(
    view: &GraphView<'_>,
    automaton: &Automaton,
    root: VertexId,
    abort: &AbortHandle,
) -> Result<PathSystem> {
    let exploration = explore(view, automaton, root, None, true, abort)?;
    let leaves = accepted(&exploration, automaton);

    let mut predecessors: HashMap<ProductState, Vec<usize>> = HashMap::new();
    for (index, m) in exploration.moves.iter().enumerate() {
        predecessors.entry(m.to).or_default().push(index);
    }

    let accepting = automaton.accepting();
    let mut live: HashSet<ProductState> = leaves.keys().map(|&v| (v, accepting)).collect();
    let mut stack: Vec<ProductState> = live.iter().copied().collect();
    while let Some(state) = stack.pop() {
        abort.check()?;
        for &index in predecessors.get(&state).into_iter().flatten() {
            let from = exploration.moves[index].from;
            if live.insert(from) {
                stack.push(from);
            }
        }
    }

    let hops: BTreeSet<Hop> = exploration
        .moves
        .iter()
        .filter(|m| live.contains(&m.to))
        .filter_map(|m| m.edge.map(|edge| Hop::new(m.from.0, edge, m.to.0)))
        .collect();
    Ok(PathSystem::new(root, hops, leaves))
}

#[cfg(test)]
mod tests {
    use super::super::automaton::{HopSpec, PreparedKind, PreparedPath};
    use super::*;
    use crate::graph::{Direction, Graph};
    use crate::schema::{EndSpec, SchemaBuilder};
    use std::sync::Arc;

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

    fn out() -> PreparedPath {
        PreparedPath {
            kind: PreparedKind::Hop(HopSpec::new(Direction::Out, None, None, None)),
            start: None,
            goal: None,
        }
    }

    fn wrap(kind: PreparedKind) -> PreparedPath {
        PreparedPath {
            kind,
            start: None,
            goal: None,
        }
    }

    #[test]
    fn test_star_distances() {
        let g = graph();
        let view = GraphView::new(&g);
        let automaton = Automaton::build(&wrap(PreparedKind::Star(Box::new(out()))), false);
        let ps = path_system(&view, &automaton, VertexId(1), &AbortHandle::new()).unwrap();
        assert_eq!(ps.distance(VertexId(1)), Some(0));
        assert_eq!(ps.distance(VertexId(4)), Some(3));
        assert_eq!(ps.hops().len(), 4);
    }

    #[test]
    fn test_exact_length_hops() {
        let g = graph();
        let view = GraphView::new(&g);
        let automaton = Automaton::build(&wrap(PreparedKind::Exponent(Box::new(out()), 2)), false);
        let ps = path_system(&view, &automaton, VertexId(1), &AbortHandle::new()).unwrap();
        assert_eq!(ps.leaves().collect::<Vec<_>>(), vec![VertexId(3)]);
        assert_eq!(
            ps.hops().iter().map(|h| h.edge).collect::<Vec<_>>(),
            vec![EdgeId(1), EdgeId(2)]
        );
        assert!(reaches(&view, &automaton, VertexId(1), VertexId(3), &AbortHandle::new()).unwrap());
        assert!(!reaches(&view, &automaton, VertexId(1), VertexId(4), &AbortHandle::new()).unwrap());
    }

    #[test]
    fn test_backward_automaton() {
        let g = graph();
        let view = GraphView::new(&g);
        let automaton = Automaton::build(&out(), true);
        let sources = reachable(&view, &automaton, VertexId(1), &AbortHandle::new()).unwrap();
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec![VertexId(3)]);
    }

    #[test]
    fn test_aborted_search() {
        let g = graph();
        let view = GraphView::new(&g);
        let automaton = Automaton::build(&out(), false);
        let abort = AbortHandle::new();
        abort.abort();
        assert!(reachable(&view, &automaton, VertexId(1), &abort).is_err());
    }
}
