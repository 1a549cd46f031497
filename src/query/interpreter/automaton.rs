//! Path automaton
//!
//! A prepared path description is turned into a Thompson-style NFA whose
//! transitions either consume one hop, test the current vertex's class, or
//! move freely. Building with `reversed = true` yields the automaton of the
//! converse relation: sequences run back to front, hops use the converse
//! filter and start / goal restrictions trade places.

use crate::graph::{Direction, EdgeId, HopEnd, HopFilter};
use crate::schema::TypeCollection;
use smallvec::SmallVec;
use std::sync::Arc;

pub(crate) type StateId = usize;

/// One hop as written in the query, with its restriction resolved.
#[derive(Debug, Clone)]
pub(crate) struct HopSpec {
    pub direction: Direction,
    pub aggregation: Option<HopEnd>,
    pub role_end: HopEnd,
    pub types: Option<Arc<TypeCollection>>,
    pub edge: Option<EdgeId>,
}

impl HopSpec {
    pub fn new(
        direction: Direction,
        aggregation: Option<HopEnd>,
        types: Option<Arc<TypeCollection>>,
        edge: Option<EdgeId>,
    ) -> Self {
        Self {
            direction,
            aggregation,
            role_end: HopEnd::That,
            types,
            edge,
        }
    }

    fn converse(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            aggregation: self.aggregation.map(HopEnd::opposite),
            role_end: self.role_end.opposite(),
            types: self.types.clone(),
            edge: self.edge,
        }
    }

    pub fn filter(&self) -> HopFilter<'_> {
        HopFilter {
            direction: self.direction,
            aggregation: self.aggregation,
            role_end: self.role_end,
            types: self.types.as_deref(),
            edge: self.edge,
        }
    }
}

/// Path description after evaluation-time preparation: restrictions
/// resolved, edge expressions evaluated, exponents checked.
#[derive(Debug, Clone)]
pub(crate) struct PreparedPath {
    pub kind: PreparedKind,
    pub start: Option<Arc<TypeCollection>>,
    pub goal: Option<Arc<TypeCollection>>,
}

#[derive(Debug, Clone)]
pub(crate) enum PreparedKind {
    Hop(HopSpec),
    Sequence(Vec<PreparedPath>),
    Alternative(Vec<PreparedPath>),
    Optional(Box<PreparedPath>),
    Star(Box<PreparedPath>),
    Plus(Box<PreparedPath>),
    Exponent(Box<PreparedPath>, u32),
    Group(Box<PreparedPath>),
    Transposed(Box<PreparedPath>),
}

#[derive(Debug, Clone)]
pub(crate) enum Transition {
    Epsilon,
    Hop(HopSpec),
    /// Passes only if the current vertex's class is accepted
    Test(Arc<TypeCollection>),
}

#[derive(Debug)]
pub(crate) struct Automaton {
    transitions: Vec<SmallVec<[(Transition, StateId); 2]>>,
    initial: StateId,
    accepting: StateId,
}

impl Automaton {
    pub fn build(path: &PreparedPath, reversed: bool) -> Self {
        let mut builder = Builder {
            transitions: Vec::new(),
        };
        let (initial, accepting) = builder.fragment(path, reversed);
        Self {
            transitions: builder.transitions,
            initial,
            accepting,
        }
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn accepting(&self) -> StateId {
        self.accepting
    }

    pub fn transitions(&self, state: StateId) -> &[(Transition, StateId)] {
        &self.transitions[state]
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }
}

struct Builder {
    transitions: Vec<SmallVec<[(Transition, StateId); 2]>>,
}

impl Builder {
    fn state(&mut self) -> StateId {
        self.transitions.push(SmallVec::new());
        self.transitions.len() - 1
    }

    fn link(&mut self, from: StateId, transition: Transition, to: StateId) {
        self.transitions[from].push((transition, to));
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.link(from, Transition::Epsilon, to);
    }

    /// Fragment with one entry and one exit state.
    fn fragment(&mut self, path: &PreparedPath, reversed: bool) -> (StateId, StateId) {
        let (mut entry, mut exit) = self.core(&path.kind, reversed);
        let (first, last) = if reversed {
            (&path.goal, &path.start)
        } else {
            (&path.start, &path.goal)
        };
        if let Some(types) = first {
            let before = self.state();
            self.link(before, Transition::Test(types.clone()), entry);
            entry = before;
        }
        if let Some(types) = last {
            let after = self.state();
            self.link(exit, Transition::Test(types.clone()), after);
            exit = after;
        }
        (entry, exit)
    }

    fn chain(&mut self, mut items: Vec<&PreparedPath>, reversed: bool) -> (StateId, StateId) {
        if reversed {
            items.reverse();
        }
        let entry = self.state();
        let mut exit = entry;
        for item in items {
            let (s, e) = self.fragment(item, reversed);
            self.epsilon(exit, s);
            exit = e;
        }
        (entry, exit)
    }

    fn core(&mut self, kind: &PreparedKind, reversed: bool) -> (StateId, StateId) {
        match kind {
            PreparedKind::Hop(spec) => {
                let (s, e) = (self.state(), self.state());
                let spec = if reversed { spec.converse() } else { spec.clone() };
                self.link(s, Transition::Hop(spec), e);
                (s, e)
            }
            PreparedKind::Sequence(items) => self.chain(items.iter().collect(), reversed),
            PreparedKind::Exponent(inner, n) => {
                self.chain(vec![inner.as_ref(); *n as usize], reversed)
            }
            PreparedKind::Alternative(items) => {
                let (s, e) = (self.state(), self.state());
                for item in items {
                    let (fs, fe) = self.fragment(item, reversed);
                    self.epsilon(s, fs);
                    self.epsilon(fe, e);
                }
                (s, e)
            }
            PreparedKind::Optional(inner) => {
                let (s, e) = (self.state(), self.state());
                let (fs, fe) = self.fragment(inner, reversed);
                self.epsilon(s, fs);
                self.epsilon(fe, e);
                self.epsilon(s, e);
                (s, e)
            }
            PreparedKind::Star(inner) => {
                let (s, e) = (self.state(), self.state());
                let (fs, fe) = self.fragment(inner, reversed);
                self.epsilon(s, fs);
                self.epsilon(fe, fs);
                self.epsilon(fe, e);
                self.epsilon(s, e);
                (s, e)
            }
            PreparedKind::Plus(inner) => {
                let (s, e) = (self.state(), self.state());
                let (fs, fe) = self.fragment(inner, reversed);
                self.epsilon(s, fs);
                self.epsilon(fe, fs);
                self.epsilon(fe, e);
                (s, e)
            }
            PreparedKind::Group(inner) => self.fragment(inner, reversed),
            PreparedKind::Transposed(inner) => self.fragment(inner, !reversed),
        }
    }
}
