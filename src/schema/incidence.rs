//! Incidence classes: the two typed ends of every edge class

use super::class::ClassId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncidenceId(pub u32);

impl IncidenceId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which end of the edge class an incidence class describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidenceDirection {
    /// alpha end
    From,
    /// omega end
    To,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    #[default]
    None,
    Shared,
    Composite,
}

impl AggregationKind {
    pub fn is_aggregation(self) -> bool {
        self != AggregationKind::None
    }
}

/// `[min, max]`, `max = None` meaning unbounded (`*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Multiplicity {
    pub min: u32,
    pub max: Option<u32>,
}

impl Multiplicity {
    pub const ANY: Multiplicity = Multiplicity { min: 0, max: None };

    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    pub fn contains(&self, count: usize) -> bool {
        count >= self.min as usize && self.max.map_or(true, |max| count <= max as usize)
    }

    /// Whether this range lies inside `other`.
    pub fn is_within(&self, other: &Multiplicity) -> bool {
        if self.min < other.min {
            return false;
        }
        match (self.max, other.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a <= b,
        }
    }
}

impl Default for Multiplicity {
    fn default() -> Self {
        Self::ANY
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{},{}]", self.min, max),
            None => write!(f, "[{},*]", self.min),
        }
    }
}

/// One end of an edge class.
#[derive(Debug, Clone)]
pub struct IncidenceClass {
    pub(crate) id: IncidenceId,
    pub(crate) edge_class: ClassId,
    pub(crate) direction: IncidenceDirection,
    pub(crate) vertex_class: ClassId,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) role: Option<String>,
    pub(crate) aggregation: AggregationKind,
    pub(crate) subsets: SmallVec<[IncidenceId; 2]>,
    pub(crate) redefines: SmallVec<[IncidenceId; 1]>,
}

impl IncidenceClass {
    pub fn id(&self) -> IncidenceId {
        self.id
    }

    pub fn edge_class(&self) -> ClassId {
        self.edge_class
    }

    pub fn direction(&self) -> IncidenceDirection {
        self.direction
    }

    pub fn vertex_class(&self) -> ClassId {
        self.vertex_class
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn aggregation(&self) -> AggregationKind {
        self.aggregation
    }

    pub fn subsets(&self) -> &[IncidenceId] {
        &self.subsets
    }

    pub fn redefines(&self) -> &[IncidenceId] {
        &self.redefines
    }
}

/// Description of an edge-class end handed to the schema builder.
#[derive(Debug, Clone)]
pub struct EndSpec {
    pub vertex_class: ClassId,
    pub multiplicity: Multiplicity,
    pub role: Option<String>,
    pub aggregation: AggregationKind,
    pub redefines: Vec<IncidenceId>,
}

impl EndSpec {
    pub fn new(vertex_class: ClassId) -> Self {
        Self {
            vertex_class,
            multiplicity: Multiplicity::ANY,
            role: None,
            aggregation: AggregationKind::None,
            redefines: Vec::new(),
        }
    }

    pub fn multiplicity(mut self, min: u32, max: Option<u32>) -> Self {
        self.multiplicity = Multiplicity::new(min, max);
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn aggregation(mut self, kind: AggregationKind) -> Self {
        self.aggregation = kind;
        self
    }

    pub fn redefines(mut self, incidence: IncidenceId) -> Self {
        self.redefines.push(incidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity() {
        let m = Multiplicity::new(1, Some(3));
        assert!(m.contains(1) && m.contains(3));
        assert!(!m.contains(0) && !m.contains(4));
        assert!(m.is_within(&Multiplicity::ANY));
        assert!(!Multiplicity::ANY.is_within(&m));
        assert!(Multiplicity::new(2, Some(2)).is_within(&m));
        assert!(!Multiplicity::new(3, Some(1)).is_valid());
        assert_eq!(Multiplicity::ANY.to_string(), "[0,*]");
    }
}
