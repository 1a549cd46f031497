//! Element classes (vertex, edge and graph classes)

use super::domain::Domain;
use super::incidence::IncidenceId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Index of a class inside its schema's class arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What kind of element a class describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Graph,
    Vertex,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Graph => write!(f, "graph"),
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// An attribute declared by a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub domain: Domain,
}

impl Attribute {
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// A constraint attached to a single class. Constraints are not inherited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub message: String,
    /// Boolean GReQL query that must hold.
    pub predicate: String,
    /// Optional GReQL query listing the offending elements.
    #[serde(default)]
    pub offending_elements: Option<String>,
}

/// A vertex, edge or graph class.
#[derive(Debug, Clone)]
pub struct ElementClass {
    pub(crate) id: ClassId,
    pub(crate) kind: ElementKind,
    pub(crate) qualified_name: String,
    pub(crate) is_abstract: bool,
    pub(crate) superclasses: SmallVec<[ClassId; 2]>,
    pub(crate) subclasses: SmallVec<[ClassId; 4]>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) constraints: Vec<Constraint>,
    /// Alpha end of an edge class.
    pub(crate) from: Option<IncidenceId>,
    /// Omega end of an edge class.
    pub(crate) to: Option<IncidenceId>,
}

impl ElementClass {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Package part of the qualified name, empty for the default package.
    pub fn package(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(i) => &self.qualified_name[..i],
            None => "",
        }
    }

    pub fn simple_name(&self) -> &str {
        match self.qualified_name.rfind('.') {
            Some(i) => &self.qualified_name[i + 1..],
            None => &self.qualified_name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Direct superclasses in declaration order.
    pub fn superclasses(&self) -> &[ClassId] {
        &self.superclasses
    }

    pub fn subclasses(&self) -> &[ClassId] {
        &self.subclasses
    }

    /// Attributes declared by this class only.
    pub fn own_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn from_incidence(&self) -> Option<IncidenceId> {
        self.from
    }

    pub fn to_incidence(&self) -> Option<IncidenceId> {
        self.to
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}
