//! grUML schema: element classes, incidence classes, attribute domains and
//! the type lattice used by query type restrictions

pub mod class;
pub mod domain;
pub mod incidence;
pub mod lattice;
#[allow(clippy::module_inception)]
pub mod schema;

pub use class::{Attribute, ClassId, Constraint, ElementClass, ElementKind};
pub use domain::Domain;
pub use incidence::{
    AggregationKind, EndSpec, IncidenceClass, IncidenceDirection, IncidenceId, Multiplicity,
};
pub use lattice::{Imports, TypeCache, TypeCollection, TypeExpression, TypeToken};
pub use schema::{ClassDraft, Schema, SchemaBuilder, EDGE_ROOT, VERTEX_ROOT};
