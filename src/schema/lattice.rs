//! Type lattice: resolution of type-restriction literals into type collections
//!
//! A restriction such as `{Junction, ^Plaza!, origin}` is a list of signed
//! tokens. `^` negates a token and a trailing `!` restricts it to exactly the
//! named class (subclasses excluded). The first token's sign decides how
//! unmatched types are treated, and the last matching token wins.

use super::class::{ClassId, ElementKind};
use super::schema::Schema;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeToken {
    pub negated: bool,
    pub exact: bool,
    pub name: String,
}

impl TypeToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            negated: false,
            exact: false,
            name: name.into(),
        }
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "^")?;
        }
        write!(f, "{}", self.name)?;
        if self.exact {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// Unresolved type-restriction literal as written in a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeExpression {
    pub tokens: Vec<TypeToken>,
}

impl TypeExpression {
    pub fn new(tokens: Vec<TypeToken>) -> Self {
        Self { tokens }
    }
}

impl fmt::Display for TypeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// `import` declarations of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    packages: Vec<String>,
    types: HashMap<String, String>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    /// `import pkg.*;`
    pub fn add_package(&mut self, package: impl Into<String>) {
        let package = package.into();
        if !self.packages.contains(&package) {
            self.packages.push(package);
        }
    }

    /// `import pkg.Type;`
    pub fn add_type(&mut self, qualified_name: impl Into<String>) {
        let qualified_name = qualified_name.into();
        let simple = match qualified_name.rfind('.') {
            Some(i) => qualified_name[i + 1..].to_string(),
            None => qualified_name.clone(),
        };
        self.types.insert(simple, qualified_name);
    }

    /// Every imported package and type must exist in the schema.
    pub fn check(&self, schema: &Schema) -> Result<()> {
        for package in &self.packages {
            if !schema.has_package(package) {
                return Err(Error::UnknownType(format!("unknown package '{}'", package)));
            }
        }
        for qualified in self.types.values() {
            if schema.class_by_name(qualified).is_none() {
                return Err(Error::UnknownType(format!("unknown type '{}'", qualified)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Class(ClassId),
    Role(String),
}

#[derive(Debug, Clone)]
struct Entry {
    accept: bool,
    exact: bool,
    target: Target,
}

/// Resolved, immutable type predicate over the classes of one schema.
#[derive(Debug, Clone)]
pub struct TypeCollection {
    kind: ElementKind,
    default_accept: bool,
    entries: Vec<Entry>,
}

impl TypeCollection {
    /// Collection accepting every class of `kind`.
    pub fn accept_all(kind: ElementKind) -> Self {
        Self {
            kind,
            default_accept: true,
            entries: Vec::new(),
        }
    }

    /// Resolve a restriction literal for vertex or edge classes.
    pub fn resolve(
        expression: &TypeExpression,
        schema: &Schema,
        imports: &Imports,
        kind: ElementKind,
    ) -> Result<Self> {
        let default_accept = expression.tokens.first().map_or(true, |t| t.negated);
        let mut entries = Vec::with_capacity(expression.tokens.len());
        for token in &expression.tokens {
            let target = resolve_name(&token.name, schema, imports, kind)?;
            entries.push(Entry {
                accept: !token.negated,
                exact: token.exact,
                target,
            });
        }
        trace!(restriction = %expression, ?kind, "type collection resolved");
        Ok(Self {
            kind,
            default_accept,
            entries,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    fn verdict(&self, schema: &Schema, class: ClassId, roles: &[String]) -> bool {
        let mut verdict = self.default_accept;
        for entry in &self.entries {
            let matches = match &entry.target {
                Target::Class(c) if entry.exact => class == *c,
                Target::Class(c) => schema.is_subclass_of(class, *c),
                Target::Role(r) => roles.iter().any(|role| role == r),
            };
            if matches {
                verdict = entry.accept;
            }
        }
        verdict
    }

    /// Class test; role tokens never match.
    pub fn accepts_class(&self, schema: &Schema, class: ClassId) -> bool {
        self.verdict(schema, class, &[])
    }

    /// Hop test: the edge's class plus the role set of the far-end incidence.
    pub fn accepts_hop(&self, schema: &Schema, edge_class: ClassId, far_roles: &[String]) -> bool {
        self.verdict(schema, edge_class, far_roles)
    }
}

fn kind_matches(schema: &Schema, class: ClassId, kind: ElementKind) -> bool {
    schema.class(class).kind() == kind
}

fn resolve_name(
    name: &str,
    schema: &Schema,
    imports: &Imports,
    kind: ElementKind,
) -> Result<Target> {
    let checked = |class: ClassId| -> Result<Target> {
        if kind_matches(schema, class, kind) {
            Ok(Target::Class(class))
        } else {
            Err(Error::UnknownType(format!(
                "'{}' is a {} class, expected a {} type",
                name,
                schema.class(class).kind(),
                kind
            )))
        }
    };

    if let Some(i) = name.rfind('.') {
        return match schema.class_by_name(name) {
            Some(class) => checked(class),
            None if !schema.has_package(&name[..i]) => Err(Error::UnknownType(format!(
                "unknown package '{}'",
                &name[..i]
            ))),
            None => Err(Error::UnknownType(format!("unknown type '{}'", name))),
        };
    }

    if let Some(qualified) = imports.types.get(name) {
        if let Some(class) = schema.class_by_name(qualified) {
            return checked(class);
        }
    }
    if let Some(class) = schema.class_by_name(name) {
        return checked(class);
    }

    let wildcard: Vec<ClassId> = imports
        .packages
        .iter()
        .filter_map(|p| schema.class_by_name(&format!("{}.{}", p, name)))
        .collect();
    match wildcard.as_slice() {
        [class] => return checked(*class),
        [] => {}
        _ => {
            return Err(Error::UnknownType(format!(
                "'{}' is ambiguous between imported packages",
                name
            )))
        }
    }

    let candidates: Vec<ClassId> = schema
        .classes_by_simple_name(name)
        .iter()
        .copied()
        .filter(|&c| kind_matches(schema, c, kind))
        .collect();
    match candidates.as_slice() {
        [class] => return Ok(Target::Class(*class)),
        [] => {}
        _ => {
            return Err(Error::UnknownType(format!(
                "simple name '{}' is ambiguous, use the qualified name",
                name
            )))
        }
    }

    if kind == ElementKind::Edge && schema.has_role(name) {
        return Ok(Target::Role(name.to_string()));
    }
    Err(Error::UnknownType(format!("unknown type or role '{}'", name)))
}

/// Per-execution cache of resolved restrictions, keyed by literal.
pub struct TypeCache<'s> {
    schema: &'s Schema,
    imports: &'s Imports,
    entries: DashMap<(ElementKind, TypeExpression), Arc<TypeCollection>>,
}

impl<'s> TypeCache<'s> {
    pub fn new(schema: &'s Schema, imports: &'s Imports) -> Self {
        Self {
            schema,
            imports,
            entries: DashMap::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn get(&self, expression: &TypeExpression, kind: ElementKind) -> Result<Arc<TypeCollection>> {
        let key = (kind, expression.clone());
        if let Some(hit) = self.entries.get(&key) {
            return Ok(hit.value().clone());
        }
        let collection = Arc::new(TypeCollection::resolve(
            expression,
            self.schema,
            self.imports,
            kind,
        )?);
        self.entries.insert(key, collection.clone());
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EndSpec, SchemaBuilder};

    fn schema() -> Schema {
        let mut b = SchemaBuilder::new("t.G");
        let junction = b.vertex_class("junctions.Junction").abstract_class().add().unwrap();
        let crossroad = b.vertex_class("junctions.Crossroad").superclass(junction).add().unwrap();
        b.vertex_class("junctions.Plaza").superclass(crossroad).add().unwrap();
        b.vertex_class("places.Town").add().unwrap();
        b.edge_class("connections.Street")
            .from(EndSpec::new(junction).role("from"))
            .to(EndSpec::new(junction).role("destination"))
            .add()
            .unwrap();
        b.build().unwrap()
    }

    fn expr(tokens: Vec<TypeToken>) -> TypeExpression {
        TypeExpression::new(tokens)
    }

    #[test]
    fn test_positive_and_negative_defaults() {
        let s = schema();
        let imports = Imports::new();
        let crossroad = s.class_by_name("junctions.Crossroad").unwrap();
        let plaza = s.class_by_name("junctions.Plaza").unwrap();
        let town = s.class_by_name("places.Town").unwrap();

        let tc = TypeCollection::resolve(&expr(vec![TypeToken::new("Crossroad")]), &s, &imports, ElementKind::Vertex).unwrap();
        assert!(tc.accepts_class(&s, crossroad));
        assert!(tc.accepts_class(&s, plaza));
        assert!(!tc.accepts_class(&s, town));

        let tc = TypeCollection::resolve(&expr(vec![TypeToken::new("Crossroad").negated()]), &s, &imports, ElementKind::Vertex).unwrap();
        assert!(!tc.accepts_class(&s, plaza));
        assert!(tc.accepts_class(&s, town));
    }

    #[test]
    fn test_exact_and_last_token_wins() {
        let s = schema();
        let imports = Imports::new();
        let crossroad = s.class_by_name("junctions.Crossroad").unwrap();
        let plaza = s.class_by_name("junctions.Plaza").unwrap();

        let tc = TypeCollection::resolve(&expr(vec![TypeToken::new("Crossroad").exact()]), &s, &imports, ElementKind::Vertex).unwrap();
        assert!(tc.accepts_class(&s, crossroad));
        assert!(!tc.accepts_class(&s, plaza));

        let tc = TypeCollection::resolve(
            &expr(vec![TypeToken::new("Junction"), TypeToken::new("Plaza").negated()]),
            &s,
            &imports,
            ElementKind::Vertex,
        )
        .unwrap();
        assert!(tc.accepts_class(&s, crossroad));
        assert!(!tc.accepts_class(&s, plaza));
    }

    #[test]
    fn test_roles_and_kinds() {
        let s = schema();
        let imports = Imports::new();
        let street = s.class_by_name("connections.Street").unwrap();
        let far = s.to_incidence(street).unwrap().id();
        let near = s.from_incidence(street).unwrap().id();

        let tc = TypeCollection::resolve(&expr(vec![TypeToken::new("destination")]), &s, &imports, ElementKind::Edge).unwrap();
        assert!(tc.accepts_hop(&s, street, s.role_set(far)));
        assert!(!tc.accepts_hop(&s, street, s.role_set(near)));

        assert!(matches!(
            TypeCollection::resolve(&expr(vec![TypeToken::new("destination")]), &s, &imports, ElementKind::Vertex),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            TypeCollection::resolve(&expr(vec![TypeToken::new("Street")]), &s, &imports, ElementKind::Vertex),
            Err(Error::UnknownType(_))
        ));
        assert!(matches!(
            TypeCollection::resolve(&expr(vec![TypeToken::new("nowhere.Street")]), &s, &imports, ElementKind::Edge),
            Err(Error::UnknownType(_))
        ));
    }

    #[test]
    fn test_imports() {
        let s = schema();
        let mut imports = Imports::new();
        imports.add_package("junctions");
        assert!(imports.check(&s).is_ok());
        let tc = TypeCollection::resolve(&expr(vec![TypeToken::new("Plaza")]), &s, &imports, ElementKind::Vertex);
        assert!(tc.is_ok());

        imports.add_package("nowhere");
        assert!(matches!(imports.check(&s), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_cache_reuses_collections() {
        let s = schema();
        let imports = Imports::new();
        let cache = TypeCache::new(&s, &imports);
        let e = expr(vec![TypeToken::new("Junction")]);
        let a = cache.get(&e, ElementKind::Vertex).unwrap();
        let b = cache.get(&e, ElementKind::Vertex).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&expr(vec![TypeToken::new("Nope")]), ElementKind::Vertex).is_err());
        assert_eq!(cache.len(), 1);
    }
}
