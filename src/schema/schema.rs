//! Schema: class arena, incidence classes and cached subclass closures

use super::class::{Attribute, ClassId, Constraint, ElementClass, ElementKind};
use super::domain::Domain;
use super::incidence::{
    AggregationKind, EndSpec, IncidenceClass, IncidenceDirection, IncidenceId,
};
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Name of the default vertex class every vertex class specializes.
pub const VERTEX_ROOT: &str = "Vertex";
/// Name of the default edge class every edge class specializes.
pub const EDGE_ROOT: &str = "Edge";

/// Derived, lazily computed relations. Dropped on every schema edit.
#[derive(Debug, Clone)]
struct Closures {
    /// all proper superclasses, sorted
    supers: Vec<Vec<ClassId>>,
    /// all proper subclasses, sorted
    subs: Vec<Vec<ClassId>>,
    /// inherited attribute set: name -> (declaring class, index)
    attributes: Vec<BTreeMap<String, (ClassId, usize)>>,
    /// own and redefined role names of each incidence class
    role_sets: Vec<SmallVec<[String; 1]>>,
}

/// A validated grUML schema.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    classes: Vec<ElementClass>,
    incidences: Vec<IncidenceClass>,
    by_name: HashMap<String, ClassId>,
    by_simple_name: HashMap<String, SmallVec<[ClassId; 1]>>,
    packages: BTreeSet<String>,
    roles: HashSet<String>,
    graph_class: ClassId,
    vertex_root: ClassId,
    edge_root: ClassId,
    version: u64,
    closures: OnceCell<Closures>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incremented on every successful edit.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn graph_class(&self) -> ClassId {
        self.graph_class
    }

    pub fn vertex_root(&self) -> ClassId {
        self.vertex_root
    }

    pub fn edge_root(&self) -> ClassId {
        self.edge_root
    }

    pub fn class(&self, id: ClassId) -> &ElementClass {
        &self.classes[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = &ElementClass> {
        self.classes.iter()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn vertex_classes(&self) -> impl Iterator<Item = &ElementClass> {
        self.classes
            .iter()
            .filter(|c| c.kind() == ElementKind::Vertex)
    }

    pub fn edge_classes(&self) -> impl Iterator<Item = &ElementClass> {
        self.classes.iter().filter(|c| c.kind() == ElementKind::Edge)
    }

    /// Lookup by qualified name.
    pub fn class_by_name(&self, qualified_name: &str) -> Option<ClassId> {
        self.by_name.get(qualified_name).copied()
    }

    /// All classes whose simple name is `simple_name`.
    pub fn classes_by_simple_name(&self, simple_name: &str) -> &[ClassId] {
        self.by_simple_name
            .get(simple_name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_package(&self, package: &str) -> bool {
        package.is_empty() || self.packages.contains(package)
    }

    /// Whether some incidence class carries this role name.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn incidence(&self, id: IncidenceId) -> &IncidenceClass {
        &self.incidences[id.index()]
    }

    pub fn incidences(&self) -> impl Iterator<Item = &IncidenceClass> {
        self.incidences.iter()
    }

    /// Alpha-end incidence class of an edge class.
    pub fn from_incidence(&self, edge_class: ClassId) -> Option<&IncidenceClass> {
        self.class(edge_class).from.map(|i| self.incidence(i))
    }

    /// Omega-end incidence class of an edge class.
    pub fn to_incidence(&self, edge_class: ClassId) -> Option<&IncidenceClass> {
        self.class(edge_class).to.map(|i| self.incidence(i))
    }

    fn closures(&self) -> &Closures {
        self.closures.get_or_init(|| {
            debug!(schema = %self.name, version = self.version, "computing schema closures");
            compute_closures(&self.classes, &self.incidences)
        })
    }

    pub fn all_superclasses(&self, id: ClassId) -> &[ClassId] {
        &self.closures().supers[id.index()]
    }

    pub fn all_subclasses(&self, id: ClassId) -> &[ClassId] {
        &self.closures().subs[id.index()]
    }

    /// Reflexive subclass test.
    pub fn is_subclass_of(&self, class: ClassId, superclass: ClassId) -> bool {
        class == superclass
            || self.closures().supers[class.index()]
                .binary_search(&superclass)
                .is_ok()
    }

    /// Look up an attribute in the inherited attribute set.
    pub fn attribute(&self, class: ClassId, name: &str) -> Option<&Attribute> {
        self.closures().attributes[class.index()]
            .get(name)
            .map(|&(owner, i)| &self.class(owner).attributes[i])
    }

    /// The inherited attribute set, sorted by name.
    pub fn attributes(&self, class: ClassId) -> Vec<&Attribute> {
        self.closures().attributes[class.index()]
            .values()
            .map(|&(owner, i)| &self.class(owner).attributes[i])
            .collect()
    }

    /// Own role name plus the role names of all redefined incidences.
    pub fn role_set(&self, incidence: IncidenceId) -> &[String] {
        &self.closures().role_sets[incidence.index()]
    }

    // ==================== 编辑 ====================

    fn invalidate(&mut self) {
        self.version += 1;
        self.closures = OnceCell::new();
        debug!(schema = %self.name, version = self.version, "schema edited, closures dropped");
    }

    /// Add an attribute to an existing class.
    pub fn add_attribute(&mut self, class: ClassId, attribute: Attribute) -> Result<()> {
        self.classes[class.index()].attributes.push(attribute);
        self.invalidate();
        if let Err(e) = check_attribute_uniqueness(self) {
            self.classes[class.index()].attributes.pop();
            self.invalidate();
            return Err(e);
        }
        Ok(())
    }

    /// Add a superclass edge to the inheritance DAG.
    pub fn add_superclass(&mut self, class: ClassId, superclass: ClassId) -> Result<()> {
        if self.class(class).kind != self.class(superclass).kind {
            return Err(Error::SchemaError(format!(
                "{} cannot specialize {}: different element kinds",
                self.class(class),
                self.class(superclass)
            )));
        }
        if self.class(class).superclasses.contains(&superclass) {
            return Ok(());
        }
        self.classes[class.index()].superclasses.push(superclass);
        self.classes[superclass.index()].subclasses.push(class);
        self.invalidate();
        let checked = check_acyclic(&self.classes).and_then(|_| check_attribute_uniqueness(self));
        if let Err(e) = checked {
            self.classes[class.index()].superclasses.pop();
            self.classes[superclass.index()].subclasses.pop();
            self.invalidate();
            return Err(e);
        }
        Ok(())
    }

    pub fn add_constraint(&mut self, class: ClassId, constraint: Constraint) {
        self.classes[class.index()].constraints.push(constraint);
        self.invalidate();
    }
}

fn compute_closures(classes: &[ElementClass], incidences: &[IncidenceClass]) -> Closures {
    let n = classes.len();
    let mut supers = vec![Vec::new(); n];
    for class in classes {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<ClassId> = class.superclasses.to_vec();
        while let Some(s) = stack.pop() {
            if s != class.id && seen.insert(s) {
                stack.extend(classes[s.index()].superclasses.iter().copied());
            }
        }
        supers[class.id.index()] = seen.into_iter().collect();
    }

    let mut subs = vec![Vec::new(); n];
    for (i, list) in supers.iter().enumerate() {
        for s in list {
            subs[s.index()].push(ClassId(i as u32));
        }
    }

    let mut attributes = Vec::with_capacity(n);
    for class in classes {
        let mut map = BTreeMap::new();
        for owner in std::iter::once(class.id).chain(supers[class.id.index()].iter().copied()) {
            for (i, attr) in classes[owner.index()].attributes.iter().enumerate() {
                map.entry(attr.name.clone()).or_insert((owner, i));
            }
        }
        attributes.push(map);
    }

    let mut role_sets = Vec::with_capacity(incidences.len());
    for inc in incidences {
        let mut roles: SmallVec<[String; 1]> = SmallVec::new();
        let mut stack = vec![inc.id];
        let mut seen = HashSet::new();
        while let Some(i) = stack.pop() {
            if !seen.insert(i) {
                continue;
            }
            let current = &incidences[i.index()];
            if let Some(role) = &current.role {
                if !roles.contains(role) {
                    roles.push(role.clone());
                }
            }
            stack.extend(current.redefines.iter().copied());
        }
        role_sets.push(roles);
    }

    Closures {
        supers,
        subs,
        attributes,
        role_sets,
    }
}

// ==================== 校验 ====================

fn check_acyclic(classes: &[ElementClass]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Fresh,
        Active,
        Done,
    }

    fn visit(classes: &[ElementClass], id: ClassId, marks: &mut [Mark]) -> Result<()> {
        match marks[id.index()] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                return Err(Error::SchemaError(format!(
                    "inheritance cycle through {}",
                    classes[id.index()]
                )))
            }
            Mark::Fresh => {}
        }
        marks[id.index()] = Mark::Active;
        for &s in &classes[id.index()].superclasses {
            visit(classes, s, marks)?;
        }
        marks[id.index()] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Fresh; classes.len()];
    for class in classes {
        visit(classes, class.id, &mut marks)?;
    }
    Ok(())
}

fn check_attribute_uniqueness(schema: &Schema) -> Result<()> {
    for class in &schema.classes {
        let mut owners: HashMap<&str, ClassId> = HashMap::new();
        let lineage = std::iter::once(class.id).chain(schema.all_superclasses(class.id).iter().copied());
        for owner in lineage {
            for attr in &schema.class(owner).attributes {
                match owners.get(attr.name.as_str()) {
                    Some(&previous) if previous != owner => {
                        return Err(Error::SchemaError(format!(
                            "attribute '{}' of {} is declared by both {} and {}",
                            attr.name,
                            class,
                            schema.class(previous),
                            schema.class(owner)
                        )))
                    }
                    Some(_) => {
                        return Err(Error::SchemaError(format!(
                            "attribute '{}' declared twice in {}",
                            attr.name,
                            schema.class(owner)
                        )))
                    }
                    None => {
                        owners.insert(&attr.name, owner);
                    }
                }
            }
        }
    }
    Ok(())
}

fn subsets_transitively(schema: &Schema, a: IncidenceId, b: IncidenceId) -> bool {
    let mut stack = vec![a];
    let mut seen = HashSet::new();
    while let Some(i) = stack.pop() {
        if i == b {
            return true;
        }
        if seen.insert(i) {
            stack.extend(schema.incidence(i).subsets.iter().copied());
        }
    }
    false
}

fn check_incidences(schema: &Schema) -> Result<()> {
    for class in schema.edge_classes() {
        let (Some(from), Some(to)) = (class.from, class.to) else {
            return Err(Error::SchemaError(format!(
                "edge class {} has no incidence classes",
                class
            )));
        };
        let composites = [from, to]
            .iter()
            .filter(|&&i| schema.incidence(i).aggregation == AggregationKind::Composite)
            .count();
        if composites > 1 {
            return Err(Error::SchemaError(format!(
                "edge class {} has two composite ends",
                class
            )));
        }
    }

    for inc in &schema.incidences {
        let edge_class = schema.class(inc.edge_class);
        if !inc.multiplicity.is_valid() {
            return Err(Error::SchemaError(format!(
                "invalid multiplicity {} on {}",
                inc.multiplicity, edge_class
            )));
        }
        for &sup in &inc.subsets {
            let sup_inc = schema.incidence(sup);
            if !schema.is_subclass_of(inc.vertex_class, sup_inc.vertex_class) {
                return Err(Error::SchemaError(format!(
                    "{} end of {} connects {} which is not a subclass of {}",
                    direction_name(inc.direction),
                    edge_class,
                    schema.class(inc.vertex_class),
                    schema.class(sup_inc.vertex_class)
                )));
            }
        }
        for &red in &inc.redefines {
            let redefined = schema.incidence(red);
            if redefined.edge_class == inc.edge_class
                || !schema.is_subclass_of(inc.edge_class, redefined.edge_class)
            {
                return Err(Error::SchemaError(format!(
                    "{} can only redefine ends of its superclasses",
                    edge_class
                )));
            }
            if redefined.direction != inc.direction {
                return Err(Error::SchemaError(format!(
                    "{} redefines an end of the opposite direction",
                    edge_class
                )));
            }
            if !inc.multiplicity.is_within(&redefined.multiplicity) {
                return Err(Error::SchemaError(format!(
                    "redefining end of {} widens multiplicity {} to {}",
                    edge_class, redefined.multiplicity, inc.multiplicity
                )));
            }
            if !schema.is_subclass_of(inc.vertex_class, redefined.vertex_class) {
                return Err(Error::SchemaError(format!(
                    "redefining end of {} must connect a subclass of {}",
                    edge_class,
                    schema.class(redefined.vertex_class)
                )));
            }
        }
    }
    Ok(())
}

fn direction_name(direction: IncidenceDirection) -> &'static str {
    match direction {
        IncidenceDirection::From => "from",
        IncidenceDirection::To => "to",
    }
}

/// The same role may not lead to the same far-end vertex class through two
/// unrelated non-abstract edge classes from one vertex class (or its subclasses).
fn check_role_clashes(schema: &Schema) -> Result<()> {
    struct Reach {
        near_class: ClassId,
        far_class: ClassId,
        far: IncidenceId,
        edge_class: ClassId,
    }

    let mut by_role: BTreeMap<&str, Vec<Reach>> = BTreeMap::new();
    for class in schema.edge_classes().filter(|c| !c.is_abstract) {
        let (Some(from), Some(to)) = (class.from, class.to) else {
            continue;
        };
        for (near, far) in [(from, to), (to, from)] {
            let far_inc = schema.incidence(far);
            if let Some(role) = far_inc.role.as_deref() {
                by_role.entry(role).or_default().push(Reach {
                    near_class: schema.incidence(near).vertex_class,
                    far_class: far_inc.vertex_class,
                    far,
                    edge_class: class.id,
                });
            }
        }
    }

    for (role, reaches) in &by_role {
        for (i, a) in reaches.iter().enumerate() {
            for b in &reaches[i + 1..] {
                if a.edge_class == b.edge_class || a.far_class != b.far_class {
                    continue;
                }
                let related_near = schema.is_subclass_of(a.near_class, b.near_class)
                    || schema.is_subclass_of(b.near_class, a.near_class);
                let related_ends = subsets_transitively(schema, a.far, b.far)
                    || subsets_transitively(schema, b.far, a.far);
                if related_near && !related_ends {
                    return Err(Error::SchemaError(format!(
                        "role '{}' reaches {} through both {} and {}",
                        role,
                        schema.class(a.far_class),
                        schema.class(a.edge_class),
                        schema.class(b.edge_class)
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate(schema: &Schema) -> Result<()> {
    check_acyclic(&schema.classes)?;
    check_attribute_uniqueness(schema)?;
    check_incidences(schema)?;
    check_role_clashes(schema)?;
    Ok(())
}

fn is_valid_qualified_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .map_or(false, |c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

// ==================== 构建器 ====================

/// Incrementally declares classes, then validates everything in [`SchemaBuilder::build`].
pub struct SchemaBuilder {
    name: String,
    classes: Vec<ElementClass>,
    incidences: Vec<IncidenceClass>,
    by_name: HashMap<String, ClassId>,
}

impl SchemaBuilder {
    /// `name` becomes the qualified name of the schema's graph class.
    pub fn new(name: impl Into<String>) -> Self {
        let mut builder = Self {
            name: name.into(),
            classes: Vec::new(),
            incidences: Vec::new(),
            by_name: HashMap::new(),
        };
        let graph_name = builder.name.clone();
        builder.push_class(ElementKind::Graph, graph_name, false, SmallVec::new());
        let vertex = builder.push_class(ElementKind::Vertex, VERTEX_ROOT.into(), true, SmallVec::new());
        let edge = builder.push_class(ElementKind::Edge, EDGE_ROOT.into(), true, SmallVec::new());
        let from = builder.push_incidence(edge, IncidenceDirection::From, EndSpec::new(vertex), SmallVec::new());
        let to = builder.push_incidence(edge, IncidenceDirection::To, EndSpec::new(vertex), SmallVec::new());
        builder.classes[edge.index()].from = Some(from);
        builder.classes[edge.index()].to = Some(to);
        builder
    }

    pub fn graph_class(&self) -> ClassId {
        ClassId(0)
    }

    pub fn vertex_root(&self) -> ClassId {
        ClassId(1)
    }

    pub fn edge_root(&self) -> ClassId {
        ClassId(2)
    }

    pub fn class_by_name(&self, qualified_name: &str) -> Option<ClassId> {
        self.by_name.get(qualified_name).copied()
    }

    pub fn from_incidence(&self, edge_class: ClassId) -> Option<IncidenceId> {
        self.classes.get(edge_class.index()).and_then(|c| c.from)
    }

    pub fn to_incidence(&self, edge_class: ClassId) -> Option<IncidenceId> {
        self.classes.get(edge_class.index()).and_then(|c| c.to)
    }

    /// Start declaring a vertex class.
    pub fn vertex_class(&mut self, qualified_name: impl Into<String>) -> ClassDraft<'_> {
        ClassDraft::new(self, ElementKind::Vertex, qualified_name.into())
    }

    /// Start declaring an edge class.
    pub fn edge_class(&mut self, qualified_name: impl Into<String>) -> ClassDraft<'_> {
        ClassDraft::new(self, ElementKind::Edge, qualified_name.into())
    }

    /// Declare an attribute of the graph class.
    pub fn graph_attribute(&mut self, name: impl Into<String>, domain: Domain) {
        self.classes[0].attributes.push(Attribute::new(name, domain));
    }

    pub fn add_constraint(&mut self, class: ClassId, constraint: Constraint) {
        self.classes[class.index()].constraints.push(constraint);
    }

    fn push_class(
        &mut self,
        kind: ElementKind,
        qualified_name: String,
        is_abstract: bool,
        superclasses: SmallVec<[ClassId; 2]>,
    ) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        for s in &superclasses {
            self.classes[s.index()].subclasses.push(id);
        }
        self.by_name.insert(qualified_name.clone(), id);
        self.classes.push(ElementClass {
            id,
            kind,
            qualified_name,
            is_abstract,
            superclasses,
            subclasses: SmallVec::new(),
            attributes: Vec::new(),
            constraints: Vec::new(),
            from: None,
            to: None,
        });
        id
    }

    fn push_incidence(
        &mut self,
        edge_class: ClassId,
        direction: IncidenceDirection,
        spec: EndSpec,
        mut subsets: SmallVec<[IncidenceId; 2]>,
    ) -> IncidenceId {
        let id = IncidenceId(self.incidences.len() as u32);
        // redefinition implies subsetting
        for r in &spec.redefines {
            if !subsets.contains(r) {
                subsets.push(*r);
            }
        }
        self.incidences.push(IncidenceClass {
            id,
            edge_class,
            direction,
            vertex_class: spec.vertex_class,
            multiplicity: spec.multiplicity,
            role: spec.role,
            aggregation: spec.aggregation,
            subsets,
            redefines: spec.redefines.into_iter().collect(),
        });
        id
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> Result<Schema> {
        let mut by_simple_name: HashMap<String, SmallVec<[ClassId; 1]>> = HashMap::new();
        let mut packages = BTreeSet::new();
        for class in &self.classes {
            by_simple_name
                .entry(class.simple_name().to_string())
                .or_default()
                .push(class.id);
            let mut package = class.package();
            while !package.is_empty() {
                packages.insert(package.to_string());
                package = match package.rfind('.') {
                    Some(i) => &package[..i],
                    None => "",
                };
            }
        }
        let roles = self
            .incidences
            .iter()
            .filter_map(|i| i.role.clone())
            .collect();

        let schema = Schema {
            name: self.name,
            classes: self.classes,
            incidences: self.incidences,
            by_name: self.by_name,
            by_simple_name,
            packages,
            roles,
            graph_class: ClassId(0),
            vertex_root: ClassId(1),
            edge_root: ClassId(2),
            version: 0,
            closures: OnceCell::new(),
        };
        // closures assume an acyclic hierarchy
        check_acyclic(&schema.classes)?;
        validate(&schema)?;
        debug!(
            schema = %schema.name,
            classes = schema.classes.len(),
            incidences = schema.incidences.len(),
            "schema built"
        );
        Ok(schema)
    }
}

/// A class under construction, finished with [`ClassDraft::add`].
pub struct ClassDraft<'a> {
    builder: &'a mut SchemaBuilder,
    kind: ElementKind,
    name: String,
    superclasses: SmallVec<[ClassId; 2]>,
    is_abstract: bool,
    attributes: Vec<Attribute>,
    from: Option<EndSpec>,
    to: Option<EndSpec>,
}

impl<'a> ClassDraft<'a> {
    fn new(builder: &'a mut SchemaBuilder, kind: ElementKind, name: String) -> Self {
        Self {
            builder,
            kind,
            name,
            superclasses: SmallVec::new(),
            is_abstract: false,
            attributes: Vec::new(),
            from: None,
            to: None,
        }
    }

    pub fn superclass(mut self, class: ClassId) -> Self {
        self.superclasses.push(class);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.attributes.push(Attribute::new(name, domain));
        self
    }

    /// Alpha end. Inherited from the first superclass when omitted.
    pub fn from(mut self, end: EndSpec) -> Self {
        self.from = Some(end);
        self
    }

    /// Omega end. Inherited from the first superclass when omitted.
    pub fn to(mut self, end: EndSpec) -> Self {
        self.to = Some(end);
        self
    }

    pub fn add(self) -> Result<ClassId> {
        let ClassDraft {
            builder,
            kind,
            name,
            mut superclasses,
            is_abstract,
            attributes,
            from,
            to,
        } = self;

        if !is_valid_qualified_name(&name) {
            return Err(Error::SchemaError(format!("invalid class name '{}'", name)));
        }
        if builder.by_name.contains_key(&name) {
            return Err(Error::SchemaError(format!("duplicate class name '{}'", name)));
        }
        for s in &superclasses {
            match builder.classes.get(s.index()) {
                Some(c) if c.kind == kind => {}
                Some(c) => {
                    return Err(Error::SchemaError(format!(
                        "{} cannot specialize {} {}",
                        name, c.kind, c.qualified_name
                    )))
                }
                None => return Err(Error::SchemaError(format!("unknown superclass {:?}", s))),
            }
        }
        if superclasses.is_empty() {
            superclasses = match kind {
                ElementKind::Vertex => smallvec![builder.vertex_root()],
                ElementKind::Edge => smallvec![builder.edge_root()],
                ElementKind::Graph => SmallVec::new(),
            };
        }
        if kind != ElementKind::Edge && (from.is_some() || to.is_some()) {
            return Err(Error::SchemaError(format!(
                "{} is not an edge class and cannot declare ends",
                name
            )));
        }

        let id = builder.push_class(kind, name, is_abstract, superclasses.clone());
        builder.classes[id.index()].attributes = attributes;

        if kind == ElementKind::Edge {
            for (direction, spec) in [(IncidenceDirection::From, from), (IncidenceDirection::To, to)] {
                let super_ends: SmallVec<[IncidenceId; 2]> = superclasses
                    .iter()
                    .filter_map(|s| {
                        let c = &builder.classes[s.index()];
                        match direction {
                            IncidenceDirection::From => c.from,
                            IncidenceDirection::To => c.to,
                        }
                    })
                    .collect();
                let spec = match spec {
                    Some(spec) => spec,
                    None => {
                        let inherited = super_ends.first().map(|&i| &builder.incidences[i.index()]);
                        match inherited {
                            Some(inc) => EndSpec {
                                vertex_class: inc.vertex_class,
                                multiplicity: inc.multiplicity,
                                role: inc.role.clone(),
                                aggregation: inc.aggregation,
                                redefines: Vec::new(),
                            },
                            None => EndSpec::new(builder.vertex_root()),
                        }
                    }
                };
                if builder.classes.get(spec.vertex_class.index()).map(|c| c.kind)
                    != Some(ElementKind::Vertex)
                {
                    return Err(Error::SchemaError(format!(
                        "end of {} must reference a vertex class",
                        builder.classes[id.index()]
                    )));
                }
                let inc = builder.push_incidence(id, direction, spec, super_ends);
                match direction {
                    IncidenceDirection::From => builder.classes[id.index()].from = Some(inc),
                    IncidenceDirection::To => builder.classes[id.index()].to = Some(inc),
                }
            }
        }
        Ok(id)
    }
}
