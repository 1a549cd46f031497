//! GReQL Abstract Syntax Tree (AST)
//!
//! This module defines the syntax tree produced by the GReQL parser and
//! consumed by both execution strategies. The tree is immutable after
//! parsing (the optimizer builds a new tree instead of editing one).
//!
//! Key GReQL features:
//! - Regular path descriptions: `-->`, `<--`, `<->`, `<>--`, `--<>`, `--e->`
//! - Path operators: sequence, `|`, `[P]`, `*`, `+`, `^n`, `^T`
//! - Type restrictions `{...}` on edges and `&{...}` on vertices
//! - Local bindings (`let` / `where`), `using`, `store as`, `on`
//! - Quantified expressions and `from ... report ... end` comprehensions

use crate::graph::{Direction, HopEnd};
use crate::schema::{ElementKind, TypeExpression};
use std::fmt;

// ============================================================================
// Query (Top-Level)
// ============================================================================

/// A complete query: imports, `using` clause, body and optional `store as`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub imports: Vec<Import>,
    /// Names that must be bound in the environment before evaluation
    pub using: Vec<String>,
    pub body: Expression,
    pub store_as: Option<String>,
}

impl Query {
    pub fn new(body: Expression) -> Self {
        Query {
            imports: Vec::new(),
            using: Vec::new(),
            body,
            store_as: None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "{}", import)?;
        }
        if !self.using.is_empty() {
            write!(f, "using {}: ", self.using.join(", "))?;
        }
        write!(f, "{}", self.body)?;
        if let Some(name) = &self.store_as {
            write!(f, " store as {}", name)?;
        }
        Ok(())
    }
}

/// `import pkg.*;` or `import pkg.Type;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    Package(String),
    Type(String),
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Import::Package(p) => write!(f, "import {}.*;", p),
            Import::Type(t) => write!(f, "import {};", t),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Neg,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "not "),
            UnaryOperator::Neg => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Logical
    Or,
    Xor,
    And,
    // Comparison
    Eq,
    Ne,
    Match,
    Lt,
    Le,
    Gt,
    Ge,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Or => "or",
            BinaryOperator::Xor => "xor",
            BinaryOperator::And => "and",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Match => "=~",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// `let x := e in body` and `body where x := e` are the same binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingForm {
    Let,
    Where,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Forall,
    Exists,
    /// `exists!`: exactly one binding satisfies the predicate
    ExistsOne,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Forall => write!(f, "forall"),
            Quantifier::Exists => write!(f, "exists"),
            Quantifier::ExistsOne => write!(f, "exists!"),
        }
    }
}

/// `x, y : domain` in quantified expressions and comprehensions
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub variables: Vec<String>,
    pub domain: Expression,
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.variables.join(", "), self.domain)
    }
}

/// Result part of a `from ... end` comprehension
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// `report` / `reportList`: one element (or tuple) per binding
    List(Vec<Expression>),
    /// `reportSet`
    Set(Vec<Expression>),
    /// `reportMap k -> v`
    Map(Box<Expression>, Box<Expression>),
}

/// GReQL expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Variable(String),
    /// `V` or `V{types}`
    VertexSet(Option<TypeExpression>),
    /// `E` or `E{types}`
    EdgeSet(Option<TypeExpression>),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `c ? a : b`
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    List(Vec<Expression>),
    /// `list(a..b)`
    ListRange {
        start: Box<Expression>,
        end: Box<Expression>,
    },
    Set(Vec<Expression>),
    Tuple(Vec<Expression>),
    Record(Vec<(String, Expression)>),
    Map(Vec<(Expression, Expression)>),
    AttributeAccess {
        target: Box<Expression>,
        attribute: String,
    },
    IndexAccess {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Let {
        bindings: Vec<(String, Expression)>,
        body: Box<Expression>,
        form: BindingForm,
    },
    Quantified {
        quantifier: Quantifier,
        declarations: Vec<Declaration>,
        predicate: Box<Expression>,
    },
    Comprehension {
        declarations: Vec<Declaration>,
        constraint: Option<Box<Expression>>,
        report: Report,
    },
    /// `on subgraph: body`
    On {
        subgraph: Box<Expression>,
        body: Box<Expression>,
    },
    /// `v P w`
    PathExistence {
        start: Box<Expression>,
        path: PathDescription,
        target: Box<Expression>,
    },
    /// `v P`
    ForwardVertexSet {
        start: Box<Expression>,
        path: PathDescription,
    },
    /// `P w`
    BackwardVertexSet {
        path: PathDescription,
        target: Box<Expression>,
    },
    /// `pathSystem(v, P)`
    PathSystem {
        start: Box<Expression>,
        path: PathDescription,
    },
    /// `vertexTypeSubgraph{...}` / `edgeTypeSubgraph{...}`
    SubgraphByType {
        kind: ElementKind,
        types: TypeExpression,
    },
}

impl Expression {
    pub fn int(i: i64) -> Self {
        Expression::Literal(Literal::Int(i))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::Str(s.into()))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// True for expressions that render without surrounding parentheses
    fn is_primary(&self) -> bool {
        matches!(
            self,
            Expression::Literal(_)
                | Expression::Variable(_)
                | Expression::VertexSet(_)
                | Expression::EdgeSet(_)
                | Expression::FunctionCall { .. }
                | Expression::List(_)
                | Expression::ListRange { .. }
                | Expression::Set(_)
                | Expression::Tuple(_)
                | Expression::Record(_)
                | Expression::Map(_)
                | Expression::PathSystem { .. }
                | Expression::SubgraphByType { .. }
        )
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Literal::Int(i)) if *i < 0 => write!(f, "({})", i),
            Expression::Literal(Literal::Double(d)) if *d < 0.0 => write!(f, "({:?})", d),
            e if e.is_primary() => write!(f, "{}", e),
            e => write!(f, "({})", e),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_bindings(f: &mut fmt::Formatter<'_>, bindings: &[(String, Expression)]) -> fmt::Result {
    for (i, (name, value)) in bindings.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} := {}", name, value)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::VertexSet(None) => write!(f, "V"),
            Expression::VertexSet(Some(types)) => write!(f, "V{{{}}}", types),
            Expression::EdgeSet(None) => write!(f, "E"),
            Expression::EdgeSet(Some(types)) => write!(f, "E{{{}}}", types),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expression::Unary { op, operand } => {
                write!(f, "{}", op)?;
                operand.fmt_operand(f)
            }
            Expression::Binary { op, left, right } => {
                write!(f, "(")?;
                left.fmt_operand(f)?;
                write!(f, " {} ", op)?;
                right.fmt_operand(f)?;
                write!(f, ")")
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "(")?;
                condition.fmt_operand(f)?;
                write!(f, " ? ")?;
                then_branch.fmt_operand(f)?;
                write!(f, " : ")?;
                else_branch.fmt_operand(f)?;
                write!(f, ")")
            }
            Expression::List(items) => {
                write!(f, "list(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expression::ListRange { start, end } => write!(f, "list({}..{})", start, end),
            Expression::Set(items) => {
                write!(f, "set(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expression::Tuple(items) => {
                write!(f, "tup(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expression::Record(fields) => {
                write!(f, "rec(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, ")")
            }
            Expression::Map(entries) => {
                write!(f, "map(")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} -> {}", k, v)?;
                }
                write!(f, ")")
            }
            Expression::AttributeAccess { target, attribute } => {
                target.fmt_operand(f)?;
                write!(f, ".{}", attribute)
            }
            Expression::IndexAccess { target, index } => {
                target.fmt_operand(f)?;
                write!(f, "[{}]", index)
            }
            Expression::Let {
                bindings,
                body,
                form: BindingForm::Let,
            } => {
                write!(f, "(let ")?;
                write_bindings(f, bindings)?;
                write!(f, " in {})", body)
            }
            Expression::Let {
                bindings,
                body,
                form: BindingForm::Where,
            } => {
                write!(f, "({} where ", body)?;
                write_bindings(f, bindings)?;
                write!(f, ")")
            }
            Expression::Quantified {
                quantifier,
                declarations,
                predicate,
            } => {
                write!(f, "({} ", quantifier)?;
                write_list(f, declarations)?;
                write!(f, " @ {})", predicate)
            }
            Expression::Comprehension {
                declarations,
                constraint,
                report,
            } => {
                write!(f, "from ")?;
                write_list(f, declarations)?;
                if let Some(c) = constraint {
                    write!(f, " with {}", c)?;
                }
                match report {
                    Report::List(items) => {
                        write!(f, " report ")?;
                        write_list(f, items)?;
                    }
                    Report::Set(items) => {
                        write!(f, " reportSet ")?;
                        write_list(f, items)?;
                    }
                    Report::Map(k, v) => write!(f, " reportMap {} -> {}", k, v)?,
                }
                write!(f, " end")
            }
            Expression::On { subgraph, body } => write!(f, "(on {} : {})", subgraph, body),
            Expression::PathExistence {
                start,
                path,
                target,
            } => {
                write!(f, "(")?;
                start.fmt_operand(f)?;
                write!(f, " {} ", path)?;
                target.fmt_operand(f)?;
                write!(f, ")")
            }
            Expression::ForwardVertexSet { start, path } => {
                write!(f, "(")?;
                start.fmt_operand(f)?;
                write!(f, " {})", path)
            }
            Expression::BackwardVertexSet { path, target } => {
                write!(f, "({} ", path)?;
                target.fmt_operand(f)?;
                write!(f, ")")
            }
            Expression::PathSystem { start, path } => write!(f, "pathSystem({}, {})", start, path),
            Expression::SubgraphByType { kind, types } => match kind {
                ElementKind::Edge => write!(f, "edgeTypeSubgraph{{{}}}", types),
                _ => write!(f, "vertexTypeSubgraph{{{}}}", types),
            },
        }
    }
}

// ============================================================================
// Path Descriptions
// ============================================================================

/// A regular path description with optional vertex restrictions at its ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDescription {
    pub kind: PathKind,
    /// `&{...} P`: the vertex where `P` starts must match
    pub start_restriction: Option<TypeExpression>,
    /// `P &{...}`: the vertex where `P` ends must match
    pub goal_restriction: Option<TypeExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathKind {
    /// One incidence hop. `aggregation` names the end that must be an
    /// aggregation end (`<>--` the vertex left, `--<>` the vertex reached).
    Simple {
        direction: Direction,
        aggregation: Option<HopEnd>,
        restriction: Option<TypeExpression>,
    },
    /// Hop along one specific edge: `--e->`, `<-e--`, `<-e->`
    Edge {
        direction: Direction,
        edge: Box<Expression>,
    },
    Sequence(Vec<PathDescription>),
    Alternative(Vec<PathDescription>),
    /// `[P]`
    Optional(Box<PathDescription>),
    /// `P*`
    Star(Box<PathDescription>),
    /// `P+`
    Plus(Box<PathDescription>),
    /// `P^n`
    Exponent(Box<PathDescription>, u32),
    /// `(P)`
    Group(Box<PathDescription>),
    /// `P^T`
    Transposed(Box<PathDescription>),
}

impl PathDescription {
    pub fn new(kind: PathKind) -> Self {
        PathDescription {
            kind,
            start_restriction: None,
            goal_restriction: None,
        }
    }

    pub fn simple(direction: Direction) -> Self {
        Self::new(PathKind::Simple {
            direction,
            aggregation: None,
            restriction: None,
        })
    }

    pub fn restricted_simple(direction: Direction, restriction: TypeExpression) -> Self {
        Self::new(PathKind::Simple {
            direction,
            aggregation: None,
            restriction: Some(restriction),
        })
    }

    pub fn sequence(items: Vec<PathDescription>) -> Self {
        Self::new(PathKind::Sequence(items))
    }

    pub fn alternative(items: Vec<PathDescription>) -> Self {
        Self::new(PathKind::Alternative(items))
    }

    pub fn optional(self) -> Self {
        Self::new(PathKind::Optional(Box::new(self)))
    }

    pub fn star(self) -> Self {
        Self::new(PathKind::Star(Box::new(self)))
    }

    pub fn plus(self) -> Self {
        Self::new(PathKind::Plus(Box::new(self)))
    }

    pub fn exponent(self, n: u32) -> Self {
        Self::new(PathKind::Exponent(Box::new(self), n))
    }

    pub fn transposed(self) -> Self {
        Self::new(PathKind::Transposed(Box::new(self)))
    }

    pub fn group(self) -> Self {
        Self::new(PathKind::Group(Box::new(self)))
    }

    pub fn with_start_restriction(mut self, types: TypeExpression) -> Self {
        self.start_restriction = Some(types);
        self
    }

    pub fn with_goal_restriction(mut self, types: TypeExpression) -> Self {
        self.goal_restriction = Some(types);
        self
    }

    pub fn has_restrictions(&self) -> bool {
        self.start_restriction.is_some() || self.goal_restriction.is_some()
    }

    /// Number of hops once every exponent is unrolled, saturating.
    pub fn unrolled_size(&self) -> u64 {
        match &self.kind {
            PathKind::Simple { .. } | PathKind::Edge { .. } => 1,
            PathKind::Sequence(items) | PathKind::Alternative(items) => items
                .iter()
                .fold(0u64, |total, item| total.saturating_add(item.unrolled_size())),
            PathKind::Exponent(inner, n) => inner.unrolled_size().saturating_mul(u64::from(*n)),
            PathKind::Optional(inner)
            | PathKind::Star(inner)
            | PathKind::Plus(inner)
            | PathKind::Group(inner)
            | PathKind::Transposed(inner) => inner.unrolled_size(),
        }
    }

    /// Operand of a postfix operator: bare when unambiguous, else parenthesized
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = !self.has_restrictions()
            && matches!(
                self.kind,
                PathKind::Simple { .. }
                    | PathKind::Edge { .. }
                    | PathKind::Optional(_)
                    | PathKind::Group(_)
                    | PathKind::Sequence(_)
                    | PathKind::Alternative(_)
            );
        if bare {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

impl fmt::Display for PathDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(types) = &self.start_restriction {
            write!(f, "&{{{}}} ", types)?;
        }
        match &self.kind {
            PathKind::Simple {
                direction,
                aggregation,
                restriction,
            } => {
                let arrow = match (aggregation, direction) {
                    (Some(HopEnd::This), _) => "<>--",
                    (Some(HopEnd::That), _) => "--<>",
                    (None, Direction::Out) => "-->",
                    (None, Direction::In) => "<--",
                    (None, Direction::Any) => "<->",
                };
                write!(f, "{}", arrow)?;
                if let Some(types) = restriction {
                    write!(f, "{{{}}}", types)?;
                }
            }
            PathKind::Edge { direction, edge } => {
                let (open, close) = match direction {
                    Direction::Out => ("--", "->"),
                    Direction::In => ("<-", "--"),
                    Direction::Any => ("<-", "->"),
                };
                write!(f, "{}", open)?;
                edge.fmt_operand(f)?;
                write!(f, "{}", close)?;
            }
            PathKind::Sequence(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    if item.has_restrictions() {
                        write!(f, "({})", item)?;
                    } else {
                        write!(f, "{}", item)?;
                    }
                }
                write!(f, ")")?;
            }
            PathKind::Alternative(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")?;
            }
            PathKind::Optional(inner) => write!(f, "[{}]", inner)?,
            PathKind::Star(inner) => {
                inner.fmt_operand(f)?;
                write!(f, "*")?;
            }
            PathKind::Plus(inner) => {
                inner.fmt_operand(f)?;
                write!(f, "+")?;
            }
            PathKind::Exponent(inner, n) => {
                inner.fmt_operand(f)?;
                write!(f, "^{}", n)?;
            }
            PathKind::Group(inner) => match inner.kind {
                PathKind::Sequence(_) | PathKind::Alternative(_) if !inner.has_restrictions() => {
                    write!(f, "{}", inner)?
                }
                _ => write!(f, "({})", inner)?,
            },
            PathKind::Transposed(inner) => {
                inner.fmt_operand(f)?;
                write!(f, "^T")?;
            }
        }
        if let Some(types) = &self.goal_restriction {
            write!(f, " &{{{}}}", types)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeToken;

    #[test]
    fn test_path_display() {
        let p = PathDescription::sequence(vec![
            PathDescription::simple(Direction::Out).exponent(2),
            PathDescription::restricted_simple(
                Direction::In,
                TypeExpression::new(vec![TypeToken::new("Street").negated()]),
            )
            .star(),
        ]);
        assert_eq!(p.to_string(), "(-->^2 <--{^Street}*)");
        assert_eq!(p.clone().transposed().to_string(), "(-->^2 <--{^Street}*)^T");

        let restricted = PathDescription::simple(Direction::Any)
            .with_goal_restriction(TypeExpression::new(vec![TypeToken::new("Town")]));
        assert_eq!(restricted.clone().star().to_string(), "(<-> &{Town})*");
    }

    #[test]
    fn test_expression_display() {
        let e = Expression::PathExistence {
            start: Box::new(Expression::call("getVertex", vec![Expression::int(19)])),
            path: PathDescription::simple(Direction::Out),
            target: Box::new(Expression::call("getVertex", vec![Expression::int(2)])),
        };
        assert_eq!(e.to_string(), "(getVertex(19) --> getVertex(2))");

        let let_expr = Expression::Let {
            bindings: vec![("x".to_string(), Expression::int(1))],
            body: Box::new(Expression::Binary {
                op: BinaryOperator::Add,
                left: Box::new(Expression::variable("x")),
                right: Box::new(Expression::int(-2)),
            }),
            form: BindingForm::Let,
        };
        assert_eq!(let_expr.to_string(), "(let x := 1 in (x + (-2)))");
        assert_eq!(Literal::Str("a\"b".into()).to_string(), "\"a\\\"b\"");
    }
}
