//! Path-description rewriting
//!
//! Produces the optimized tree both executors consume. Every rewrite keeps
//! the relation a path describes and keeps `P^0` in place so that it still
//! fails at evaluation time.
//!
//! - `(P)` → `P`
//! - `P^T^T` → `P`
//! - nested sequences / alternatives are flattened
//! - `[P*]` → `P*`, `(P*)*` → `P*`, `(P+)*` → `P*`

use crate::query::ast::*;
use tracing::trace;

/// Rewrite every path description of a query.
pub fn optimize(query: &Query) -> Query {
    let optimized = Query {
        imports: query.imports.clone(),
        using: query.using.clone(),
        body: optimize_expression(&query.body),
        store_as: query.store_as.clone(),
    };
    trace!(before = %query.body, after = %optimized.body, "query optimized");
    optimized
}

fn boxed(e: &Expression) -> Box<Expression> {
    Box::new(optimize_expression(e))
}

fn all(items: &[Expression]) -> Vec<Expression> {
    items.iter().map(optimize_expression).collect()
}

fn declarations(decls: &[Declaration]) -> Vec<Declaration> {
    decls
        .iter()
        .map(|d| Declaration {
            variables: d.variables.clone(),
            domain: optimize_expression(&d.domain),
        })
        .collect()
}

pub fn optimize_expression(expr: &Expression) -> Expression {
    match expr {
        Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::VertexSet(_)
        | Expression::EdgeSet(_)
        | Expression::SubgraphByType { .. } => expr.clone(),
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: all(args),
        },
        Expression::Unary { op, operand } => Expression::Unary {
            op: *op,
            operand: boxed(operand),
        },
        Expression::Binary { op, left, right } => Expression::Binary {
            op: *op,
            left: boxed(left),
            right: boxed(right),
        },
        Expression::Conditional {
            condition,
            then_branch,
            else_branch,
        } => Expression::Conditional {
            condition: boxed(condition),
            then_branch: boxed(then_branch),
            else_branch: boxed(else_branch),
        },
        Expression::List(items) => Expression::List(all(items)),
        Expression::ListRange { start, end } => Expression::ListRange {
            start: boxed(start),
            end: boxed(end),
        },
        Expression::Set(items) => Expression::Set(all(items)),
        Expression::Tuple(items) => Expression::Tuple(all(items)),
        Expression::Record(fields) => Expression::Record(
            fields
                .iter()
                .map(|(n, e)| (n.clone(), optimize_expression(e)))
                .collect(),
        ),
        Expression::Map(entries) => Expression::Map(
            entries
                .iter()
                .map(|(k, v)| (optimize_expression(k), optimize_expression(v)))
                .collect(),
        ),
        Expression::AttributeAccess { target, attribute } => Expression::AttributeAccess {
            target: boxed(target),
            attribute: attribute.clone(),
        },
        Expression::IndexAccess { target, index } => Expression::IndexAccess {
            target: boxed(target),
            index: boxed(index),
        },
        Expression::Let {
            bindings,
            body,
            form,
        } => Expression::Let {
            bindings: bindings
                .iter()
                .map(|(n, e)| (n.clone(), optimize_expression(e)))
                .collect(),
            body: boxed(body),
            form: *form,
        },
        Expression::Quantified {
            quantifier,
            declarations: decls,
            predicate,
        } => Expression::Quantified {
            quantifier: *quantifier,
            declarations: declarations(decls),
            predicate: boxed(predicate),
        },
        Expression::Comprehension {
            declarations: decls,
            constraint,
            report,
        } => Expression::Comprehension {
            declarations: declarations(decls),
            constraint: constraint.as_deref().map(boxed),
            report: match report {
                Report::List(items) => Report::List(all(items)),
                Report::Set(items) => Report::Set(all(items)),
                Report::Map(k, v) => Report::Map(boxed(k), boxed(v)),
            },
        },
        Expression::On { subgraph, body } => Expression::On {
            subgraph: boxed(subgraph),
            body: boxed(body),
        },
        Expression::PathExistence {
            start,
            path,
            target,
        } => Expression::PathExistence {
            start: boxed(start),
            path: optimize_path(path),
            target: boxed(target),
        },
        Expression::ForwardVertexSet { start, path } => Expression::ForwardVertexSet {
            start: boxed(start),
            path: optimize_path(path),
        },
        Expression::BackwardVertexSet { path, target } => Expression::BackwardVertexSet {
            path: optimize_path(path),
            target: boxed(target),
        },
        Expression::PathSystem { start, path } => Expression::PathSystem {
            start: boxed(start),
            path: optimize_path(path),
        },
    }
}

/// Put the restrictions of an eliminated wrapper onto its operand, or
/// keep the wrapper when both carry the same kind of restriction.
fn merge_restrictions(
    wrapper: &PathDescription,
    inner: PathDescription,
    rebuild: impl FnOnce(PathDescription) -> PathKind,
) -> PathDescription {
    let clash = (wrapper.start_restriction.is_some() && inner.start_restriction.is_some())
        || (wrapper.goal_restriction.is_some() && inner.goal_restriction.is_some());
    if clash {
        return PathDescription {
            kind: rebuild(inner),
            start_restriction: wrapper.start_restriction.clone(),
            goal_restriction: wrapper.goal_restriction.clone(),
        };
    }
    let mut merged = inner;
    if merged.start_restriction.is_none() {
        merged.start_restriction = wrapper.start_restriction.clone();
    }
    if merged.goal_restriction.is_none() {
        merged.goal_restriction = wrapper.goal_restriction.clone();
    }
    merged
}

fn wrap(path: &PathDescription, kind: PathKind) -> PathDescription {
    PathDescription {
        kind,
        start_restriction: path.start_restriction.clone(),
        goal_restriction: path.goal_restriction.clone(),
    }
}

pub fn optimize_path(path: &PathDescription) -> PathDescription {
    match &path.kind {
        PathKind::Simple { .. } => path.clone(),
        PathKind::Edge { direction, edge } => wrap(
            path,
            PathKind::Edge {
                direction: *direction,
                edge: boxed(edge),
            },
        ),
        PathKind::Group(inner) => {
            let inner = optimize_path(inner);
            merge_restrictions(path, inner, |p| PathKind::Group(Box::new(p)))
        }
        PathKind::Sequence(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items.iter().map(optimize_path) {
                match item {
                    PathDescription {
                        kind: PathKind::Sequence(nested),
                        start_restriction: None,
                        goal_restriction: None,
                    } => flat.extend(nested),
                    other => flat.push(other),
                }
            }
            wrap(path, PathKind::Sequence(flat))
        }
        PathKind::Alternative(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items.iter().map(optimize_path) {
                match item {
                    PathDescription {
                        kind: PathKind::Alternative(nested),
                        start_restriction: None,
                        goal_restriction: None,
                    } => flat.extend(nested),
                    other => flat.push(other),
                }
            }
            wrap(path, PathKind::Alternative(flat))
        }
        PathKind::Optional(inner) => {
            let inner = optimize_path(inner);
            match inner.kind {
                PathKind::Star(_) if !inner.has_restrictions() => {
                    merge_restrictions(path, inner, |p| PathKind::Optional(Box::new(p)))
                }
                _ => wrap(path, PathKind::Optional(Box::new(inner))),
            }
        }
        PathKind::Star(inner) => {
            let inner = optimize_path(inner);
            let collapsed = match inner.kind {
                PathKind::Star(ref body) | PathKind::Plus(ref body)
                    if !inner.has_restrictions() =>
                {
                    Some(body.as_ref().clone())
                }
                _ => None,
            };
            match collapsed {
                Some(body) => wrap(path, PathKind::Star(Box::new(body))),
                None => wrap(path, PathKind::Star(Box::new(inner))),
            }
        }
        PathKind::Plus(inner) => wrap(path, PathKind::Plus(Box::new(optimize_path(inner)))),
        PathKind::Exponent(inner, n) => {
            wrap(path, PathKind::Exponent(Box::new(optimize_path(inner)), *n))
        }
        PathKind::Transposed(inner) => {
            let inner = optimize_path(inner);
            match inner.kind {
                PathKind::Transposed(ref body) if !inner.has_restrictions() => {
                    let body = body.as_ref().clone();
                    merge_restrictions(path, body, |p| {
                        PathKind::Transposed(Box::new(p.transposed()))
                    })
                }
                _ => wrap(path, PathKind::Transposed(Box::new(inner))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::parse_path;

    fn opt(text: &str) -> String {
        optimize_path(&parse_path(text).unwrap()).to_string()
    }

    #[test]
    fn test_group_elimination() {
        assert_eq!(opt("((-->))"), "-->");
        assert_eq!(opt("(--> (<-- -->))"), "(--> <-- -->)");
        assert_eq!(opt("(--> | (<-- | <->))"), "(--> | <-- | <->)");
    }

    #[test]
    fn test_closure_rewrites() {
        assert_eq!(opt("[-->*]"), "-->*");
        assert_eq!(opt("(-->*)*"), "-->*");
        assert_eq!(opt("(-->+)*"), "-->*");
        assert_eq!(opt("-->^T^T"), "-->");
        // +* is not the same as *+
        assert_eq!(opt("(-->*)+"), "(-->*)+");
    }

    #[test]
    fn test_zero_exponent_kept() {
        assert_eq!(opt("(-->)^0"), "-->^0");
    }

    #[test]
    fn test_restrictions_survive() {
        assert_eq!(opt("(--> &{A}) &{B}"), "(--> &{A}) &{B}");
        assert_eq!(opt("&{A} (--> &{B})"), "&{A} --> &{B}");
    }
}
