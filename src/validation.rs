//! 图校验
//!
//! 检查一个图是否满足其 schema：
//! - 关联类的多重性（按 UML 惯例，一端的多重性约束对端每个顶点
//!   拥有的该类边的数量）
//! - 类上附加的约束（GReQL 布尔查询），用 rayon 并行求值

use crate::error::Error;
use crate::graph::{Graph, VertexId};
use crate::metrics::global_metrics;
use crate::query::{self, Environment};
use crate::schema::{IncidenceDirection, IncidenceId, Multiplicity};
use crate::types::Value;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// 一条校验违例
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Violation {
    /// 顶点拥有的某类边数量超出多重性
    Multiplicity {
        edge_class: String,
        incidence: IncidenceId,
        vertex: VertexId,
        count: usize,
        expected: Multiplicity,
    },
    /// 约束不成立
    Constraint {
        class: String,
        message: String,
        offending: Vec<Value>,
    },
    /// 约束本身无法求值
    BrokenConstraint {
        class: String,
        message: String,
        error: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Multiplicity {
                edge_class,
                vertex,
                count,
                expected,
                ..
            } => write!(
                f,
                "{} has {} {} edges, expected {}",
                vertex, count, edge_class, expected
            ),
            Violation::Constraint {
                class,
                message,
                offending,
            } => {
                write!(f, "{}: {}", class, message)?;
                if !offending.is_empty() {
                    let items: Vec<String> = offending.iter().map(|v| v.to_string()).collect();
                    write!(f, " [{}]", items.join(", "))?;
                }
                Ok(())
            }
            Violation::BrokenConstraint {
                class,
                message,
                error,
            } => write!(f, "{}: {} (not evaluable: {})", class, message, error),
        }
    }
}

/// 校验结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub constraints_checked: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// 图校验器
pub struct GraphValidator<'g> {
    graph: &'g Graph,
}

impl<'g> GraphValidator<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// 多重性与约束一起检查
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport {
            violations: self.check_multiplicities(),
            constraints_checked: 0,
        };
        let (checked, violations) = self.check_constraints();
        report.constraints_checked = checked;
        report.violations.extend(violations);
        debug!(
            graph = %self.graph.id(),
            violations = report.violations.len(),
            constraints = checked,
            "graph validated"
        );
        report
    }

    pub fn check_multiplicities(&self) -> Vec<Violation> {
        let graph = self.graph;
        let schema = graph.schema();
        let mut violations = Vec::new();

        for bound in schema.incidences() {
            let expected = bound.multiplicity();
            if expected == Multiplicity::ANY {
                continue;
            }
            // 被约束的是对端的顶点
            let (counted, counted_normal) = match bound.direction() {
                IncidenceDirection::From => (schema.to_incidence(bound.edge_class()), false),
                IncidenceDirection::To => (schema.from_incidence(bound.edge_class()), true),
            };
            let counted = match counted {
                Some(c) => c,
                None => continue,
            };
            let edge_class = schema.class(bound.edge_class()).qualified_name().to_string();

            for vertex in graph.vertices() {
                if !schema.is_subclass_of(vertex.class(), counted.vertex_class()) {
                    continue;
                }
                let count = vertex
                    .incidences()
                    .iter()
                    .filter(|inc| inc.is_normal() == counted_normal)
                    .filter(|inc| {
                        graph
                            .edge_class(inc.edge())
                            .map_or(false, |c| schema.is_subclass_of(c, bound.edge_class()))
                    })
                    .count();
                if !expected.contains(count) {
                    violations.push(Violation::Multiplicity {
                        edge_class: edge_class.clone(),
                        incidence: bound.id(),
                        vertex: vertex.id(),
                        count,
                        expected,
                    });
                }
            }
        }
        violations
    }

    /// 返回 (已检查的约束数, 违例)
    pub fn check_constraints(&self) -> (usize, Vec<Violation>) {
        let schema = self.graph.schema();
        let constraints: Vec<_> = schema
            .classes()
            .flat_map(|class| {
                class
                    .constraints()
                    .iter()
                    .map(move |c| (class.qualified_name(), c))
            })
            .collect();

        let violations: Vec<Violation> = constraints
            .par_iter()
            .filter_map(|(class, constraint)| {
                let class = class.to_string();
                let mut env = Environment::new();
                match query::evaluate(&constraint.predicate, Some(self.graph), &mut env) {
                    Ok(Value::Bool(true)) => None,
                    Ok(Value::Bool(false)) => {
                        let offending = match &constraint.offending_elements {
                            Some(text) => match query::evaluate(text, Some(self.graph), &mut env) {
                                Ok(value) => value
                                    .elements()
                                    .map(|it| it.cloned().collect())
                                    .unwrap_or_else(|| vec![value.clone()]),
                                Err(e) => return Some(broken(class, &constraint.message, e)),
                            },
                            None => Vec::new(),
                        };
                        Some(Violation::Constraint {
                            class,
                            message: constraint.message.clone(),
                            offending,
                        })
                    }
                    Ok(other) => Some(broken(
                        class,
                        &constraint.message,
                        Error::greql(format!("constraint yields {}", other.type_name())),
                    )),
                    Err(e) => Some(broken(class, &constraint.message, e)),
                }
            })
            .collect();

        global_metrics().record_constraints_checked(constraints.len());
        (constraints.len(), violations)
    }
}

fn broken(class: String, message: &str, error: Error) -> Violation {
    warn!(class = %class, error = %error, "constraint could not be evaluated");
    Violation::BrokenConstraint {
        class,
        message: message.to_string(),
        error: error.to_string(),
    }
}
