//! GReQL Interpreter
//!
//! The optimized AST is lowered into an evaluator graph: an arena with one
//! node per expression and one per path description, addressed by index.
//! Evaluation starts at the root node and pulls values from children on
//! demand. Local variables live on a name-based scope stack and `on`
//! pushes subgraph views onto a view stack.
//!
//! Regular path expressions are prepared in pre-order (restrictions
//! resolved, edge expressions evaluated) and then run as an automaton over
//! the product of the current view and the automaton's states.

mod automaton;
mod search;

use self::automaton::{Automaton, HopSpec, PreparedKind, PreparedPath};
use crate::error::{Error, Result};
use crate::graph::{Direction, Graph, GraphView, HopEnd, SubgraphMarker};
use crate::metrics::{global_metrics, ExecutionMode};
use crate::query::ast::*;
use crate::query::env::Environment;
use crate::query::functions::{self, FunctionContext};
use crate::query::operators::{
    self, domain_elements, expect_edge, expect_subgraph, expect_vertex, no_graph, report_row,
    truth,
};
use crate::query::{check_prelude, imports_of, AbortHandle};
use crate::schema::{ElementKind, Imports, TypeCache, TypeCollection, TypeExpression};
use crate::types::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

type NodeId = usize;
type PathId = usize;

// ============================================================================
// Evaluator graph
// ============================================================================

#[derive(Debug)]
enum Node {
    Constant(Value),
    Variable(String),
    VertexSet(Option<TypeExpression>),
    EdgeSet(Option<TypeExpression>),
    Call {
        name: String,
        args: Vec<NodeId>,
    },
    Unary {
        op: UnaryOperator,
        operand: NodeId,
    },
    Binary {
        op: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    List(Vec<NodeId>),
    Range {
        start: NodeId,
        end: NodeId,
    },
    Set(Vec<NodeId>),
    Tuple(Vec<NodeId>),
    Record(Vec<(String, NodeId)>),
    Map(Vec<(NodeId, NodeId)>),
    Attribute {
        target: NodeId,
        name: String,
    },
    Index {
        target: NodeId,
        index: NodeId,
    },
    Let {
        bindings: Vec<(String, NodeId)>,
        body: NodeId,
    },
    Quantified {
        quantifier: Quantifier,
        declarations: Vec<Decl>,
        predicate: NodeId,
    },
    Comprehension {
        declarations: Vec<Decl>,
        constraint: Option<NodeId>,
        report: ReportNodes,
    },
    On {
        subgraph: NodeId,
        body: NodeId,
    },
    Existence {
        start: NodeId,
        path: PathId,
        target: NodeId,
    },
    Forward {
        start: NodeId,
        path: PathId,
    },
    Backward {
        path: PathId,
        target: NodeId,
    },
    System {
        start: NodeId,
        path: PathId,
    },
    TypeSubgraph {
        kind: ElementKind,
        types: TypeExpression,
    },
}

#[derive(Debug)]
struct Decl {
    variables: Vec<String>,
    domain: NodeId,
}

#[derive(Debug)]
enum ReportNodes {
    List(Vec<NodeId>),
    Set(Vec<NodeId>),
    Map(NodeId, NodeId),
}

#[derive(Debug)]
struct PathNode {
    kind: PathNodeKind,
    start: Option<TypeExpression>,
    goal: Option<TypeExpression>,
}

#[derive(Debug)]
enum PathNodeKind {
    Simple {
        direction: Direction,
        aggregation: Option<HopEnd>,
        restriction: Option<TypeExpression>,
    },
    Edge {
        direction: Direction,
        edge: NodeId,
    },
    Sequence(Vec<PathId>),
    Alternative(Vec<PathId>),
    Optional(PathId),
    Star(PathId),
    Plus(PathId),
    Exponent(PathId, u32),
    Group(PathId),
    Transposed(PathId),
}

/// Arena form of one query body.
#[derive(Debug, Default)]
pub struct EvaluatorGraph {
    nodes: Vec<Node>,
    paths: Vec<PathNode>,
    root: NodeId,
}

impl EvaluatorGraph {
    pub fn lower(body: &Expression) -> Self {
        let mut graph = EvaluatorGraph::default();
        graph.root = graph.expression(body);
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn all(&mut self, items: &[Expression]) -> Vec<NodeId> {
        items.iter().map(|e| self.expression(e)).collect()
    }

    fn declarations(&mut self, decls: &[Declaration]) -> Vec<Decl> {
        decls
            .iter()
            .map(|d| Decl {
                variables: d.variables.clone(),
                domain: self.expression(&d.domain),
            })
            .collect()
    }

    fn expression(&mut self, expr: &Expression) -> NodeId {
        let node = match expr {
            Expression::Literal(lit) => Node::Constant(match lit {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Double(d) => Value::Double(*d),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Null => Value::Undefined,
            }),
            Expression::Variable(name) => Node::Variable(name.clone()),
            Expression::VertexSet(types) => Node::VertexSet(types.clone()),
            Expression::EdgeSet(types) => Node::EdgeSet(types.clone()),
            Expression::FunctionCall { name, args } => Node::Call {
                name: name.clone(),
                args: self.all(args),
            },
            Expression::Unary { op, operand } => Node::Unary {
                op: *op,
                operand: self.expression(operand),
            },
            Expression::Binary { op, left, right } => Node::Binary {
                op: *op,
                left: self.expression(left),
                right: self.expression(right),
            },
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => Node::Conditional {
                condition: self.expression(condition),
                then_branch: self.expression(then_branch),
                else_branch: self.expression(else_branch),
            },
            Expression::List(items) => Node::List(self.all(items)),
            Expression::ListRange { start, end } => Node::Range {
                start: self.expression(start),
                end: self.expression(end),
            },
            Expression::Set(items) => Node::Set(self.all(items)),
            Expression::Tuple(items) => Node::Tuple(self.all(items)),
            Expression::Record(fields) => Node::Record(
                fields
                    .iter()
                    .map(|(n, e)| (n.clone(), self.expression(e)))
                    .collect(),
            ),
            Expression::Map(entries) => Node::Map(
                entries
                    .iter()
                    .map(|(k, v)| (self.expression(k), self.expression(v)))
                    .collect(),
            ),
            Expression::AttributeAccess { target, attribute } => Node::Attribute {
                target: self.expression(target),
                name: attribute.clone(),
            },
            Expression::IndexAccess { target, index } => Node::Index {
                target: self.expression(target),
                index: self.expression(index),
            },
            Expression::Let { bindings, body, .. } => Node::Let {
                bindings: bindings
                    .iter()
                    .map(|(n, e)| (n.clone(), self.expression(e)))
                    .collect(),
                body: self.expression(body),
            },
            Expression::Quantified {
                quantifier,
                declarations,
                predicate,
            } => Node::Quantified {
                quantifier: *quantifier,
                declarations: self.declarations(declarations),
                predicate: self.expression(predicate),
            },
            Expression::Comprehension {
                declarations,
                constraint,
                report,
            } => Node::Comprehension {
                declarations: self.declarations(declarations),
                constraint: constraint.as_deref().map(|c| self.expression(c)),
                report: match report {
                    Report::List(items) => ReportNodes::List(self.all(items)),
                    Report::Set(items) => ReportNodes::Set(self.all(items)),
                    Report::Map(k, v) => ReportNodes::Map(self.expression(k), self.expression(v)),
                },
            },
            Expression::On { subgraph, body } => Node::On {
                subgraph: self.expression(subgraph),
                body: self.expression(body),
            },
            Expression::PathExistence {
                start,
                path,
                target,
            } => Node::Existence {
                start: self.expression(start),
                path: self.path(path),
                target: self.expression(target),
            },
            Expression::ForwardVertexSet { start, path } => Node::Forward {
                start: self.expression(start),
                path: self.path(path),
            },
            Expression::BackwardVertexSet { path, target } => Node::Backward {
                path: self.path(path),
                target: self.expression(target),
            },
            Expression::PathSystem { start, path } => Node::System {
                start: self.expression(start),
                path: self.path(path),
            },
            Expression::SubgraphByType { kind, types } => Node::TypeSubgraph {
                kind: *kind,
                types: types.clone(),
            },
        };
        self.push(node)
    }

    fn path(&mut self, path: &PathDescription) -> PathId {
        let kind = match &path.kind {
            PathKind::Simple {
                direction,
                aggregation,
                restriction,
            } => PathNodeKind::Simple {
                direction: *direction,
                aggregation: *aggregation,
                restriction: restriction.clone(),
            },
            PathKind::Edge { direction, edge } => PathNodeKind::Edge {
                direction: *direction,
                edge: self.expression(edge),
            },
            PathKind::Sequence(items) => {
                PathNodeKind::Sequence(items.iter().map(|p| self.path(p)).collect())
            }
            PathKind::Alternative(items) => {
                PathNodeKind::Alternative(items.iter().map(|p| self.path(p)).collect())
            }
            PathKind::Optional(inner) => PathNodeKind::Optional(self.path(inner)),
            PathKind::Star(inner) => PathNodeKind::Star(self.path(inner)),
            PathKind::Plus(inner) => PathNodeKind::Plus(self.path(inner)),
            PathKind::Exponent(inner, n) => PathNodeKind::Exponent(self.path(inner), *n),
            PathKind::Group(inner) => PathNodeKind::Group(self.path(inner)),
            PathKind::Transposed(inner) => PathNodeKind::Transposed(self.path(inner)),
        };
        self.paths.push(PathNode {
            kind,
            start: path.start_restriction.clone(),
            goal: path.goal_restriction.clone(),
        });
        self.paths.len() - 1
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Run a (parsed, usually optimized) query with the interpreter.
pub fn interpret(
    query: &Query,
    graph: Option<&Graph>,
    env: &mut Environment,
    abort: &AbortHandle,
) -> Result<Value> {
    let metrics = global_metrics();
    let timer = metrics.record_query_start(ExecutionMode::Interpreted);
    let result = run(query, graph, env, abort);
    metrics.record_query_complete(timer, result.as_ref().err().map(Error::kind));
    result
}

fn run(
    query: &Query,
    graph: Option<&Graph>,
    env: &mut Environment,
    abort: &AbortHandle,
) -> Result<Value> {
    let imports = imports_of(query);
    check_prelude(&imports, &query.using, graph, env)?;

    let plan = EvaluatorGraph::lower(&query.body);
    let value = {
        let mut interpreter = Interpreter::new(&plan, graph, env, &imports, abort);
        let value = interpreter.eval(plan.root)?;
        debug!(
            nodes = plan.node_count(),
            paths = plan.path_count(),
            evaluated = interpreter.evaluated,
            "query interpreted"
        );
        value
    };

    if let Some(name) = &query.store_as {
        env.set(name.clone(), value.clone());
    }
    Ok(value)
}

enum Flow {
    Continue,
    Stop,
}

type Visitor<'v, 'a> = dyn FnMut(&mut Interpreter<'a>) -> Result<Flow> + 'v;

struct Interpreter<'a> {
    plan: &'a EvaluatorGraph,
    graph: Option<&'a Graph>,
    env: &'a Environment,
    imports: &'a Imports,
    types: Option<TypeCache<'a>>,
    scopes: Vec<(String, Value)>,
    views: Vec<Arc<SubgraphMarker>>,
    abort: &'a AbortHandle,
    evaluated: usize,
}

impl<'a> Interpreter<'a> {
    fn new(
        plan: &'a EvaluatorGraph,
        graph: Option<&'a Graph>,
        env: &'a Environment,
        imports: &'a Imports,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            plan,
            graph,
            env,
            imports,
            types: graph.map(|g| TypeCache::new(g.schema(), imports)),
            scopes: Vec::new(),
            views: Vec::new(),
            abort,
            evaluated: 0,
        }
    }

    fn view(&self) -> Option<GraphView<'_>> {
        self.graph.map(|graph| match self.views.last() {
            Some(marker) => GraphView::restricted(graph, marker),
            None => GraphView::new(graph),
        })
    }

    fn require_view(&self) -> Result<GraphView<'_>> {
        self.view().ok_or_else(no_graph)
    }

    fn types(&self, expression: &TypeExpression, kind: ElementKind) -> Result<Arc<TypeCollection>> {
        self.types
            .as_ref()
            .ok_or_else(no_graph)?
            .get(expression, kind)
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some((_, value)) = self.scopes.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
    }

    fn eval_all(&mut self, ids: &[NodeId]) -> Result<Vec<Value>> {
        ids.iter().map(|&id| self.eval(id)).collect()
    }

    fn eval(&mut self, id: NodeId) -> Result<Value> {
        self.abort.check()?;
        self.evaluated += 1;
        let plan = self.plan;
        match &plan.nodes[id] {
            Node::Constant(value) => Ok(value.clone()),
            Node::Variable(name) => self.lookup(name),
            Node::VertexSet(types) => {
                let view = self.require_view()?;
                Ok(match types {
                    None => Value::vertex_set(view.vertices()),
                    Some(t) => {
                        let collection = self.types(t, ElementKind::Vertex)?;
                        Value::vertex_set(view.vertices_of_type(&collection))
                    }
                })
            }
            Node::EdgeSet(types) => {
                let view = self.require_view()?;
                Ok(match types {
                    None => Value::edge_set(view.edges()),
                    Some(t) => {
                        let collection = self.types(t, ElementKind::Edge)?;
                        Value::edge_set(view.edges_of_type(&collection))
                    }
                })
            }
            Node::Call { name, args } => {
                let args = self.eval_all(args)?;
                let context = FunctionContext {
                    graph: self.graph,
                    view: self.view(),
                    imports: self.imports,
                };
                functions::call(name, &args, &context)
            }
            Node::Unary { op, operand } => {
                let value = self.eval(*operand)?;
                operators::unary(*op, value)
            }
            Node::Binary { op, left, right } => self.binary(*op, *left, *right),
            Node::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.eval(*condition)?;
                if truth(&condition, "conditional")? {
                    self.eval(*then_branch)
                } else {
                    self.eval(*else_branch)
                }
            }
            Node::List(items) => Ok(Value::List(self.eval_all(items)?)),
            Node::Range { start, end } => {
                let start = self.eval(*start)?;
                let end = self.eval(*end)?;
                operators::range(&start, &end)
            }
            Node::Set(items) => Ok(Value::Set(self.eval_all(items)?.into_iter().collect())),
            Node::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            Node::Record(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    values.push((name.clone(), self.eval(*field)?));
                }
                Ok(operators::record(values))
            }
            Node::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = self.eval(*key)?;
                    let value = self.eval(*value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Node::Attribute { target, name } => {
                let target = self.eval(*target)?;
                operators::attribute(self.graph, &target, name)
            }
            Node::Index { target, index } => {
                let target = self.eval(*target)?;
                let index = self.eval(*index)?;
                operators::index(&target, &index)
            }
            Node::Let { bindings, body } => {
                let mark = self.scopes.len();
                let result = self.bind_let(bindings, *body);
                self.scopes.truncate(mark);
                result
            }
            Node::Quantified {
                quantifier,
                declarations,
                predicate,
            } => self.quantified(*quantifier, declarations, *predicate),
            Node::Comprehension {
                declarations,
                constraint,
                report,
            } => self.comprehension(declarations, *constraint, report),
            Node::On { subgraph, body } => {
                let subgraph = self.eval(*subgraph)?;
                let marker = expect_subgraph(&subgraph)?;
                if self.graph.is_none() {
                    return Err(no_graph());
                }
                self.views.push(marker);
                let result = self.eval(*body);
                self.views.pop();
                result
            }
            Node::Existence {
                start,
                path,
                target,
            } => {
                let start = self.eval(*start)?;
                let target = self.eval(*target)?;
                let start = expect_vertex(&start, "path start")?;
                let target = expect_vertex(&target, "path target")?;
                self.require_view()?;
                let automaton = Automaton::build(&self.prepare(*path)?, false);
                search::reaches(&self.require_view()?, &automaton, start, target, self.abort)
                    .map(Value::Bool)
            }
            Node::Forward { start, path } => {
                let start = self.eval(*start)?;
                let start = expect_vertex(&start, "path start")?;
                self.require_view()?;
                let automaton = Automaton::build(&self.prepare(*path)?, false);
                search::reachable(&self.require_view()?, &automaton, start, self.abort)
                    .map(Value::vertex_set)
            }
            Node::Backward { path, target } => {
                let target = self.eval(*target)?;
                let target = expect_vertex(&target, "path target")?;
                self.require_view()?;
                let automaton = Automaton::build(&self.prepare(*path)?, true);
                search::reachable(&self.require_view()?, &automaton, target, self.abort)
                    .map(Value::vertex_set)
            }
            Node::System { start, path } => {
                let start = self.eval(*start)?;
                let start = expect_vertex(&start, "path start")?;
                self.require_view()?;
                let automaton = Automaton::build(&self.prepare(*path)?, false);
                let system = search::path_system(&self.require_view()?, &automaton, start, self.abort)?;
                Ok(Value::PathSystem(Arc::new(system)))
            }
            Node::TypeSubgraph { kind, types } => {
                let view = self.require_view()?;
                let collection = self.types(types, *kind)?;
                let marker = match kind {
                    ElementKind::Edge => view.edge_type_subgraph(&collection),
                    _ => view.vertex_type_subgraph(&collection),
                };
                Ok(Value::Subgraph(Arc::new(marker)))
            }
        }
    }

    fn binary(&mut self, op: BinaryOperator, left: NodeId, right: NodeId) -> Result<Value> {
        let left = self.eval(left)?;
        match op {
            BinaryOperator::And => {
                if !truth(&left, "and")? {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(right)?;
                Ok(Value::Bool(truth(&right, "and")?))
            }
            BinaryOperator::Or => {
                if truth(&left, "or")? {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(right)?;
                Ok(Value::Bool(truth(&right, "or")?))
            }
            _ => {
                let right = self.eval(right)?;
                operators::binary(op, left, right)
            }
        }
    }

    fn bind_let(&mut self, bindings: &[(String, NodeId)], body: NodeId) -> Result<Value> {
        for (name, value) in bindings {
            let value = self.eval(*value)?;
            self.scopes.push((name.clone(), value));
        }
        self.eval(body)
    }

    /// Enumerate all variable bindings of `decls`. A declaration's domain is
    /// evaluated once per binding of the declarations before it.
    fn bind_all(&mut self, decls: &[Decl], index: usize, visit: &mut Visitor<'_, 'a>) -> Result<Flow> {
        let decl = match decls.get(index) {
            Some(decl) => decl,
            None => return visit(self),
        };
        let domain = self.eval(decl.domain)?;
        let elements = domain_elements(&domain)?;
        self.bind_variables(decls, index, 0, &elements, visit)
    }

    fn bind_variables(
        &mut self,
        decls: &[Decl],
        index: usize,
        variable: usize,
        elements: &[Value],
        visit: &mut Visitor<'_, 'a>,
    ) -> Result<Flow> {
        let name = match decls[index].variables.get(variable) {
            Some(name) => name,
            None => return self.bind_all(decls, index + 1, visit),
        };
        for element in elements {
            self.scopes.push((name.clone(), element.clone()));
            let flow = self.bind_variables(decls, index, variable + 1, elements, visit);
            self.scopes.pop();
            if let Flow::Stop = flow? {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn quantified(&mut self, quantifier: Quantifier, decls: &[Decl], predicate: NodeId) -> Result<Value> {
        let mut verdict = None;
        let mut holds = 0usize;
        self.bind_all(decls, 0, &mut |it: &mut Interpreter<'a>| {
            let value = it.eval(predicate)?;
            let satisfied = truth(&value, "quantified predicate")?;
            Ok(match quantifier {
                Quantifier::Forall if !satisfied => {
                    verdict = Some(false);
                    Flow::Stop
                }
                Quantifier::Exists if satisfied => {
                    verdict = Some(true);
                    Flow::Stop
                }
                Quantifier::ExistsOne if satisfied => {
                    holds += 1;
                    if holds > 1 {
                        verdict = Some(false);
                        Flow::Stop
                    } else {
                        Flow::Continue
                    }
                }
                _ => Flow::Continue,
            })
        })?;
        Ok(Value::Bool(verdict.unwrap_or(match quantifier {
            Quantifier::Forall => true,
            Quantifier::Exists => false,
            Quantifier::ExistsOne => holds == 1,
        })))
    }

    fn comprehension(
        &mut self,
        decls: &[Decl],
        constraint: Option<NodeId>,
        report: &ReportNodes,
    ) -> Result<Value> {
        let mut rows = Vec::new();
        let mut entries = Vec::new();
        self.bind_all(decls, 0, &mut |it: &mut Interpreter<'a>| {
            if let Some(constraint) = constraint {
                let value = it.eval(constraint)?;
                if !truth(&value, "with")? {
                    return Ok(Flow::Continue);
                }
            }
            match report {
                ReportNodes::List(columns) | ReportNodes::Set(columns) => {
                    rows.push(report_row(it.eval_all(columns)?));
                }
                ReportNodes::Map(key, value) => {
                    let key = it.eval(*key)?;
                    let value = it.eval(*value)?;
                    entries.push((key, value));
                }
            }
            Ok(Flow::Continue)
        })?;
        Ok(match report {
            ReportNodes::List(_) => Value::List(rows),
            ReportNodes::Set(_) => Value::Set(rows.into_iter().collect::<BTreeSet<_>>()),
            ReportNodes::Map(..) => Value::Map(entries.into_iter().collect()),
        })
    }

    /// Resolve restrictions, evaluate edge expressions and check exponents,
    /// node by node in pre-order.
    fn prepare(&mut self, id: PathId) -> Result<PreparedPath> {
        let plan = self.plan;
        let node = &plan.paths[id];
        let start = node
            .start
            .as_ref()
            .map(|t| self.types(t, ElementKind::Vertex))
            .transpose()?;
        let goal = node
            .goal
            .as_ref()
            .map(|t| self.types(t, ElementKind::Vertex))
            .transpose()?;
        let kind = match &node.kind {
            PathNodeKind::Simple {
                direction,
                aggregation,
                restriction,
            } => {
                let types = restriction
                    .as_ref()
                    .map(|t| self.types(t, ElementKind::Edge))
                    .transpose()?;
                PreparedKind::Hop(HopSpec::new(*direction, *aggregation, types, None))
            }
            PathNodeKind::Edge { direction, edge } => {
                let value = self.eval(*edge)?;
                let edge = expect_edge(&value, "edge path")?;
                PreparedKind::Hop(HopSpec::new(*direction, None, None, Some(edge)))
            }
            PathNodeKind::Sequence(items) => PreparedKind::Sequence(self.prepare_all(items)?),
            PathNodeKind::Alternative(items) => PreparedKind::Alternative(self.prepare_all(items)?),
            PathNodeKind::Optional(inner) => PreparedKind::Optional(Box::new(self.prepare(*inner)?)),
            PathNodeKind::Star(inner) => PreparedKind::Star(Box::new(self.prepare(*inner)?)),
            PathNodeKind::Plus(inner) => PreparedKind::Plus(Box::new(self.prepare(*inner)?)),
            PathNodeKind::Exponent(_, 0) => {
                return Err(Error::greql("path exponent must be at least 1"))
            }
            PathNodeKind::Exponent(inner, n) => {
                PreparedKind::Exponent(Box::new(self.prepare(*inner)?), *n)
            }
            PathNodeKind::Group(inner) => PreparedKind::Group(Box::new(self.prepare(*inner)?)),
            PathNodeKind::Transposed(inner) => {
                PreparedKind::Transposed(Box::new(self.prepare(*inner)?))
            }
        };
        Ok(PreparedPath { kind, start, goal })
    }

    fn prepare_all(&mut self, ids: &[PathId]) -> Result<Vec<PreparedPath>> {
        ids.iter().map(|&id| self.prepare(id)).collect()
    }
}
