//! GReQL Compiler
//!
//! Lowers an optimized query once into a tree of boxed closures, the
//! `ExecutableUnit`, which can then run any number of times against
//! different graphs and environments.
//!
//! Differences to the interpreter are internal only:
//! - local variables are resolved to frame slots at compile time; names
//!   that are not local are read from the environment when executed
//! - function definitions are looked up once, at compile time
//! - path descriptions become relational operators (see `paths`) instead
//!   of an automaton

mod paths;

use self::paths::{PathCode, Walk};
use crate::error::{Error, Result};
use crate::graph::{Graph, GraphView, SubgraphMarker};
use crate::metrics::{global_metrics, ExecutionMode};
use crate::query::ast::*;
use crate::query::env::Environment;
use crate::query::functions::{self, FunctionContext};
use crate::query::operators::{
    self, domain_elements, expect_subgraph, expect_vertex, no_graph, report_row, truth,
};
use crate::query::{check_prelude, imports_of, AbortHandle};
use crate::schema::{ElementKind, Imports, TypeCache, TypeCollection, TypeExpression};
use crate::types::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

pub(crate) type Code = Box<dyn Fn(&mut Frame<'_>) -> Result<Value> + Send + Sync>;

// ============================================================================
// Frame
// ============================================================================

/// Runtime state of one execution.
pub(crate) struct Frame<'r> {
    graph: Option<&'r Graph>,
    env: &'r Environment,
    imports: &'r Imports,
    types: Option<TypeCache<'r>>,
    slots: Vec<Value>,
    views: Vec<Arc<SubgraphMarker>>,
    abort: &'r AbortHandle,
}

impl<'r> Frame<'r> {
    fn new(
        graph: Option<&'r Graph>,
        env: &'r Environment,
        imports: &'r Imports,
        abort: &'r AbortHandle,
        slot_count: usize,
    ) -> Self {
        Self {
            graph,
            env,
            imports,
            types: graph.map(|g| TypeCache::new(g.schema(), imports)),
            slots: vec![Value::Undefined; slot_count],
            views: Vec::new(),
            abort,
        }
    }

    fn view(&self) -> Option<GraphView<'_>> {
        let graph = self.graph?;
        Some(match self.views.last() {
            Some(marker) => GraphView::restricted(graph, marker),
            None => GraphView::new(graph),
        })
    }

    fn require_view(&self) -> Result<GraphView<'_>> {
        self.view().ok_or_else(no_graph)
    }

    fn walk(&self) -> Result<Walk<'_>> {
        Ok(Walk {
            view: self.require_view()?,
            abort: self.abort,
        })
    }

    pub(crate) fn types(&self, expression: &TypeExpression, kind: ElementKind) -> Result<Arc<TypeCollection>> {
        self.types
            .as_ref()
            .ok_or_else(no_graph)?
            .get(expression, kind)
    }

    fn function_context(&self) -> FunctionContext<'_> {
        FunctionContext {
            graph: self.graph,
            view: self.view(),
            imports: self.imports,
        }
    }
}

fn run_all(codes: &[Code], frame: &mut Frame<'_>) -> Result<Vec<Value>> {
    codes.iter().map(|code| code(frame)).collect()
}

// ============================================================================
// Declarations
// ============================================================================

struct DeclCode {
    slots: Vec<usize>,
    domain: Code,
}

enum Flow {
    Continue,
    Stop,
}

/// Bind the variables of `decls[index..]` to every combination of domain
/// elements, first variable outermost, and call `visit` for each.
fn bind_all<'r>(
    frame: &mut Frame<'r>,
    decls: &[DeclCode],
    index: usize,
    visit: &mut dyn FnMut(&mut Frame<'r>) -> Result<Flow>,
) -> Result<Flow> {
    let decl = match decls.get(index) {
        Some(decl) => decl,
        None => return visit(frame),
    };
    let domain = (decl.domain)(frame)?;
    let elements = domain_elements(&domain)?;
    bind_slots(frame, decls, index, 0, &elements, visit)
}

fn bind_slots<'r>(
    frame: &mut Frame<'r>,
    decls: &[DeclCode],
    index: usize,
    variable: usize,
    elements: &[Value],
    visit: &mut dyn FnMut(&mut Frame<'r>) -> Result<Flow>,
) -> Result<Flow> {
    let slot = match decls[index].slots.get(variable) {
        Some(&slot) => slot,
        None => return bind_all(frame, decls, index + 1, visit),
    };
    for element in elements {
        frame.abort.check()?;
        frame.slots[slot] = element.clone();
        if let Flow::Stop = bind_slots(frame, decls, index, variable + 1, elements, visit)? {
            return Ok(Flow::Stop);
        }
    }
    Ok(Flow::Continue)
}

enum ReportCode {
    List(Vec<Code>),
    Set(Vec<Code>),
    Map(Code, Code),
}

// ============================================================================
// Compiler
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct Compiler {
    /// Local names in scope; a name's slot is its position
    scope: Vec<String>,
    slot_count: usize,
}

impl Compiler {
    fn resolve(&self, name: &str) -> Option<usize> {
        self.scope.iter().rposition(|n| n == name)
    }

    fn bind(&mut self, name: &str) -> usize {
        self.scope.push(name.to_string());
        self.slot_count = self.slot_count.max(self.scope.len());
        self.scope.len() - 1
    }

    fn compile_all(&mut self, items: &[Expression]) -> Vec<Code> {
        items.iter().map(|e| self.compile(e)).collect()
    }

    /// Compiles each domain before binding that declaration's variables.
    fn compile_declarations(&mut self, decls: &[Declaration]) -> Vec<DeclCode> {
        decls
            .iter()
            .map(|d| {
                let domain = self.compile(&d.domain);
                let slots = d.variables.iter().map(|v| self.bind(v)).collect();
                DeclCode { slots, domain }
            })
            .collect()
    }

    pub(crate) fn compile(&mut self, expr: &Expression) -> Code {
        match expr {
            Expression::Literal(lit) => {
                let value = match lit {
                    Literal::Bool(b) => Value::Bool(*b),
                    Literal::Int(i) => Value::Int(*i),
                    Literal::Double(d) => Value::Double(*d),
                    Literal::Str(s) => Value::Str(s.clone()),
                    Literal::Null => Value::Undefined,
                };
                Box::new(move |_| Ok(value.clone()))
            }
            Expression::Variable(name) => match self.resolve(name) {
                Some(slot) => Box::new(move |frame| Ok(frame.slots[slot].clone())),
                None => {
                    let name = name.clone();
                    Box::new(move |frame| {
                        frame
                            .env
                            .get(&name)
                            .cloned()
                            .ok_or_else(|| Error::UndefinedVariable(name.clone()))
                    })
                }
            },
            Expression::VertexSet(types) => {
                let types = types.clone();
                Box::new(move |frame| {
                    let view = frame.require_view()?;
                    Ok(match &types {
                        None => Value::vertex_set(view.vertices()),
                        Some(t) => {
                            let collection = frame.types(t, ElementKind::Vertex)?;
                            Value::vertex_set(view.vertices_of_type(&collection))
                        }
                    })
                })
            }
            Expression::EdgeSet(types) => {
                let types = types.clone();
                Box::new(move |frame| {
                    let view = frame.require_view()?;
                    Ok(match &types {
                        None => Value::edge_set(view.edges()),
                        Some(t) => {
                            let collection = frame.types(t, ElementKind::Edge)?;
                            Value::edge_set(view.edges_of_type(&collection))
                        }
                    })
                })
            }
            Expression::FunctionCall { name, args } => {
                let def = functions::lookup(name);
                let name = name.clone();
                let args = self.compile_all(args);
                Box::new(move |frame| {
                    let values = run_all(&args, frame)?;
                    match def {
                        Some(def) => def.invoke(&values, &frame.function_context()),
                        None => Err(functions::unknown_function(&name)),
                    }
                })
            }
            Expression::Unary { op, operand } => {
                let op = *op;
                let operand = self.compile(operand);
                Box::new(move |frame| operators::unary(op, operand(frame)?))
            }
            Expression::Binary { op, left, right } => {
                let op = *op;
                let left = self.compile(left);
                let right = self.compile(right);
                match op {
                    BinaryOperator::And => Box::new(move |frame| {
                        if !truth(&left(frame)?, "and")? {
                            return Ok(Value::Bool(false));
                        }
                        Ok(Value::Bool(truth(&right(frame)?, "and")?))
                    }),
                    BinaryOperator::Or => Box::new(move |frame| {
                        if truth(&left(frame)?, "or")? {
                            return Ok(Value::Bool(true));
                        }
                        Ok(Value::Bool(truth(&right(frame)?, "or")?))
                    }),
                    _ => Box::new(move |frame| {
                        let l = left(frame)?;
                        let r = right(frame)?;
                        operators::binary(op, l, r)
                    }),
                }
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.compile(condition);
                let then_branch = self.compile(then_branch);
                let else_branch = self.compile(else_branch);
                Box::new(move |frame| {
                    if truth(&condition(frame)?, "conditional")? {
                        then_branch(frame)
                    } else {
                        else_branch(frame)
                    }
                })
            }
            Expression::List(items) => {
                let items = self.compile_all(items);
                Box::new(move |frame| Ok(Value::List(run_all(&items, frame)?)))
            }
            Expression::ListRange { start, end } => {
                let start = self.compile(start);
                let end = self.compile(end);
                Box::new(move |frame| {
                    let s = start(frame)?;
                    let e = end(frame)?;
                    operators::range(&s, &e)
                })
            }
            Expression::Set(items) => {
                let items = self.compile_all(items);
                Box::new(move |frame| Ok(Value::Set(run_all(&items, frame)?.into_iter().collect())))
            }
            Expression::Tuple(items) => {
                let items = self.compile_all(items);
                Box::new(move |frame| Ok(Value::Tuple(run_all(&items, frame)?)))
            }
            Expression::Record(fields) => {
                let names: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();
                let values: Vec<Code> = fields.iter().map(|(_, e)| self.compile(e)).collect();
                Box::new(move |frame| {
                    let values = run_all(&values, frame)?;
                    Ok(operators::record(names.iter().cloned().zip(values).collect()))
                })
            }
            Expression::Map(entries) => {
                let entries: Vec<(Code, Code)> = entries
                    .iter()
                    .map(|(k, v)| (self.compile(k), self.compile(v)))
                    .collect();
                Box::new(move |frame| {
                    let mut map = BTreeMap::new();
                    for (key, value) in &entries {
                        let k = key(frame)?;
                        let v = value(frame)?;
                        map.insert(k, v);
                    }
                    Ok(Value::Map(map))
                })
            }
            Expression::AttributeAccess { target, attribute } => {
                let target = self.compile(target);
                let name = attribute.clone();
                Box::new(move |frame| {
                    let value = target(frame)?;
                    operators::attribute(frame.graph, &value, &name)
                })
            }
            Expression::IndexAccess { target, index } => {
                let target = self.compile(target);
                let index = self.compile(index);
                Box::new(move |frame| {
                    let t = target(frame)?;
                    let i = index(frame)?;
                    operators::index(&t, &i)
                })
            }
            Expression::Let { bindings, body, .. } => {
                let mark = self.scope.len();
                let mut compiled = Vec::with_capacity(bindings.len());
                for (name, value) in bindings {
                    let code = self.compile(value);
                    compiled.push((self.bind(name), code));
                }
                let body = self.compile(body);
                self.scope.truncate(mark);
                Box::new(move |frame| {
                    for (slot, code) in &compiled {
                        let value = code(frame)?;
                        frame.slots[*slot] = value;
                    }
                    body(frame)
                })
            }
            Expression::Quantified {
                quantifier,
                declarations,
                predicate,
            } => {
                let quantifier = *quantifier;
                let mark = self.scope.len();
                let decls = self.compile_declarations(declarations);
                let predicate = self.compile(predicate);
                self.scope.truncate(mark);
                Box::new(move |frame| {
                    let mut holds = 0usize;
                    let flow = bind_all(frame, &decls, 0, &mut |frame| {
                        let satisfied = truth(&predicate(frame)?, "quantified predicate")?;
                        if satisfied {
                            holds += 1;
                        }
                        let stop = match quantifier {
                            Quantifier::Forall => !satisfied,
                            Quantifier::Exists => satisfied,
                            Quantifier::ExistsOne => holds > 1,
                        };
                        Ok(if stop { Flow::Stop } else { Flow::Continue })
                    })?;
                    let stopped = matches!(flow, Flow::Stop);
                    Ok(Value::Bool(match quantifier {
                        Quantifier::Forall => !stopped,
                        Quantifier::Exists => stopped,
                        Quantifier::ExistsOne => holds == 1,
                    }))
                })
            }
            Expression::Comprehension {
                declarations,
                constraint,
                report,
            } => {
                let mark = self.scope.len();
                let decls = self.compile_declarations(declarations);
                let constraint = constraint.as_deref().map(|c| self.compile(c));
                let report = match report {
                    Report::List(items) => ReportCode::List(self.compile_all(items)),
                    Report::Set(items) => ReportCode::Set(self.compile_all(items)),
                    Report::Map(k, v) => ReportCode::Map(self.compile(k), self.compile(v)),
                };
                self.scope.truncate(mark);
                Box::new(move |frame| {
                    let mut rows = Vec::new();
                    let mut entries = BTreeMap::new();
                    bind_all(frame, &decls, 0, &mut |frame| {
                        if let Some(constraint) = &constraint {
                            if !truth(&constraint(frame)?, "with")? {
                                return Ok(Flow::Continue);
                            }
                        }
                        match &report {
                            ReportCode::List(columns) | ReportCode::Set(columns) => {
                                rows.push(report_row(run_all(columns, frame)?));
                            }
                            ReportCode::Map(key, value) => {
                                let k = key(frame)?;
                                let v = value(frame)?;
                                entries.insert(k, v);
                            }
                        }
                        Ok(Flow::Continue)
                    })?;
                    Ok(match &report {
                        ReportCode::List(_) => Value::List(rows),
                        ReportCode::Set(_) => Value::Set(rows.into_iter().collect::<BTreeSet<_>>()),
                        ReportCode::Map(..) => Value::Map(entries),
                    })
                })
            }
            Expression::On { subgraph, body } => {
                let subgraph = self.compile(subgraph);
                let body = self.compile(body);
                Box::new(move |frame| {
                    let marker = expect_subgraph(&subgraph(frame)?)?;
                    if frame.graph.is_none() {
                        return Err(no_graph());
                    }
                    frame.views.push(marker);
                    let result = body(frame);
                    frame.views.pop();
                    result
                })
            }
            Expression::PathExistence {
                start,
                path,
                target,
            } => {
                let start = self.compile(start);
                let target = self.compile(target);
                let path: PathCode = self.compile_path(path);
                Box::new(move |frame| {
                    let s = start(frame)?;
                    let t = target(frame)?;
                    let s = expect_vertex(&s, "path start")?;
                    let t = expect_vertex(&t, "path target")?;
                    frame.require_view()?;
                    let op = path(frame)?;
                    paths::reaches(op.as_ref(), &frame.walk()?, s, t).map(Value::Bool)
                })
            }
            Expression::ForwardVertexSet { start, path } => {
                let start = self.compile(start);
                let path = self.compile_path(path);
                Box::new(move |frame| {
                    let s = expect_vertex(&start(frame)?, "path start")?;
                    frame.require_view()?;
                    let op = path(frame)?;
                    paths::reachable(op.as_ref(), &frame.walk()?, s, false).map(Value::vertex_set)
                })
            }
            Expression::BackwardVertexSet { path, target } => {
                let path = self.compile_path(path);
                let target = self.compile(target);
                Box::new(move |frame| {
                    let t = expect_vertex(&target(frame)?, "path target")?;
                    frame.require_view()?;
                    let op = path(frame)?;
                    paths::reachable(op.as_ref(), &frame.walk()?, t, true).map(Value::vertex_set)
                })
            }
            Expression::PathSystem { start, path } => {
                let start = self.compile(start);
                let path = self.compile_path(path);
                Box::new(move |frame| {
                    let s = expect_vertex(&start(frame)?, "path start")?;
                    frame.require_view()?;
                    let op = path(frame)?;
                    let system = paths::path_system(op.as_ref(), &frame.walk()?, s)?;
                    Ok(Value::PathSystem(Arc::new(system)))
                })
            }
            Expression::SubgraphByType { kind, types } => {
                let kind = *kind;
                let types = types.clone();
                Box::new(move |frame| {
                    let view = frame.require_view()?;
                    let collection = frame.types(&types, kind)?;
                    let marker = match kind {
                        ElementKind::Edge => view.edge_type_subgraph(&collection),
                        _ => view.vertex_type_subgraph(&collection),
                    };
                    Ok(Value::Subgraph(Arc::new(marker)))
                })
            }
        }
    }
}

// ============================================================================
// Executable unit
// ============================================================================

/// A compiled query. Holds no reference to any graph; execution takes the
/// graph and environment as arguments.
pub struct ExecutableUnit {
    source: String,
    imports: Imports,
    using: Vec<String>,
    store_as: Option<String>,
    code: Code,
    slot_count: usize,
}

impl ExecutableUnit {
    /// Query text the unit was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of local variable slots a frame needs
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn execute(&self, graph: Option<&Graph>, env: &mut Environment) -> Result<Value> {
        self.execute_with(graph, env, &AbortHandle::new())
    }

    pub fn execute_with(
        &self,
        graph: Option<&Graph>,
        env: &mut Environment,
        abort: &AbortHandle,
    ) -> Result<Value> {
        let metrics = global_metrics();
        let timer = metrics.record_query_start(ExecutionMode::Compiled);
        let result = self.run(graph, env, abort);
        metrics.record_query_complete(timer, result.as_ref().err().map(Error::kind));
        result
    }

    fn run(&self, graph: Option<&Graph>, env: &mut Environment, abort: &AbortHandle) -> Result<Value> {
        check_prelude(&self.imports, &self.using, graph, env)?;
        abort.check()?;
        let value = {
            let mut frame = Frame::new(graph, env, &self.imports, abort, self.slot_count);
            (self.code)(&mut frame)?
        };
        if let Some(name) = &self.store_as {
            env.set(name.clone(), value.clone());
        }
        Ok(value)
    }
}

impl fmt::Debug for ExecutableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableUnit")
            .field("source", &self.source)
            .field("using", &self.using)
            .field("store_as", &self.store_as)
            .field("slot_count", &self.slot_count)
            .finish_non_exhaustive()
    }
}

/// Compile an optimized query.
pub(crate) fn lower(query: &Query, source: &str) -> ExecutableUnit {
    let mut compiler = Compiler::default();
    let code = compiler.compile(&query.body);
    ExecutableUnit {
        source: source.to_string(),
        imports: imports_of(query),
        using: query.using.clone(),
        store_as: query.store_as.clone(),
        code,
        slot_count: compiler.slot_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::query::optimizer::optimize;
    use crate::query::parser::parse;

    fn unit(text: &str) -> ExecutableUnit {
        let query = optimize(&parse(text).unwrap());
        lower(&query, text)
    }

    fn run_text(text: &str) -> Result<Value> {
        unit(text).execute(None, &mut Environment::new())
    }

    #[test]
    fn test_slots_are_reused_across_siblings() {
        let u = unit("(let a := 1 in a) + (let b := 2, c := 3 in b * c)");
        assert_eq!(u.slot_count(), 2);
        assert_eq!(u.execute(None, &mut Environment::new()).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_shadowing_and_free_names() {
        let mut env = Environment::new();
        env.set("x", Value::Int(10));
        let u = unit("x + (let x := 1 in x) + x");
        assert_eq!(u.execute(None, &mut env).unwrap(), Value::Int(21));
    }

    #[test]
    fn test_unknown_function_after_arguments() {
        assert_eq!(
            run_text("noSuchFunction(y)"),
            Err(Error::UndefinedVariable("y".into()))
        );
        assert_eq!(run_text("noSuchFunction(1)").unwrap_err().kind(), ErrorKind::Greql);
    }

    #[test]
    fn test_quantifier_short_circuit() {
        assert_eq!(run_text("forall x : list(1..3) @ (x = 3 ? 1 : x < 2)").unwrap(), Value::Bool(false));
        assert_eq!(run_text("exists! x : list(1..5) @ x > 3").unwrap(), Value::Bool(false));
        assert_eq!(run_text("exists! x : set() @ true").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_report_map_overwrites() {
        assert_eq!(
            run_text("from x : list(1..4) reportMap x % 2 -> x end").unwrap(),
            Value::Map([(Value::Int(0), Value::Int(4)), (Value::Int(1), Value::Int(3))].into_iter().collect())
        );
    }

    #[test]
    fn test_unit_is_reusable() {
        let u = unit("using n: from i : list(1..n) report i end");
        let mut env = Environment::new();
        env.set("n", Value::Int(2));
        assert_eq!(u.execute(None, &mut env).unwrap(), Value::List(vec![Value::Int(1), Value::Int(2)]));
        env.set("n", Value::Int(1));
        assert_eq!(u.execute(None, &mut env).unwrap(), Value::List(vec![Value::Int(1)]));
        assert!(format!("{:?}", u).contains("slot_count"));
    }
}
