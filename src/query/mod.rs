//! GReQL 查询模块
//!
//! 查询文本经过 解析 → 优化 → {解释执行 | 编译执行} 得到一个 `Value`。
//! 两种执行方式彼此独立，但对同一查询给出相同的值或相同类别的错误。
//!
//! 主要特性:
//! - 正则路径描述: 顺序、选择、可选、`*`、`+`、`^n`、`^T`、类型限制
//! - 路径系统、可达性、前向/后向顶点集
//! - 子图视图 (`on`)、`using` / `store as` 环境绑定
//! - 量化表达式与 `from ... report ... end` 推导式

pub mod ast;
pub mod compiler;
pub mod env;
pub mod functions;
pub mod interpreter;
pub mod operators;
pub mod optimizer;
pub mod parser;

pub use ast::{
    BinaryOperator, BindingForm, Declaration, Expression, Import, Literal, PathDescription,
    PathKind, Quantifier, Query, Report, UnaryOperator,
};
pub use compiler::ExecutableUnit;
pub use env::Environment;
pub use parser::{parse, parse_path, GreqlParser};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::metrics::{global_metrics, ExecutionMode};
use crate::schema::Imports;
use crate::types::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// 中止
// ============================================================================

/// 粗粒度的中止开关：在节点求值之间和路径搜索的扩展之间检查
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 超过给定时长后自动中止
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// 请求中止（可从其他线程调用）
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// 两种执行方式共用的前置检查
// ============================================================================

/// 查询的 import 声明
pub(crate) fn imports_of(query: &Query) -> Imports {
    let mut imports = Imports::new();
    for import in &query.imports {
        match import {
            Import::Package(p) => imports.add_package(p.clone()),
            Import::Type(t) => imports.add_type(t.clone()),
        }
    }
    imports
}

/// import 必须存在于 schema 中（有图时），`using` 的名字必须已绑定
pub(crate) fn check_prelude(
    imports: &Imports,
    using: &[String],
    graph: Option<&Graph>,
    env: &Environment,
) -> Result<()> {
    if let Some(graph) = graph {
        imports.check(graph.schema())?;
    }
    for name in using {
        if !env.contains(name) {
            return Err(Error::UndefinedVariable(name.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// 入口
// ============================================================================

fn prepare(text: &str, optimize: bool) -> Result<Query> {
    let query = parse(text).map_err(|e| {
        global_metrics().record_failure(e.kind());
        e
    })?;
    Ok(if optimize {
        optimizer::optimize(&query)
    } else {
        query
    })
}

/// 解析、优化并解释执行一个查询
pub fn evaluate(text: &str, graph: Option<&Graph>, env: &mut Environment) -> Result<Value> {
    evaluate_with(text, graph, env, &AbortHandle::new())
}

pub fn evaluate_with(
    text: &str,
    graph: Option<&Graph>,
    env: &mut Environment,
    abort: &AbortHandle,
) -> Result<Value> {
    let query = prepare(text, true)?;
    interpreter::interpret(&query, graph, env, abort)
}

/// 解析、优化并编译为可重复执行的单元
pub fn compile(text: &str) -> Result<ExecutableUnit> {
    let query = prepare(text, true)?;
    let unit = compiler::lower(&query, text);
    global_metrics().record_unit_compiled();
    debug!(query = %text, slots = unit.slot_count(), "query compiled");
    Ok(unit)
}

/// 带配置的查询引擎
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.config.mode = mode;
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.timeout_ms = timeout.map(|t| t.as_millis() as u64);
    }

    /// 按配置生成本次执行的中止开关
    pub fn abort_handle(&self) -> AbortHandle {
        match self.config.timeout() {
            Some(timeout) => AbortHandle::with_timeout(timeout),
            None => AbortHandle::new(),
        }
    }

    pub fn evaluate(&self, text: &str, graph: Option<&Graph>, env: &mut Environment) -> Result<Value> {
        self.evaluate_with(text, graph, env, &self.abort_handle())
    }

    pub fn evaluate_with(
        &self,
        text: &str,
        graph: Option<&Graph>,
        env: &mut Environment,
        abort: &AbortHandle,
    ) -> Result<Value> {
        let query = prepare(text, self.config.optimize)?;
        debug!(query = %text, mode = %self.config.mode, "evaluating query");
        match self.config.mode {
            ExecutionMode::Interpreted => interpreter::interpret(&query, graph, env, abort),
            ExecutionMode::Compiled => compiler::lower(&query, text).execute_with(graph, env, abort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_handle() {
        let handle = AbortHandle::new();
        assert!(handle.check().is_ok());
        let shared = handle.clone();
        shared.abort();
        assert_eq!(handle.check(), Err(Error::Aborted));

        let expired = AbortHandle::with_timeout(Duration::from_millis(0));
        assert!(expired.is_aborted());
    }

    #[test]
    fn test_evaluate_without_graph() {
        let mut env = Environment::new();
        assert_eq!(evaluate("1 + 2 * 3", None, &mut env).unwrap(), Value::Int(7));
        assert_eq!(
            evaluate("V", None, &mut env).unwrap_err().kind(),
            crate::error::ErrorKind::Greql
        );
    }

    #[test]
    fn test_using_and_store() {
        let mut env = Environment::new();
        assert_eq!(
            evaluate("using x: x + 1", None, &mut env).unwrap_err(),
            Error::UndefinedVariable("x".into())
        );
        env.set("x", Value::Int(41));
        evaluate("using x: x + 1 store as y", None, &mut env).unwrap();
        assert_eq!(env.get("y"), Some(&Value::Int(42)));

        let unit = compile("using y: y * 2 store as z").unwrap();
        assert_eq!(unit.execute(None, &mut env).unwrap(), Value::Int(84));
        assert_eq!(env.get("z"), Some(&Value::Int(84)));
    }

    #[test]
    fn test_engine_modes_agree() {
        let mut env = Environment::new();
        let mut engine = QueryEngine::default();
        let text = "from x : list(1..5) with x % 2 = 1 report x * x end";
        let interpreted = engine.evaluate(text, None, &mut env).unwrap();
        engine.set_mode(ExecutionMode::Compiled);
        let compiled = engine.evaluate(text, None, &mut env).unwrap();
        assert_eq!(interpreted, compiled);
        assert_eq!(
            interpreted,
            Value::List(vec![Value::Int(1), Value::Int(9), Value::Int(25)])
        );
    }
}
