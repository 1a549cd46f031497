//! greql - 类型化图与 GReQL 正则路径查询
//!
//! 面向 grUML schema 约束的类型化图的查询工具包，支持：
//! - schema 类型格：顶点类、边类、关联类、多重继承与角色名
//! - 正则路径描述：顺序、选择、可选、`*`、`+`、`^n`、`^T`、类型限制
//! - 路径系统与子图视图
//! - 解释执行与编译执行两种方式，结果一致
//! - 多重性与约束校验、JSON 图文档导入

pub mod algorithm;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod import;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod types;
pub mod validation;

// 重导出常用类型
pub use algorithm::PathSystem;
pub use config::EngineConfig;
pub use error::{Error, ErrorKind, Result};
pub use graph::{Edge, EdgeId, Graph, GraphView, Vertex, VertexId};
pub use metrics::{global_metrics, ExecutionMode};
pub use query::{compile, evaluate, AbortHandle, Environment, ExecutableUnit, QueryEngine};
pub use schema::{Schema, SchemaBuilder};
pub use types::{Path, Value};
pub use validation::{GraphValidator, ValidationReport, Violation};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
