//! 性能指标收集模块
//!
//! 收集查询求值的运行时指标（按执行方式、按错误类别），并导出为
//! 可序列化快照或 Prometheus 文本格式

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 查询的执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// 树遍历解释执行
    Interpreted,
    /// 编译为可执行单元后执行
    Compiled,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Interpreted => write!(f, "interpreted"),
            ExecutionMode::Compiled => write!(f, "compiled"),
        }
    }
}

/// 系统全局指标
#[derive(Debug)]
pub struct Metrics {
    /// 查询统计
    query_stats: QueryStats,
    /// 失败分类统计
    failure_stats: FailureStats,
    /// 路径求值统计
    path_stats: PathStats,
    /// 启动时间
    start_time: Instant,
}

/// 查询统计
#[derive(Debug)]
struct QueryStats {
    /// 总查询数
    total_queries: AtomicU64,
    /// 解释执行的查询数
    interpreted_queries: AtomicU64,
    /// 编译执行的查询数
    compiled_queries: AtomicU64,
    /// 成功查询数
    success_queries: AtomicU64,
    /// 失败查询数
    failed_queries: AtomicU64,
    /// 查询总耗时（微秒）
    total_duration_us: AtomicU64,
    /// 慢查询数（>1s）
    slow_queries: AtomicU64,
    /// 生成的可执行单元数
    units_compiled: AtomicU64,
}

/// 按错误类别统计的失败数
#[derive(Debug)]
struct FailureStats {
    parse: AtomicU64,
    unknown_type: AtomicU64,
    undefined_variable: AtomicU64,
    greql: AtomicU64,
    aborted: AtomicU64,
    other: AtomicU64,
}

/// 路径求值统计
#[derive(Debug)]
struct PathStats {
    /// 路径搜索次数
    searches: AtomicU64,
    /// 访问过的（顶点, 自动机状态）对
    product_states: AtomicU64,
    /// 闭包不动点迭代轮数
    fixpoint_rounds: AtomicU64,
    /// 约束校验次数
    constraints_checked: AtomicU64,
}

/// 可导出的指标快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    // 查询指标
    pub total_queries: u64,
    pub interpreted_queries: u64,
    pub compiled_queries: u64,
    pub success_queries: u64,
    pub failed_queries: u64,
    pub avg_query_duration_ms: f64,
    pub slow_queries: u64,
    pub units_compiled: u64,
    pub qps: f64,

    // 失败分类
    pub parse_errors: u64,
    pub unknown_type_errors: u64,
    pub undefined_variable_errors: u64,
    pub greql_errors: u64,
    pub aborted_queries: u64,
    pub other_errors: u64,

    // 路径指标
    pub path_searches: u64,
    pub product_states_visited: u64,
    pub fixpoint_rounds: u64,
    pub constraints_checked: u64,

    // 系统指标
    pub uptime_seconds: u64,
}

/// Prometheus 格式指标
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    pub content: String,
}

impl Metrics {
    /// 创建新的指标收集器
    pub fn new() -> Self {
        Self {
            query_stats: QueryStats {
                total_queries: AtomicU64::new(0),
                interpreted_queries: AtomicU64::new(0),
                compiled_queries: AtomicU64::new(0),
                success_queries: AtomicU64::new(0),
                failed_queries: AtomicU64::new(0),
                total_duration_us: AtomicU64::new(0),
                slow_queries: AtomicU64::new(0),
                units_compiled: AtomicU64::new(0),
            },
            failure_stats: FailureStats {
                parse: AtomicU64::new(0),
                unknown_type: AtomicU64::new(0),
                undefined_variable: AtomicU64::new(0),
                greql: AtomicU64::new(0),
                aborted: AtomicU64::new(0),
                other: AtomicU64::new(0),
            },
            path_stats: PathStats {
                searches: AtomicU64::new(0),
                product_states: AtomicU64::new(0),
                fixpoint_rounds: AtomicU64::new(0),
                constraints_checked: AtomicU64::new(0),
            },
            start_time: Instant::now(),
        }
    }

    /// 记录查询开始
    pub fn record_query_start(&self, mode: ExecutionMode) -> QueryTimer {
        self.query_stats.total_queries.fetch_add(1, Ordering::Relaxed);
        match mode {
            ExecutionMode::Interpreted => &self.query_stats.interpreted_queries,
            ExecutionMode::Compiled => &self.query_stats.compiled_queries,
        }
        .fetch_add(1, Ordering::Relaxed);
        QueryTimer::new()
    }

    /// 记录查询完成；失败时给出错误类别
    pub fn record_query_complete(&self, timer: QueryTimer, failure: Option<ErrorKind>) {
        let duration = timer.elapsed();

        match failure {
            None => {
                self.query_stats.success_queries.fetch_add(1, Ordering::Relaxed);
            }
            Some(kind) => {
                self.query_stats.failed_queries.fetch_add(1, Ordering::Relaxed);
                self.record_failure(kind);
            }
        }

        self.query_stats
            .total_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        // 慢查询：超过1秒
        if duration.as_secs() >= 1 {
            self.query_stats.slow_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录失败类别（包括发生在求值之前的解析错误）
    pub fn record_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::Parse => &self.failure_stats.parse,
            ErrorKind::UnknownType => &self.failure_stats.unknown_type,
            ErrorKind::UndefinedVariable => &self.failure_stats.undefined_variable,
            ErrorKind::Greql => &self.failure_stats.greql,
            ErrorKind::Aborted => &self.failure_stats.aborted,
            _ => &self.failure_stats.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录编译出的可执行单元
    pub fn record_unit_compiled(&self) {
        self.query_stats.units_compiled.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次路径搜索及其访问的状态数
    pub fn record_path_search(&self, states: usize) {
        self.path_stats.searches.fetch_add(1, Ordering::Relaxed);
        self.path_stats
            .product_states
            .fetch_add(states as u64, Ordering::Relaxed);
    }

    /// 记录闭包不动点迭代轮数
    pub fn record_fixpoint_rounds(&self, rounds: usize) {
        self.path_stats
            .fixpoint_rounds
            .fetch_add(rounds as u64, Ordering::Relaxed);
    }

    /// 记录约束校验
    pub fn record_constraints_checked(&self, count: usize) {
        self.path_stats
            .constraints_checked
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let total_queries = load(&self.query_stats.total_queries);
        let total_duration_us = load(&self.query_stats.total_duration_us);
        let uptime = self.start_time.elapsed().as_secs();

        let avg_query_duration_ms = if total_queries > 0 {
            (total_duration_us as f64) / (total_queries as f64) / 1000.0
        } else {
            0.0
        };

        let qps = if uptime > 0 {
            (total_queries as f64) / (uptime as f64)
        } else {
            0.0
        };

        MetricsSnapshot {
            total_queries,
            interpreted_queries: load(&self.query_stats.interpreted_queries),
            compiled_queries: load(&self.query_stats.compiled_queries),
            success_queries: load(&self.query_stats.success_queries),
            failed_queries: load(&self.query_stats.failed_queries),
            avg_query_duration_ms,
            slow_queries: load(&self.query_stats.slow_queries),
            units_compiled: load(&self.query_stats.units_compiled),
            qps,
            parse_errors: load(&self.failure_stats.parse),
            unknown_type_errors: load(&self.failure_stats.unknown_type),
            undefined_variable_errors: load(&self.failure_stats.undefined_variable),
            greql_errors: load(&self.failure_stats.greql),
            aborted_queries: load(&self.failure_stats.aborted),
            other_errors: load(&self.failure_stats.other),
            path_searches: load(&self.path_stats.searches),
            product_states_visited: load(&self.path_stats.product_states),
            fixpoint_rounds: load(&self.path_stats.fixpoint_rounds),
            constraints_checked: load(&self.path_stats.constraints_checked),
            uptime_seconds: uptime,
        }
    }

    /// 导出为 Prometheus 格式
    pub fn to_prometheus(&self) -> PrometheusMetrics {
        let s = self.snapshot();
        let mut content = String::new();

        let mut metric = |name: &str, help: &str, kind: &str, value: String| {
            content.push_str(&format!("# HELP greql_{} {}\n", name, help));
            content.push_str(&format!("# TYPE greql_{} {}\n", name, kind));
            content.push_str(&format!("greql_{} {}\n", name, value));
        };

        // 查询指标
        metric("queries_total", "Total number of queries", "counter", s.total_queries.to_string());
        mode_metrics(&mut metric, &s);
        metric(
            "queries_success_total",
            "Number of successful queries",
            "counter",
            s.success_queries.to_string(),
        );
        metric(
            "queries_failed_total",
            "Number of failed queries",
            "counter",
            s.failed_queries.to_string(),
        );
        metric(
            "query_duration_avg_ms",
            "Average query duration in milliseconds",
            "gauge",
            format!("{:.2}", s.avg_query_duration_ms),
        );
        metric(
            "slow_queries_total",
            "Number of slow queries (>1s)",
            "counter",
            s.slow_queries.to_string(),
        );
        metric(
            "units_compiled_total",
            "Number of executable units produced",
            "counter",
            s.units_compiled.to_string(),
        );
        metric("qps", "Queries per second", "gauge", format!("{:.2}", s.qps));

        // 失败分类
        metric("parse_errors_total", "Queries rejected by the parser", "counter", s.parse_errors.to_string());
        metric(
            "unknown_type_errors_total",
            "Failures resolving type restrictions",
            "counter",
            s.unknown_type_errors.to_string(),
        );
        metric(
            "undefined_variable_errors_total",
            "References to unbound variables",
            "counter",
            s.undefined_variable_errors.to_string(),
        );
        metric("greql_errors_total", "Evaluation errors", "counter", s.greql_errors.to_string());
        metric("aborted_queries_total", "Aborted evaluations", "counter", s.aborted_queries.to_string());

        // 路径指标
        metric("path_searches_total", "Regular path searches", "counter", s.path_searches.to_string());
        metric(
            "product_states_visited_total",
            "Visited (vertex, automaton state) pairs",
            "counter",
            s.product_states_visited.to_string(),
        );
        metric(
            "fixpoint_rounds_total",
            "Closure fixpoint iterations",
            "counter",
            s.fixpoint_rounds.to_string(),
        );
        metric(
            "constraints_checked_total",
            "Schema constraints evaluated by the validator",
            "counter",
            s.constraints_checked.to_string(),
        );

        // 系统指标
        metric("uptime_seconds", "Process uptime in seconds", "counter", s.uptime_seconds.to_string());

        PrometheusMetrics { content }
    }

    /// 重置所有指标
    pub fn reset(&self) {
        let counters = [
            &self.query_stats.total_queries,
            &self.query_stats.interpreted_queries,
            &self.query_stats.compiled_queries,
            &self.query_stats.success_queries,
            &self.query_stats.failed_queries,
            &self.query_stats.total_duration_us,
            &self.query_stats.slow_queries,
            &self.query_stats.units_compiled,
            &self.failure_stats.parse,
            &self.failure_stats.unknown_type,
            &self.failure_stats.undefined_variable,
            &self.failure_stats.greql,
            &self.failure_stats.aborted,
            &self.failure_stats.other,
            &self.path_stats.searches,
            &self.path_stats.product_states,
            &self.path_stats.fixpoint_rounds,
            &self.path_stats.constraints_checked,
        ];
        for counter in counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 按执行方式拆分的查询数
fn mode_metrics(metric: &mut impl FnMut(&str, &str, &str, String), s: &MetricsSnapshot) {
    metric(
        "queries_interpreted_total",
        "Queries run by the interpreter",
        "counter",
        s.interpreted_queries.to_string(),
    );
    metric(
        "queries_compiled_total",
        "Queries run as executable units",
        "counter",
        s.compiled_queries.to_string(),
    );
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 查询计时器
pub struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// 全局指标实例
static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::new()));

/// 获取全局指标实例
pub fn global_metrics() -> Arc<Metrics> {
    METRICS.clone()
}
