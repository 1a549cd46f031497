//! 结果打印器
//!
//! 提供表格和垂直格式的结果输出。集合值按元素分行；元素为元组或记录时
//! 展开为多列，映射按键/值两列输出。

use crate::metrics::MetricsSnapshot;
use crate::query::Environment;
use crate::types::Value;
use crate::validation::ValidationReport;
use prettytable::{format, row, Cell, Row, Table};

/// 打印模式
#[derive(Clone, Copy, PartialEq)]
pub enum PrintMode {
    /// 表格模式
    Table,
    /// 垂直模式 (\G)
    Vertical,
}

/// 表格化后的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResultGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultGrid {
    /// 把查询结果展开为行和列
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Map(map) => Self {
                columns: vec!["key".into(), "value".into()],
                rows: map
                    .iter()
                    .map(|(k, v)| vec![k.to_string(), v.to_string()])
                    .collect(),
            },
            Value::Record(fields) => Self {
                columns: fields.keys().cloned().collect(),
                rows: vec![fields.values().map(|v| v.to_string()).collect()],
            },
            Value::List(_) | Value::Set(_) => {
                let items: Vec<&Value> = value.elements().map(|it| it.collect()).unwrap_or_default();
                Self::from_rows(&items)
            }
            other => Self {
                columns: vec![other.type_name().to_string()],
                rows: vec![vec![other.to_string()]],
            },
        }
    }

    fn from_rows(items: &[&Value]) -> Self {
        // 所有元素同形时展开为多列
        match items.first() {
            Some(Value::Tuple(first)) if items.iter().all(|v| matches!(v, Value::Tuple(t) if t.len() == first.len())) => {
                Self {
                    columns: (1..=first.len()).map(|i| format!("#{}", i)).collect(),
                    rows: items
                        .iter()
                        .map(|v| match v {
                            Value::Tuple(t) => t.iter().map(|c| c.to_string()).collect(),
                            _ => Vec::new(),
                        })
                        .collect(),
                }
            }
            Some(Value::Record(first))
                if items
                    .iter()
                    .all(|v| matches!(v, Value::Record(r) if r.keys().eq(first.keys()))) =>
            {
                Self {
                    columns: first.keys().cloned().collect(),
                    rows: items
                        .iter()
                        .map(|v| match v {
                            Value::Record(r) => r.values().map(|c| c.to_string()).collect(),
                            _ => Vec::new(),
                        })
                        .collect(),
                }
            }
            _ => Self {
                columns: vec!["value".into()],
                rows: items.iter().map(|v| vec![v.to_string()]).collect(),
            },
        }
    }
}

/// 结果打印器
pub struct Printer {
    mode: PrintMode,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(PrintMode::Table)
    }
}

impl Printer {
    pub fn new(mode: PrintMode) -> Self {
        Self { mode }
    }

    /// 设置打印模式
    pub fn set_mode(&mut self, mode: PrintMode) {
        self.mode = mode;
    }

    /// 打印查询结果
    pub fn print_value(&self, value: &Value, execution_time_ms: u64) -> String {
        let grid = ResultGrid::from_value(value);
        if grid.rows.is_empty() {
            return format!("Empty {} ({} ms)\n", value.type_name(), execution_time_ms);
        }

        let output = match self.mode {
            PrintMode::Table => self.format_table(&grid),
            PrintMode::Vertical => self.format_vertical(&grid),
        };

        format!(
            "{}{} row(s) of {} ({} ms)\n",
            output,
            grid.rows.len(),
            value.type_name(),
            execution_time_ms
        )
    }

    /// 表格格式
    fn format_table(&self, grid: &ResultGrid) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        let header: Vec<Cell> = grid.columns.iter().map(|c| Cell::new(c)).collect();
        table.set_titles(Row::new(header));

        for row_data in &grid.rows {
            let cells: Vec<Cell> = row_data.iter().map(|v| Cell::new(v)).collect();
            table.add_row(Row::new(cells));
        }

        table.to_string()
    }

    /// 垂直格式
    fn format_vertical(&self, grid: &ResultGrid) -> String {
        let max_col_width = grid.columns.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut output = String::new();

        for (i, row_data) in grid.rows.iter().enumerate() {
            output.push_str(&format!(
                "*************************** {}. row ***************************\n",
                i + 1
            ));

            for (j, col) in grid.columns.iter().enumerate() {
                let value = row_data.get(j).map(|s| s.as_str()).unwrap_or("");
                output.push_str(&format!("{:>width$}: {}\n", col, value, width = max_col_width));
            }
        }

        output
    }

    /// 打印指标快照
    pub fn print_stats(&self, s: &MetricsSnapshot) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Metric", "Value"]);
        table.add_row(row!["Queries", s.total_queries]);
        table.add_row(row!["  interpreted", s.interpreted_queries]);
        table.add_row(row!["  compiled", s.compiled_queries]);
        table.add_row(row!["  failed", s.failed_queries]);
        table.add_row(row!["Avg duration (ms)", format!("{:.3}", s.avg_query_duration_ms)]);
        table.add_row(row!["Units compiled", s.units_compiled]);
        table.add_row(row!["Parse errors", s.parse_errors]);
        table.add_row(row!["Unknown type errors", s.unknown_type_errors]);
        table.add_row(row!["Undefined variables", s.undefined_variable_errors]);
        table.add_row(row!["Evaluation errors", s.greql_errors]);
        table.add_row(row!["Aborted", s.aborted_queries]);
        table.add_row(row!["Path searches", s.path_searches]);
        table.add_row(row!["Product states", s.product_states_visited]);
        table.add_row(row!["Fixpoint rounds", s.fixpoint_rounds]);
        table.add_row(row!["Constraints checked", s.constraints_checked]);
        table.to_string()
    }

    /// 打印环境变量
    pub fn print_env(&self, env: &Environment) -> String {
        if env.is_empty() {
            return "Environment is empty\n".to_string();
        }
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["Name", "Type", "Value"]);
        for (name, value) in env.iter() {
            table.add_row(row![name, value.type_name(), value]);
        }
        table.to_string()
    }

    /// 打印校验结果
    pub fn print_validation(&self, report: &ValidationReport) -> String {
        if report.is_valid() {
            return format!(
                "Graph is valid ({} constraint(s) checked)\n",
                report.constraints_checked
            );
        }
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);
        table.set_titles(row!["#", "Violation"]);
        for (i, violation) in report.violations.iter().enumerate() {
            table.add_row(row![i + 1, violation]);
        }
        format!(
            "{}{} violation(s), {} constraint(s) checked\n",
            table,
            report.violations.len(),
            report.constraints_checked
        )
    }
}

/// 检查查询是否以 \G 结尾（垂直显示）
pub fn check_vertical_display(query: &str) -> (String, bool) {
    let trimmed = query.trim();
    if trimmed.ends_with("\\G") || trimmed.ends_with("\\g") {
        let clean_query = trimmed[..trimmed.len() - 2].trim().to_string();
        (clean_query, true)
    } else {
        (trimmed.to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_grid_of_tuples() {
        let value = Value::List(vec![
            Value::Tuple(vec![Value::Int(1), Value::Str("a".into())]),
            Value::Tuple(vec![Value::Int(2), Value::Str("b".into())]),
        ]);
        let grid = ResultGrid::from_value(&value);
        assert_eq!(grid.columns, vec!["#1", "#2"]);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0][0], "1");
    }

    #[test]
    fn test_grid_of_scalars_and_maps() {
        let grid = ResultGrid::from_value(&Value::Int(7));
        assert_eq!(grid.columns, vec!["Integer"]);
        assert_eq!(grid.rows, vec![vec!["7".to_string()]]);

        let mut map = BTreeMap::new();
        map.insert(Value::Int(1), Value::Bool(true));
        let grid = ResultGrid::from_value(&Value::Map(map));
        assert_eq!(grid.columns, vec!["key", "value"]);
        assert_eq!(grid.rows.len(), 1);

        // 元素不同形时退回单列
        let mixed = Value::List(vec![Value::Int(1), Value::Tuple(vec![Value::Int(2)])]);
        assert_eq!(ResultGrid::from_value(&mixed).columns, vec!["value"]);
    }

    #[test]
    fn test_print_empty_and_vertical() {
        let printer = Printer::default();
        assert!(printer
            .print_value(&Value::List(Vec::new()), 0)
            .starts_with("Empty List"));

        let vertical = Printer::new(PrintMode::Vertical);
        let out = vertical.print_value(&Value::List(vec![Value::Int(3)]), 1);
        assert!(out.contains("1. row"));
        assert!(out.contains("value: 3"));
    }

    #[test]
    fn test_check_vertical_display() {
        assert_eq!(check_vertical_display("V \\G"), ("V".to_string(), true));
        assert_eq!(check_vertical_display(" count(V) "), ("count(V)".to_string(), false));
    }
}
