//! Value-level semantics of GReQL operators
//!
//! Both executors call into this module for everything that does not
//! depend on how evaluation is organised: arithmetic, comparison,
//! attribute and index access, domains of declarations.

use crate::error::{Error, Result};
use crate::graph::{EdgeId, Graph, SubgraphMarker, VertexId};
use crate::query::ast::{BinaryOperator, UnaryOperator};
use crate::types::Value;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Boolean operand of `and` / `or` / `xor` / `not`, conditions and predicates.
pub fn truth(value: &Value, context: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(Error::greql(format!(
            "{} expects a Boolean, got {}",
            context,
            other.type_name()
        ))),
    }
}

pub fn expect_vertex(value: &Value, context: &str) -> Result<VertexId> {
    match value {
        Value::Vertex(v) => Ok(*v),
        other => Err(Error::greql(format!(
            "{} expects a vertex, got {}",
            context,
            other.type_name()
        ))),
    }
}

pub fn expect_edge(value: &Value, context: &str) -> Result<EdgeId> {
    match value {
        Value::Edge(e) => Ok(*e),
        other => Err(Error::greql(format!(
            "{} expects an edge, got {}",
            context,
            other.type_name()
        ))),
    }
}

pub fn expect_subgraph(value: &Value) -> Result<Arc<SubgraphMarker>> {
    match value {
        Value::Subgraph(marker) => Ok(marker.clone()),
        other => Err(Error::greql(format!(
            "'on' expects a subgraph, got {}",
            other.type_name()
        ))),
    }
}

pub fn unary(op: UnaryOperator, value: Value) -> Result<Value> {
    match (op, value) {
        (_, Value::Undefined) => Ok(Value::Undefined),
        (UnaryOperator::Not, v) => Ok(Value::Bool(!truth(&v, "not")?)),
        (UnaryOperator::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| Error::greql("integer overflow")),
        (UnaryOperator::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOperator::Neg, v) => Err(Error::greql(format!("cannot negate {}", v.type_name()))),
    }
}

/// Equality that treats `1` and `1.0` as equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_), Value::Double(_)) | (Value::Double(_), Value::Int(_)) => {
            a.as_number() == b.as_number()
        }
        _ => a == b,
    }
}

pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            let (x, y) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
            Ok(x.total_cmp(&y))
        }
        (Value::Str(x), Value::Str(y)) | (Value::Enum(x), Value::Enum(y)) => Ok(x.cmp(y)),
        _ => Err(Error::greql(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn regex_matches(text: &str, pattern: &str) -> Result<bool> {
    let mut cache = REGEX_CACHE.lock();
    if let Some(re) = cache.get(pattern) {
        return Ok(re.is_match(text));
    }
    let re = Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::greql(format!("invalid regular expression '{}': {}", pattern, e)))?;
    let matched = re.is_match(text);
    cache.insert(pattern.to_string(), re);
    Ok(matched)
}

fn arithmetic(
    op: BinaryOperator,
    a: &Value,
    b: &Value,
    ints: fn(i64, i64) -> Option<i64>,
    doubles: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => ints(*x, *y).map(Value::Int).ok_or_else(|| {
            if *y == 0 && matches!(op, BinaryOperator::Div | BinaryOperator::Mod) {
                Error::greql("division by zero")
            } else {
                Error::greql("integer overflow")
            }
        }),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => Ok(Value::Double(
            doubles(a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0)),
        )),
        _ => Err(Error::greql(format!(
            "operator {} not applicable to {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// Non-short-circuit binary operators. `and` / `or` only reach this when
/// both operands have been evaluated.
pub fn binary(op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOperator::And => Ok(Value::Bool(truth(&left, "and")? && truth(&right, "and")?)),
        BinaryOperator::Or => Ok(Value::Bool(truth(&left, "or")? || truth(&right, "or")?)),
        BinaryOperator::Xor => Ok(Value::Bool(truth(&left, "xor")? ^ truth(&right, "xor")?)),
        BinaryOperator::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOperator::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        _ if left.is_undefined() || right.is_undefined() => Ok(Value::Undefined),
        BinaryOperator::Match => match (&left, &right) {
            (Value::Str(text), Value::Str(pattern)) => Ok(Value::Bool(regex_matches(text, pattern)?)),
            _ => Err(Error::greql(format!(
                "=~ expects strings, got {} and {}",
                left.type_name(),
                right.type_name()
            ))),
        },
        BinaryOperator::Lt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Less)),
        BinaryOperator::Le => Ok(Value::Bool(compare(&left, &right)? != Ordering::Greater)),
        BinaryOperator::Gt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Greater)),
        BinaryOperator::Ge => Ok(Value::Bool(compare(&left, &right)? != Ordering::Less)),
        BinaryOperator::Add => match (&left, &right) {
            (Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, b))),
            (a, Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => arithmetic(op, &left, &right, i64::checked_add, |x, y| x + y),
        },
        BinaryOperator::Sub => arithmetic(op, &left, &right, i64::checked_sub, |x, y| x - y),
        BinaryOperator::Mul => arithmetic(op, &left, &right, i64::checked_mul, |x, y| x * y),
        BinaryOperator::Div => arithmetic(op, &left, &right, i64::checked_div, |x, y| x / y),
        BinaryOperator::Mod => arithmetic(op, &left, &right, i64::checked_rem, |x, y| x % y),
    }
}

/// `x.name` on vertices, edges and records.
pub fn attribute(graph: Option<&Graph>, target: &Value, name: &str) -> Result<Value> {
    let missing = || Error::greql(format!("{} has no attribute '{}'", target, name));
    match target {
        Value::Undefined => Ok(Value::Undefined),
        Value::Record(fields) => fields.get(name).cloned().ok_or_else(missing),
        Value::Vertex(v) => {
            let graph = graph.ok_or_else(no_graph)?;
            let vertex = graph.vertex(*v).ok_or(Error::VertexNotFound(v.0))?;
            vertex.attribute(name).cloned().ok_or_else(missing)
        }
        Value::Edge(e) => {
            let graph = graph.ok_or_else(no_graph)?;
            let edge = graph.edge(*e).ok_or(Error::EdgeNotFound(e.0))?;
            edge.attribute(name).cloned().ok_or_else(missing)
        }
        other => Err(Error::greql(format!(
            "attribute access on {}",
            other.type_name()
        ))),
    }
}

/// `x[i]` on lists, tuples and maps; out-of-range yields `null`.
pub fn index(target: &Value, index: &Value) -> Result<Value> {
    match (target, index) {
        (Value::Undefined, _) | (_, Value::Undefined) => Ok(Value::Undefined),
        (Value::List(items) | Value::Tuple(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Undefined)),
        (Value::Map(entries), key) => Ok(entries.get(key).cloned().unwrap_or(Value::Undefined)),
        (t, i) => Err(Error::greql(format!(
            "cannot index {} with {}",
            t.type_name(),
            i.type_name()
        ))),
    }
}

/// Elements a declared variable ranges over.
pub fn domain_elements(domain: &Value) -> Result<Vec<Value>> {
    match domain.elements() {
        Some(items) => Ok(items.cloned().collect()),
        None => Err(Error::greql(format!(
            "declaration domain must be a collection, got {}",
            domain.type_name()
        ))),
    }
}

/// Largest number of elements `list(a..b)` may produce
pub const MAX_RANGE_LEN: i128 = 10_000_000;

/// `list(a..b)`, inclusive on both ends.
pub fn range(start: &Value, end: &Value) -> Result<Value> {
    match (start, end) {
        (Value::Int(a), Value::Int(b)) => {
            let len = i128::from(*b) - i128::from(*a) + 1;
            if len > MAX_RANGE_LEN {
                return Err(Error::greql(format!(
                    "list range {}..{} has more than {} elements",
                    a, b, MAX_RANGE_LEN
                )));
            }
            Ok(Value::List((*a..=*b).map(Value::Int).collect()))
        }
        _ => Err(Error::greql(format!(
            "list range expects integers, got {} and {}",
            start.type_name(),
            end.type_name()
        ))),
    }
}

/// One reported row: a single value, or a tuple for several columns.
pub fn report_row(mut columns: Vec<Value>) -> Value {
    if columns.len() == 1 {
        columns.remove(0)
    } else {
        Value::Tuple(columns)
    }
}

pub fn record(fields: Vec<(String, Value)>) -> Value {
    Value::Record(fields.into_iter().collect::<BTreeMap<_, _>>())
}

pub fn no_graph() -> Error {
    Error::greql("query needs a graph but none was given")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_arithmetic() {
        assert_eq!(binary(BinaryOperator::Add, Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(
            binary(BinaryOperator::Mul, Value::Int(2), Value::Double(1.5)).unwrap(),
            Value::Double(3.0)
        );
        assert_eq!(
            binary(BinaryOperator::Add, Value::Str("a".into()), Value::Int(1)).unwrap(),
            Value::Str("a1".into())
        );
        assert!(matches!(
            binary(BinaryOperator::Div, Value::Int(1), Value::Int(0)),
            Err(Error::GreqlError(_))
        ));
        assert!(binary(BinaryOperator::Add, Value::Int(i64::MAX), Value::Int(1)).is_err());
        assert_eq!(
            binary(BinaryOperator::Sub, Value::Undefined, Value::Int(1)).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn test_comparison_and_equality() {
        assert!(values_equal(&Value::Int(1), &Value::Double(1.0)));
        assert_eq!(
            binary(BinaryOperator::Lt, Value::Str("a".into()), Value::Str("b".into())).unwrap(),
            Value::Bool(true)
        );
        assert!(binary(BinaryOperator::Lt, Value::Bool(true), Value::Int(1)).is_err());
        assert_eq!(
            binary(BinaryOperator::Eq, Value::Undefined, Value::Undefined).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_regex_match() {
        let m = |t: &str, p: &str| binary(BinaryOperator::Match, Value::Str(t.into()), Value::Str(p.into()));
        assert_eq!(m("Kassel", "K.*").unwrap(), Value::Bool(true));
        assert_eq!(m("xKassel", "K.*").unwrap(), Value::Bool(false));
        assert!(matches!(m("a", "("), Err(Error::GreqlError(_))));
    }

    #[test]
    fn test_logic_requires_booleans() {
        assert!(matches!(unary(UnaryOperator::Not, Value::Int(1)), Err(Error::GreqlError(_))));
        assert_eq!(
            binary(BinaryOperator::Xor, Value::Bool(true), Value::Bool(true)).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_index_and_range() {
        let list = range(&Value::Int(1), &Value::Int(3)).unwrap();
        assert_eq!(index(&list, &Value::Int(0)).unwrap(), Value::Int(1));
        assert_eq!(index(&list, &Value::Int(7)).unwrap(), Value::Undefined);
        assert_eq!(index(&list, &Value::Int(-1)).unwrap(), Value::Undefined);
        assert!(index(&Value::Int(1), &Value::Int(0)).is_err());
        assert_eq!(report_row(vec![Value::Int(1)]), Value::Int(1));
    }

    #[test]
    fn test_range_bounds() {
        assert_eq!(range(&Value::Int(3), &Value::Int(1)).unwrap(), Value::List(Vec::new()));
        assert_eq!(
            range(&Value::Int(i64::MAX), &Value::Int(i64::MAX)).unwrap(),
            Value::List(vec![Value::Int(i64::MAX)])
        );
        let err = range(&Value::Int(1), &Value::Int(10_000_000_000_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Greql);
        assert!(range(&Value::Int(i64::MIN), &Value::Int(i64::MAX)).is_err());
    }

    #[test]
    fn test_record_attribute() {
        let rec = record(vec![("a".into(), Value::Int(1))]);
        assert_eq!(attribute(None, &rec, "a").unwrap(), Value::Int(1));
        assert!(attribute(None, &rec, "b").is_err());
        assert!(matches!(
            attribute(None, &Value::Vertex(VertexId(1)), "name"),
            Err(Error::GreqlError(_))
        ));
    }
}
