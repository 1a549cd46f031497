//! 查询环境
//!
//! 调用方持有的变量表：`using` 从中读取，`store as` 向其中写入。
//! 同一个环境不能被多个求值同时修改（`evaluate` 需要 `&mut`）。

use crate::types::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// 变量名到值的映射（保持插入顺序）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// 绑定变量，返回旧值
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.bindings.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (name, value) in iter {
            env.set(name, value);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut env = Environment::new();
        assert!(env.set("x", Value::Int(1)).is_none());
        assert_eq!(env.set("x", Value::Int(2)), Some(Value::Int(1)));
        env.set("a", Value::Bool(true));
        assert_eq!(env.get("x"), Some(&Value::Int(2)));
        assert_eq!(env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), vec!["x", "a"]);
        assert_eq!(env.remove("x"), Some(Value::Int(2)));
        assert!(!env.contains("x"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_from_iter() {
        let env: Environment = vec![("k", Value::Int(3))].into_iter().collect();
        assert_eq!(env.get("k"), Some(&Value::Int(3)));
    }
}
