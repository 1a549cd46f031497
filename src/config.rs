//! 引擎配置
//!
//! 可从 JSON 文件加载，缺省字段取默认值；命令行参数会覆盖文件中的设置。

use crate::error::Result;
use crate::metrics::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 查询引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 执行前是否改写路径描述
    pub optimize: bool,
    /// 默认执行方式
    pub mode: ExecutionMode,
    /// 单个查询的超时（毫秒），`None` 表示不限
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            mode: ExecutionMode::Interpreted,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 从 JSON 文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_json_str(r#"{"mode": "compiled"}"#).unwrap();
        assert!(config.optimize);
        assert_eq!(config.mode, ExecutionMode::Compiled);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"optimize": false, "timeout_ms": 250}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert!(!config.optimize);
        assert_eq!(config.mode, ExecutionMode::Interpreted);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{"),
            Err(Error::SerializationError(_))
        ));
    }
}
