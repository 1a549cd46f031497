//! 错误类型定义

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("查询解析错误 (位置 {offset}): {message}")]
    ParseError { message: String, offset: usize },

    #[error("未知类型: {0}")]
    UnknownType(String),

    #[error("未定义变量: {0}")]
    UndefinedVariable(String),

    #[error("GReQL 求值错误: {0}")]
    GreqlError(String),

    #[error("查询已中止")]
    Aborted,

    #[error("Schema 错误: {0}")]
    SchemaError(String),

    #[error("顶点不存在: {0}")]
    VertexNotFound(u32),

    #[error("边不存在: {0}")]
    EdgeNotFound(u32),

    #[error("图结构错误: {0}")]
    GraphError(String),

    #[error("导入错误: {0}")]
    ImportError(String),

    #[error("IO 错误: {0}")]
    IoError(String),

    #[error("序列化错误: {0}")]
    SerializationError(String),
}

/// Coarse classification of an [`Error`], comparable across execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Parse,
    UnknownType,
    UndefinedVariable,
    Greql,
    Aborted,
    Schema,
    Graph,
    Import,
    Io,
    Serialization,
}

impl Error {
    /// Build a parse error located at a byte offset of the query text.
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Error::ParseError {
            message: message.into(),
            offset,
        }
    }

    /// Build an evaluation error.
    pub fn greql(message: impl Into<String>) -> Self {
        Error::GreqlError(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParseError { .. } => ErrorKind::Parse,
            Error::UnknownType(_) => ErrorKind::UnknownType,
            Error::UndefinedVariable(_) => ErrorKind::UndefinedVariable,
            Error::GreqlError(_) => ErrorKind::Greql,
            Error::Aborted => ErrorKind::Aborted,
            Error::SchemaError(_) => ErrorKind::Schema,
            Error::VertexNotFound(_) | Error::EdgeNotFound(_) | Error::GraphError(_) => {
                ErrorKind::Graph
            }
            Error::ImportError(_) => ErrorKind::Import,
            Error::IoError(_) => ErrorKind::Io,
            Error::SerializationError(_) => ErrorKind::Serialization,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::parse("x", 3).kind(), ErrorKind::Parse);
        assert_eq!(Error::greql("x").kind(), ErrorKind::Greql);
        assert_eq!(Error::VertexNotFound(1).kind(), ErrorKind::Graph);
        assert_eq!(Error::EdgeNotFound(1).kind(), ErrorKind::Graph);
    }

    #[test]
    fn test_parse_error_display_has_offset() {
        let e = Error::parse("unexpected '}'", 12);
        assert!(e.to_string().contains("12"));
    }
}
