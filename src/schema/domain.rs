//! Attribute domains

use crate::error::{Error, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value domain of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Boolean,
    Integer,
    Long,
    Double,
    String,
    Enum(Vec<String>),
    List(Box<Domain>),
    Set(Box<Domain>),
    Map(Box<Domain>, Box<Domain>),
    Record(Vec<(String, Domain)>),
}

impl Domain {
    /// Parse a domain name such as `Integer`, `List<String>`,
    /// `Map<String, Double>` or `Enum(RED, GREEN)`.
    pub fn parse(text: &str) -> Result<Domain> {
        let mut parser = DomainParser { input: text, pos: 0 };
        let domain = parser.domain()?;
        parser.skip_whitespace();
        if parser.pos != text.len() {
            return Err(Error::SchemaError(format!(
                "trailing input in domain '{}'",
                text
            )));
        }
        Ok(domain)
    }

    /// Initial value of a fresh attribute.
    pub fn default_value(&self) -> Value {
        match self {
            Domain::Boolean => Value::Bool(false),
            Domain::Integer | Domain::Long => Value::Int(0),
            Domain::Double => Value::Double(0.0),
            _ => Value::Undefined,
        }
    }

    /// Whether `value` may be stored in an attribute of this domain.
    pub fn conforms(&self, value: &Value) -> bool {
        match (self, value) {
            (Domain::Boolean, Value::Bool(_)) => true,
            (Domain::Integer, Value::Int(i)) => i32::try_from(*i).is_ok(),
            (Domain::Long, Value::Int(_)) => true,
            (Domain::Double, Value::Double(_)) | (Domain::Double, Value::Int(_)) => true,
            (Domain::Boolean | Domain::Integer | Domain::Long | Domain::Double, _) => false,
            (_, Value::Undefined) => true,
            (Domain::String, Value::Str(_)) => true,
            (Domain::Enum(constants), Value::Enum(c)) => constants.contains(c),
            (Domain::List(inner), Value::List(items)) => items.iter().all(|v| inner.conforms(v)),
            (Domain::Set(inner), Value::Set(items)) => items.iter().all(|v| inner.conforms(v)),
            (Domain::Map(k, v), Value::Map(entries)) => entries
                .iter()
                .all(|(key, value)| k.conforms(key) && v.conforms(value)),
            (Domain::Record(fields), Value::Record(values)) => {
                fields.len() == values.len()
                    && fields.iter().all(|(name, domain)| {
                        values.get(name).map_or(false, |v| domain.conforms(v))
                    })
            }
            _ => false,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Boolean => write!(f, "Boolean"),
            Domain::Integer => write!(f, "Integer"),
            Domain::Long => write!(f, "Long"),
            Domain::Double => write!(f, "Double"),
            Domain::String => write!(f, "String"),
            Domain::Enum(constants) => write!(f, "Enum({})", constants.join(", ")),
            Domain::List(inner) => write!(f, "List<{}>", inner),
            Domain::Set(inner) => write!(f, "Set<{}>", inner),
            Domain::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            Domain::Record(fields) => {
                write!(f, "Record(")?;
                for (i, (name, domain)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, domain)?;
                }
                write!(f, ")")
            }
        }
    }
}

struct DomainParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> DomainParser<'a> {
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.input[self.pos..].chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        if self.try_char(c) {
            Ok(())
        } else {
            Err(Error::SchemaError(format!(
                "expected '{}' in domain '{}'",
                c, self.input
            )))
        }
    }

    fn identifier(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.input[self.pos..].chars().next() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(Error::SchemaError(format!(
                "expected identifier in domain '{}'",
                self.input
            )));
        }
        Ok(&self.input[start..self.pos])
    }

    fn domain(&mut self) -> Result<Domain> {
        let name = self.identifier()?;
        match name {
            "Boolean" => Ok(Domain::Boolean),
            "Integer" => Ok(Domain::Integer),
            "Long" => Ok(Domain::Long),
            "Double" => Ok(Domain::Double),
            "String" => Ok(Domain::String),
            "List" | "Set" => {
                self.expect_char('<')?;
                let inner = Box::new(self.domain()?);
                self.expect_char('>')?;
                Ok(if name == "List" {
                    Domain::List(inner)
                } else {
                    Domain::Set(inner)
                })
            }
            "Map" => {
                self.expect_char('<')?;
                let key = Box::new(self.domain()?);
                self.expect_char(',')?;
                let value = Box::new(self.domain()?);
                self.expect_char('>')?;
                Ok(Domain::Map(key, value))
            }
            "Enum" => {
                self.expect_char('(')?;
                let mut constants = vec![self.identifier()?.to_string()];
                while self.try_char(',') {
                    constants.push(self.identifier()?.to_string());
                }
                self.expect_char(')')?;
                Ok(Domain::Enum(constants))
            }
            other => Err(Error::SchemaError(format!("unknown domain '{}'", other))),
        }
    }
}
