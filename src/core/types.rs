use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use super::{DbError, Result, Value};

pub type Row = Vec<Value>;

/// A fetched row keyed by column name, in column order.
pub type FieldMap = Vec<(String, Value)>;

/// Primitive type a record property is converted to when it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastKind {
    Int,
    /// Text is trimmed and matched case-insensitively: `1`, `true`, `yes`
    /// and `on` read as true; `0`, `false`, `no`, `off` and the empty string
    /// read as false. Numbers are true when non-zero. Any other text, such
    /// as `2` or `abc`, is a [`DbError::CastFailure`].
    Bool,
    Float,
    String,
}

impl CastKind {
    /// Converts a raw stored value. `Null` passes through every cast.
    pub fn apply(&self, property: &str, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        match self {
            Self::Int => cast_int(raw),
            Self::Bool => cast_bool(raw),
            Self::Float => cast_float(raw),
            Self::String => cast_string(raw),
        }
        .map_err(|reason| DbError::CastFailure {
            property: property.to_string(),
            target: self.to_string(),
            reason,
        })
    }
}

fn cast_int(raw: &Value) -> std::result::Result<Value, String> {
    match raw {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Float(f) => raw
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| format!("float {} is out of integer range", f)),
        Value::Boolean(b) => Ok(Value::Integer(*b as i64)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| format!("'{}': {}", s, e)),
        other => Err(format!("unsupported source type {}", other.type_name())),
    }
}

fn cast_bool(raw: &Value) -> std::result::Result<Value, String> {
    match raw {
        Value::Boolean(b) => Ok(Value::Boolean(*b)),
        Value::Integer(_) | Value::Float(_) => Ok(Value::Boolean(raw.as_bool())),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Value::Boolean(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Value::Boolean(false)),
            _ => Err(format!("'{}' is not a boolean literal", s)),
        },
        other => Err(format!("unsupported source type {}", other.type_name())),
    }
}

fn cast_float(raw: &Value) -> std::result::Result<Value, String> {
    match raw {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Integer(i) => Ok(Value::Float(*i as f64)),
        Value::Boolean(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| format!("'{}': {}", s, e)),
        other => Err(format!("unsupported source type {}", other.type_name())),
    }
}

fn cast_string(raw: &Value) -> std::result::Result<Value, String> {
    match raw {
        Value::Text(s) => Ok(Value::Text(s.clone())),
        Value::Bytes(b) => String::from_utf8(b.clone())
            .map(Value::Text)
            .map_err(|e| e.to_string()),
        other => Ok(Value::Text(other.to_string())),
    }
}

impl fmt::Display for CastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
        }
    }
}

impl FromStr for CastKind {
    type Err = DbError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "bool" | "boolean" => Ok(Self::Bool),
            "float" | "double" | "real" => Ok(Self::Float),
            "string" | "str" | "text" => Ok(Self::String),
            other => Err(DbError::ParseError(format!("Unknown cast type '{}'", other))),
        }
    }
}
