use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A constant value appearing in an operation: an argument literal or a
/// variable default. Variable references are not values here; they are
/// represented as [`ArgumentBinding::Variable`](crate::selection::ArgumentBinding).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum QueryValue {
    Null,
    Number(serde_json::Number),
    String(String),
    Bool(bool),
    Enum(String),
    List(Vec<QueryValue>),
    Object(IndexMap<String, QueryValue>),
}

impl Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryValue::Null => write!(f, "null"),
            QueryValue::Number(n) => write!(f, "{n}"),
            // JSON string escaping matches the GraphQL literal syntax
            QueryValue::String(s) => write!(f, "{}", serde_json::Value::String(s.clone())),
            QueryValue::Bool(b) => write!(f, "{b}"),
            QueryValue::Enum(e) => write!(f, "{e}"),
            QueryValue::List(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            QueryValue::Object(entries) => {
                write!(f, "{{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<QueryValue> for serde_json::Value {
    fn from(value: QueryValue) -> Self {
        match value {
            QueryValue::Null => serde_json::Value::Null,
            QueryValue::Number(n) => serde_json::Value::Number(n),
            QueryValue::String(s) => serde_json::Value::String(s),
            QueryValue::Bool(b) => serde_json::Value::Bool(b),
            QueryValue::Enum(e) => serde_json::Value::String(e),
            QueryValue::List(elems) => {
                serde_json::Value::Array(elems.into_iter().map(Into::into).collect())
            }
            QueryValue::Object(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}
