//! Validate operation text against the schema and transform it into the
//! model's selection trees. All validations here are generation-time and
//! fatal: a binding is produced only from a fully valid document.

pub mod document_validator;
pub mod operation;
pub mod validation_error;

mod arguments_validator;
mod operation_validator;
mod selection_set_validator;

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::{ConstValue, Name};

use binding_model::{
    selection::{BaseWireType, WireType},
    value::QueryValue,
};

pub fn underlying_type(typ: &Type) -> &Name {
    match &typ.base {
        BaseType::Named(name) => name,
        BaseType::List(typ) => underlying_type(typ),
    }
}

pub(crate) fn wire_type(typ: &Type) -> WireType {
    WireType {
        base: match &typ.base {
            BaseType::Named(name) => BaseWireType::Named(name.to_string()),
            BaseType::List(inner) => BaseWireType::List(Box::new(wire_type(inner))),
        },
        nullable: typ.nullable,
    }
}

pub(crate) fn const_query_value(value: &ConstValue) -> QueryValue {
    match value {
        ConstValue::Null => QueryValue::Null,
        ConstValue::Number(n) => QueryValue::Number(n.clone()),
        ConstValue::String(s) => QueryValue::String(s.clone()),
        ConstValue::Boolean(b) => QueryValue::Bool(*b),
        ConstValue::Binary(bytes) => {
            QueryValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ConstValue::Enum(e) => QueryValue::Enum(e.to_string()),
        ConstValue::List(elems) => QueryValue::List(elems.iter().map(const_query_value).collect()),
        ConstValue::Object(entries) => QueryValue::Object(
            entries
                .iter()
                .map(|(name, value)| (name.to_string(), const_query_value(value)))
                .collect(),
        ),
    }
}
