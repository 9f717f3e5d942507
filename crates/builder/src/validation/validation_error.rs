use async_graphql_parser::Pos;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("No operation found")]
    NoOperationFound,

    #[error("Must provide operation name if document contains multiple operations")]
    MultipleOperationsNoOperationName,

    #[error("operationName '{0}' doesn't match any operation")]
    MultipleOperationsUnmatchedOperationName(String),

    #[error("Operation must be named to produce a binding")]
    AnonymousOperation,

    #[error("No '{0}' root type in the schema")]
    OperationRootNotFound(String),

    #[error("Field '{0}' is not valid for type '{1}'")]
    InvalidField(String, String, Pos),

    #[error("Field '{0}' is of a leaf type, which should not specify fields")]
    LeafWithSelection(String, Pos),

    #[error("Field '{0}' is of a composite type and requires a selection of subfields")]
    CompositeWithoutSelection(String, Pos),

    #[error("Field type '{0}' is not valid")]
    InvalidFieldType(String, Pos),

    #[error("Fragment definition '{0}' not found")]
    FragmentDefinitionNotFound(String, Pos),

    #[error("Fragment '{0}' refers to itself, directly or through other fragments")]
    FragmentCycle(String, Pos),

    #[error("Fragment definition '{0}' is never used")]
    UnusedFragment(String),

    #[error("Type condition '{0}' does not name a composite type")]
    InvalidTypeCondition(String, Pos),

    #[error("Fragment on '{0}' can never apply within type '{1}'")]
    IncompatibleTypeCondition(String, String, Pos),

    #[error("Required argument '{0}' not found")]
    RequiredArgumentNotFound(String, Pos),

    #[error("Argument(s) '{0:?}' invalid for '{1}'")]
    StrayArguments(Vec<String>, String, Pos),

    #[error(
        "Argument '{argument_name}' is not of a valid type. Expected '{expected_type}', got '{actual_type}'"
    )]
    InvalidArgumentType {
        argument_name: String,
        expected_type: String,
        actual_type: String,
        pos: Pos,
    },

    #[error("Variable '{0}' is used but never declared")]
    UndeclaredVariable(String, Pos),

    #[error("Variable '{0}' is declared but never used")]
    UnusedVariable(String),

    #[error("Variable '{0}' is bound at more than one site")]
    VariableBoundMultipleTimes(String),

    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariable(String, Pos),

    #[error("Variable '{0}' has unknown type '{1}'")]
    InvalidVariableType(String, String, Pos),

    #[error("Selection set depth {0} exceeds the limit {1}")]
    SelectionSetTooDeep(usize, usize),
}

impl ValidationError {
    pub fn position(&self) -> Pos {
        match self {
            ValidationError::InvalidField(_, _, pos)
            | ValidationError::LeafWithSelection(_, pos)
            | ValidationError::CompositeWithoutSelection(_, pos)
            | ValidationError::InvalidFieldType(_, pos)
            | ValidationError::FragmentDefinitionNotFound(_, pos)
            | ValidationError::FragmentCycle(_, pos)
            | ValidationError::InvalidTypeCondition(_, pos)
            | ValidationError::IncompatibleTypeCondition(_, _, pos)
            | ValidationError::RequiredArgumentNotFound(_, pos)
            | ValidationError::StrayArguments(_, _, pos)
            | ValidationError::InvalidArgumentType { pos, .. }
            | ValidationError::UndeclaredVariable(_, pos)
            | ValidationError::DuplicateVariable(_, pos)
            | ValidationError::InvalidVariableType(_, _, pos) => *pos,
            _ => Pos::default(),
        }
    }
}
