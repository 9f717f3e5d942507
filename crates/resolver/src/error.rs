use thiserror::Error;

/// A response document that does not match the binding's operation tree.
/// Paths are dotted response paths using output names, with list indices as
/// segments (`traces.0.spans.1.name`).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShapeValidationError {
    #[error("Response data is not an object")]
    DataNotAnObject,

    #[error("Response is missing non-nullable field '{path}'")]
    MissingField { path: String },

    #[error("Response field '{path}' is null but its type is non-nullable")]
    UnexpectedNull { path: String },

    #[error("Response field '{path}' has the wrong shape: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Response object at '{path}' reports no '__typename' for its type branches")]
    MissingDiscriminator { path: String },

    #[error("Fragment '{0}' is not part of this binding")]
    UnknownFragment(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Fragment '{0}' is not part of this binding")]
    UnknownFragment(String),
}
