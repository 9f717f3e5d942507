use thiserror::Error;

use binding_model::{cache_identity::CacheIdentityError, error::PackSerializationError};

use crate::validation::validation_error::ValidationError;

/// Errors that abort generation. Every variant blocks artifact production; no
/// partial binding is ever emitted.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Could not parse schema: {0}")]
    SchemaParsingFailed(String),

    #[error("Could not parse operation document: {0}")]
    QueryParsingFailed(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    CacheIdentity(#[from] CacheIdentityError),

    #[error("Operation name '{0}' appears in more than one document")]
    DuplicateOperation(String),

    #[error("{0}")]
    Serialization(#[from] PackSerializationError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
