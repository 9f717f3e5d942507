//! Runtime consumption of query bindings: shape-validate a response JSON
//! document against a binding's operation tree, and project fragment-scoped
//! views of the validated data for dependent consumers.
//!
//! Everything here reads bindings and response values; nothing mutates a
//! binding and nothing performs I/O.

pub mod error;
pub mod projection;
pub mod shape_validator;

pub use error::{ProjectionError, ShapeValidationError};
pub use projection::{project_fragment, project_operation};
pub use shape_validator::validate_shape;
