//! Generation side of the binding pipeline: parse a schema and a set of
//! operation documents, validate the operations, and produce the immutable
//! [`binding_model::pack::BindingPack`] artifact that execution engines load.

pub mod binding;
pub mod error;
pub mod schema;
pub mod validation;

pub use binding::{
    build_binding, build_document_bindings, build_pack, build_pack_from_files, BuildOptions,
    DEFAULT_DEPTH_LIMIT,
};
pub use error::GenerationError;
pub use schema::Schema;
