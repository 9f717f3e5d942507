//! Data model for query bindings: the immutable artifacts produced by the
//! generator and consumed read-only by an execution engine.
//!
//! A [`QueryBinding`](operation::QueryBinding) pairs the wire text of one
//! named operation with its typed response shape (two selection trees), its
//! variable schema, and a deterministic cache identity. Bindings are plain
//! data: no I/O, no locks, safe for unsynchronized concurrent reads.

pub mod cache_identity;
pub mod error;
pub mod operation;
pub mod pack;
pub mod pack_serializer;
pub mod persisted_documents;
pub mod selection;
pub mod value;
pub mod wire_text;
