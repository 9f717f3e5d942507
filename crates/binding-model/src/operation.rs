use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::selection::{FragmentArena, Selection, WireType};
use crate::value::QueryValue;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// One declared variable of an operation: name, wire type, and an optional
/// default literal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: WireType,
    pub default: Option<QueryValue>,
}

impl VariableDefinition {
    /// A variable is required when it is non-nullable and carries no default.
    pub fn required(&self) -> bool {
        !self.ty.nullable && self.default.is_none()
    }
}

/// The binding for one named operation: everything an execution engine needs
/// to send the request, shape-check the response, and key its cache.
///
/// Produced once by the generator and immutable thereafter; regeneration
/// fully replaces it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueryBinding {
    pub name: String,
    pub kind: OperationKind,
    /// The exact text sent over the wire.
    pub text: String,
    /// Deterministic hash of `text` (see [`crate::cache_identity`]).
    pub cache_identity: String,
    pub variables: Vec<VariableDefinition>,
    /// Shared selection subtrees referenced by both trees.
    pub fragments: FragmentArena,
    /// The fields as written in the source text: what a dependent consumer
    /// sees. Fragment spreads remain references into `fragments`.
    pub fragment_tree: Vec<Selection>,
    /// The full wire response shape: `fragment_tree` with references inlined
    /// and a `__typename` discriminator injected into every polymorphic
    /// selection set.
    pub operation_tree: Vec<Selection>,
}

impl QueryBinding {
    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }
}
