use binding_model::{
    operation::{OperationKind, VariableDefinition},
    selection::{FragmentArena, Selection},
};

/// A validated operation: variables resolved to the model's variable schema,
/// fields transformed into model selection trees, fragments collected into
/// the shared arena.
#[derive(Debug)]
pub struct ValidatedOperation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub variables: Vec<VariableDefinition>,
    pub fragments: FragmentArena,
    /// The operation's top-level selections.
    pub fields: Vec<Selection>,
}
