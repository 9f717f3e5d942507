use std::fmt::{self, Display, Write};

use crate::operation::{OperationKind, VariableDefinition};
use crate::selection::{FieldSelection, Selection};

/// Render the canonical wire text of an operation: the single-line GraphQL
/// document an execution engine sends. The text requests exactly what the
/// selection tree describes, so an injected `__typename` discriminator is
/// asked of the server, not just expected of it.
///
/// Fragment references must already be inlined (see
/// [`FragmentArena::inline`](crate::selection::FragmentArena::inline)); a
/// binding's operation tree satisfies this by construction.
pub fn wire_text(
    name: &str,
    kind: OperationKind,
    variables: &[VariableDefinition],
    selections: &[Selection],
) -> String {
    WireDocument {
        name,
        kind,
        variables,
        selections,
    }
    .to_string()
}

struct WireDocument<'a> {
    name: &'a str,
    kind: OperationKind,
    variables: &'a [VariableDefinition],
    selections: &'a [Selection],
}

impl Display for WireDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;

        if !self.variables.is_empty() {
            f.write_char('(')?;
            for (i, variable) in self.variables.iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "${}: {}", variable.name, variable.ty)?;
                if let Some(default) = &variable.default {
                    write!(f, " = {default}")?;
                }
            }
            f.write_char(')')?;
        }

        f.write_char(' ')?;
        write_selection_set(f, self.selections)
    }
}

fn write_selection_set(f: &mut fmt::Formatter<'_>, selections: &[Selection]) -> fmt::Result {
    f.write_str("{ ")?;
    for (i, selection) in selections.iter().enumerate() {
        if i != 0 {
            f.write_char(' ')?;
        }
        write_selection(f, selection)?;
    }
    f.write_str(" }")
}

fn write_selection(f: &mut fmt::Formatter<'_>, selection: &Selection) -> fmt::Result {
    match selection {
        Selection::Field(field) => write_field(f, field),
        Selection::FragmentRef { name, .. } => write!(f, "...{name}"),
        Selection::TypeBranch { on, selections } => {
            write!(f, "... on {on} ")?;
            write_selection_set(f, selections)
        }
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FieldSelection) -> fmt::Result {
    if let Some(alias) = &field.alias {
        write!(f, "{alias}: ")?;
    }
    f.write_str(&field.name)?;

    if !field.arguments.is_empty() {
        f.write_char('(')?;
        for (i, (name, binding)) in field.arguments.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {binding}")?;
        }
        f.write_char(')')?;
    }

    if !field.selections.is_empty() {
        f.write_char(' ')?;
        write_selection_set(f, &field.selections)?;
    }

    Ok(())
}
