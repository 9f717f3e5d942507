use std::collections::BTreeSet;
use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::QueryValue;

pub const TYPENAME_FIELD: &str = "__typename";

/// The wire type of a field or variable: a named base type, possibly wrapped
/// in lists, with nullability at every level.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WireType {
    pub base: BaseWireType,
    pub nullable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum BaseWireType {
    Named(String),
    List(Box<WireType>),
}

impl WireType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            base: BaseWireType::Named(name.into()),
            nullable: true,
        }
    }

    pub fn non_null(name: impl Into<String>) -> Self {
        Self {
            base: BaseWireType::Named(name.into()),
            nullable: false,
        }
    }

    /// The innermost named type, with all list wrappers peeled off.
    pub fn underlying(&self) -> &str {
        match &self.base {
            BaseWireType::Named(name) => name,
            BaseWireType::List(inner) => inner.underlying(),
        }
    }
}

impl Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.base {
            BaseWireType::Named(name) => write!(f, "{name}")?,
            BaseWireType::List(inner) => write!(f, "[{inner}]")?,
        }
        if !self.nullable {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// How an argument is bound at a field: a constant literal from the operation
/// text, a reference to a declared variable, or a list/object literal with
/// variable references nested inside it. The generator collapses fully
/// constant lists and objects into `Literal`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ArgumentBinding {
    Literal(QueryValue),
    Variable(String),
    List(Vec<ArgumentBinding>),
    Object(IndexMap<String, ArgumentBinding>),
}

impl Display for ArgumentBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentBinding::Literal(value) => write!(f, "{value}"),
            ArgumentBinding::Variable(name) => write!(f, "${name}"),
            ArgumentBinding::List(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            ArgumentBinding::Object(entries) => {
                write!(f, "{{")?;
                for (i, (name, entry)) in entries.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {entry}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// What kind of data a selected field produces.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Enum,
    /// An object, interface, or union; carries subselections.
    Composite,
    /// The `__typename` metadata field used to resolve polymorphic branches.
    TypeDiscriminator,
}

/// One entry of a selection set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    /// A reference to a shared subtree in the [`FragmentArena`]. `on` is set
    /// when the fragment's type condition narrows the surrounding type, i.e.
    /// the reference is polymorphic at this site.
    FragmentRef { name: String, on: Option<String> },
    /// A type-conditional branch: its selections apply only when the server
    /// reports the concrete type named by `on`.
    TypeBranch {
        on: String,
        selections: Vec<Selection>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldSelection {
    pub alias: Option<String>,
    /// The schema name of the field.
    pub name: String,
    /// Argument bindings, empty if no arguments are provided.
    pub arguments: IndexMap<String, ArgumentBinding>,
    /// The field's wire type as declared by the schema.
    pub ty: WireType,
    pub kind: FieldKind,
    /// Subselections for composite fields, empty for leaf fields.
    pub selections: Vec<Selection>,
}

impl FieldSelection {
    /// The key under which this field appears in a response object.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Fragment '{0}' is not defined")]
pub struct UnknownFragment(pub String);

/// A named, reusable selection subtree attachable to its type condition.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FragmentShape {
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

/// Shared selection subtrees, stored once and addressed by fragment name.
/// Replacing a reference with an inlined copy is semantically transparent
/// (see [`FragmentArena::inline`]).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FragmentArena {
    fragments: IndexMap<String, FragmentShape>,
}

impl FragmentArena {
    pub fn insert(&mut self, name: impl Into<String>, shape: FragmentShape) {
        self.fragments.insert(name.into(), shape);
    }

    pub fn get(&self, name: &str) -> Option<&FragmentShape> {
        self.fragments.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Replace every [`Selection::FragmentRef`] with a copy of the referenced
    /// subtree, recursively. A monomorphic reference splices the fragment's
    /// selections in place; a polymorphic one becomes a
    /// [`Selection::TypeBranch`] keyed by the fragment's type condition.
    pub fn inline(&self, selections: &[Selection]) -> Result<Vec<Selection>, UnknownFragment> {
        let mut inlined = Vec::with_capacity(selections.len());

        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    inlined.push(Selection::Field(FieldSelection {
                        selections: self.inline(&field.selections)?,
                        ..field.clone()
                    }));
                }
                Selection::FragmentRef { name, on } => {
                    let shape = self
                        .get(name)
                        .ok_or_else(|| UnknownFragment(name.clone()))?;
                    let fragment_selections = self.inline(&shape.selections)?;

                    match on {
                        Some(on) => inlined.push(Selection::TypeBranch {
                            on: on.clone(),
                            selections: fragment_selections,
                        }),
                        None => inlined.extend(fragment_selections),
                    }
                }
                Selection::TypeBranch { on, selections } => {
                    inlined.push(Selection::TypeBranch {
                        on: on.clone(),
                        selections: self.inline(selections)?,
                    });
                }
            }
        }

        Ok(inlined)
    }
}

/// Enumerate every field path of a selection tree, using output names.
/// Type branches do not contribute a path segment; their fields live at the
/// same level as the common fields.
pub fn field_paths(
    selections: &[Selection],
    arena: &FragmentArena,
) -> Result<BTreeSet<Vec<String>>, UnknownFragment> {
    let mut paths = BTreeSet::new();
    collect_paths(selections, arena, &mut vec![], &mut paths)?;
    Ok(paths)
}

fn collect_paths(
    selections: &[Selection],
    arena: &FragmentArena,
    prefix: &mut Vec<String>,
    paths: &mut BTreeSet<Vec<String>>,
) -> Result<(), UnknownFragment> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                prefix.push(field.output_name().to_string());
                paths.insert(prefix.clone());
                collect_paths(&field.selections, arena, prefix, paths)?;
                prefix.pop();
            }
            Selection::FragmentRef { name, .. } => {
                let shape = arena.get(name).ok_or_else(|| UnknownFragment(name.clone()))?;
                collect_paths(&shape.selections, arena, prefix, paths)?;
            }
            Selection::TypeBranch { selections, .. } => {
                collect_paths(selections, arena, prefix, paths)?;
            }
        }
    }
    Ok(())
}

/// The maximum field nesting depth of a tree. Fragment references must
/// already be inlined; type branches do not add depth.
pub fn max_depth(selections: &[Selection]) -> usize {
    selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => 1 + max_depth(&field.selections),
            Selection::FragmentRef { .. } => 0,
            Selection::TypeBranch { selections, .. } => max_depth(selections),
        })
        .max()
        .unwrap_or(0)
}
