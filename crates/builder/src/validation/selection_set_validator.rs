use std::collections::HashMap;

use async_graphql_parser::{
    types::{
        Field, FragmentDefinition, FragmentSpread, InlineFragment, Selection as AstSelection,
        SelectionSet, TypeDefinition, TypeKind,
    },
    Pos, Positioned,
};
use async_graphql_value::Name;

use binding_model::{
    operation::VariableDefinition,
    selection::{
        FieldKind, FieldSelection, FragmentArena, FragmentShape, Selection, WireType,
        TYPENAME_FIELD,
    },
};

use crate::schema::Schema;
use crate::validation::validation_error::ValidationError;

use super::{arguments_validator::ArgumentValidator, underlying_type, wire_type};

/// How a type condition relates to the surrounding container type.
enum SpreadSite {
    /// The condition covers every possible runtime type of the container;
    /// the selections apply unconditionally.
    Covers,
    /// The condition names a concrete object type narrower than the
    /// container; the selections apply only when the server reports it.
    Concrete(String),
    /// The condition names an abstract type partially overlapping the
    /// container; expanded to one branch per overlapping concrete type.
    Abstract(Vec<String>),
}

/// Context for validating a selection set.
pub struct SelectionSetValidator<'a> {
    schema: &'a Schema,
    /// The parent type of the fields being selected.
    container_type: &'a TypeDefinition,
    variables: &'a [VariableDefinition],
    fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

impl<'a> SelectionSetValidator<'a> {
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        container_type: &'a TypeDefinition,
        variables: &'a [VariableDefinition],
        fragment_definitions: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    ) -> Self {
        Self {
            schema,
            container_type,
            variables,
            fragment_definitions,
        }
    }

    /// Validate a selection set, transforming it into model selections.
    ///
    /// Validations performed:
    /// - Each field is defined in the container type
    /// - Leaf fields carry no subselection; composite fields carry one
    /// - Each fragment referred to is defined, non-cyclic, and its type
    ///   condition can apply within the container type
    /// - Arguments to each field are valid (see [`ArgumentValidator`])
    ///
    /// Validated fragments are added to `fragments` once, keyed by name;
    /// spreads become references into it. `fragment_trail` carries the chain
    /// of fragments currently being validated, for cycle detection.
    pub(super) fn validate(
        &self,
        selection_set: &Positioned<SelectionSet>,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<Vec<Selection>, ValidationError> {
        let mut selections = vec![];

        for selection in &selection_set.node.items {
            selections.extend(self.validate_selection(selection, fragments, fragment_trail)?);
        }

        Ok(selections)
    }

    fn validate_selection(
        &self,
        selection: &Positioned<AstSelection>,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<Vec<Selection>, ValidationError> {
        match &selection.node {
            AstSelection::Field(field) => self
                .validate_field(field, fragments, fragment_trail)
                .map(|field| vec![field]),
            AstSelection::FragmentSpread(fragment_spread) => {
                self.validate_fragment_spread(fragment_spread, fragments, fragment_trail)
            }
            AstSelection::InlineFragment(inline_fragment) => {
                self.validate_inline_fragment(inline_fragment, fragments, fragment_trail)
            }
        }
    }

    fn validate_field(
        &self,
        field: &Positioned<Field>,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<Selection, ValidationError> {
        // `__typename` is not an ordinary schema field (no type declares it),
        // so it is treated specially, as is conventional.
        if field.node.name.node.as_str() == TYPENAME_FIELD {
            return if !field.node.arguments.is_empty() {
                Err(ValidationError::StrayArguments(
                    field
                        .node
                        .arguments
                        .iter()
                        .map(|arg| arg.0.node.to_string())
                        .collect(),
                    field.node.name.to_string(),
                    field.pos,
                ))
            } else if !field.node.selection_set.node.items.is_empty() {
                Err(ValidationError::LeafWithSelection(
                    field.node.name.to_string(),
                    field.pos,
                ))
            } else {
                Ok(Selection::Field(FieldSelection {
                    alias: field.node.alias.as_ref().map(|alias| alias.to_string()),
                    name: TYPENAME_FIELD.to_string(),
                    arguments: Default::default(),
                    ty: WireType::non_null("String"),
                    kind: FieldKind::TypeDiscriminator,
                    selections: vec![],
                }))
            };
        }

        let field_definition = self
            .schema
            .type_fields(self.container_type)
            .and_then(|fields| {
                fields
                    .iter()
                    .find(|f| f.node.name.node == field.node.name.node)
            })
            .ok_or_else(|| {
                ValidationError::InvalidField(
                    field.node.name.node.to_string(),
                    self.container_type.name.node.to_string(),
                    field.pos,
                )
            })?;

        let field_type = wire_type(&field_definition.node.ty.node);
        let underlying = underlying_type(&field_definition.node.ty.node);

        let (kind, field_type_definition) = self.classify_field_type(underlying, field.pos)?;

        let has_subselection = !field.node.selection_set.node.items.is_empty();
        let selections = match kind {
            FieldKind::Composite => {
                if !has_subselection {
                    return Err(ValidationError::CompositeWithoutSelection(
                        field.node.name.node.to_string(),
                        field.pos,
                    ));
                }

                // This unwrap is okay because classify_field_type returns a
                // definition for every composite kind.
                let subfield_validator = Self::new(
                    self.schema,
                    field_type_definition.unwrap(),
                    self.variables,
                    self.fragment_definitions,
                );
                subfield_validator.validate(
                    &field.node.selection_set,
                    fragments,
                    fragment_trail,
                )?
            }
            _ => {
                if has_subselection {
                    return Err(ValidationError::LeafWithSelection(
                        field.node.name.node.to_string(),
                        field.pos,
                    ));
                }
                vec![]
            }
        };

        let argument_validator = ArgumentValidator::new(self.schema, self.variables, field);
        let arguments = argument_validator.validate(&field_definition.node.arguments)?;

        Ok(Selection::Field(FieldSelection {
            alias: field.node.alias.as_ref().map(|alias| alias.to_string()),
            name: field.node.name.node.to_string(),
            arguments,
            ty: field_type,
            kind,
            selections,
        }))
    }

    fn classify_field_type(
        &self,
        underlying: &Name,
        pos: Pos,
    ) -> Result<(FieldKind, Option<&'a TypeDefinition>), ValidationError> {
        if Schema::is_builtin_scalar(underlying.as_str()) {
            return Ok((FieldKind::Scalar, None));
        }

        let type_definition = self
            .schema
            .get_type_definition(underlying.as_str())
            .ok_or_else(|| ValidationError::InvalidFieldType(underlying.to_string(), pos))?;

        let kind = match &type_definition.kind {
            TypeKind::Scalar => FieldKind::Scalar,
            TypeKind::Enum(_) => FieldKind::Enum,
            TypeKind::Object(_) | TypeKind::Interface(_) | TypeKind::Union(_) => {
                FieldKind::Composite
            }
            // An input object is not a valid output type
            TypeKind::InputObject(_) => {
                return Err(ValidationError::InvalidFieldType(underlying.to_string(), pos))
            }
        };

        Ok((kind, Some(type_definition)))
    }

    fn validate_fragment_spread(
        &self,
        fragment_spread: &Positioned<FragmentSpread>,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<Vec<Selection>, ValidationError> {
        let fragment_name = fragment_spread.node.fragment_name.node.as_str();

        let type_condition = self.ensure_fragment_validated(
            fragment_name,
            fragment_spread.pos,
            fragments,
            fragment_trail,
        )?;

        let selections = match self.spread_site(&type_condition, fragment_spread.pos)? {
            SpreadSite::Covers => vec![Selection::FragmentRef {
                name: fragment_name.to_string(),
                on: None,
            }],
            SpreadSite::Concrete(on) => vec![Selection::FragmentRef {
                name: fragment_name.to_string(),
                on: Some(on),
            }],
            SpreadSite::Abstract(concrete_types) => concrete_types
                .into_iter()
                .map(|on| Selection::TypeBranch {
                    on,
                    selections: vec![Selection::FragmentRef {
                        name: fragment_name.to_string(),
                        on: None,
                    }],
                })
                .collect(),
        };

        Ok(selections)
    }

    /// Validate the named fragment definition against its own type condition
    /// and add it to the arena, unless it is already there. Returns the
    /// fragment's type condition.
    fn ensure_fragment_validated(
        &self,
        fragment_name: &str,
        pos: Pos,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<String, ValidationError> {
        if let Some(shape) = fragments.get(fragment_name) {
            return Ok(shape.type_condition.clone());
        }

        if fragment_trail.iter().any(|name| name == fragment_name) {
            return Err(ValidationError::FragmentCycle(
                fragment_name.to_string(),
                pos,
            ));
        }

        let fragment_definition = self
            .fragment_definitions
            .get(&Name::new(fragment_name))
            .map(|f| &f.node)
            .ok_or_else(|| {
                ValidationError::FragmentDefinitionNotFound(fragment_name.to_string(), pos)
            })?;

        let type_condition = fragment_definition.type_condition.node.on.node.to_string();
        let condition_type = self
            .schema
            .get_type_definition(&type_condition)
            .filter(|_| self.schema.is_composite(&type_condition))
            .ok_or_else(|| ValidationError::InvalidTypeCondition(type_condition.clone(), pos))?;

        let fragment_validator = Self::new(
            self.schema,
            condition_type,
            self.variables,
            self.fragment_definitions,
        );

        fragment_trail.push(fragment_name.to_string());
        let selections = fragment_validator.validate(
            &fragment_definition.selection_set,
            fragments,
            fragment_trail,
        )?;
        fragment_trail.pop();

        fragments.insert(
            fragment_name,
            FragmentShape {
                type_condition: type_condition.clone(),
                selections,
            },
        );

        Ok(type_condition)
    }

    fn validate_inline_fragment(
        &self,
        inline_fragment: &Positioned<InlineFragment>,
        fragments: &mut FragmentArena,
        fragment_trail: &mut Vec<String>,
    ) -> Result<Vec<Selection>, ValidationError> {
        let type_condition = inline_fragment
            .node
            .type_condition
            .as_ref()
            .map(|condition| condition.node.on.node.to_string());

        let Some(type_condition) = type_condition else {
            // No type condition: the selections apply to the container directly.
            return self.validate(
                &inline_fragment.node.selection_set,
                fragments,
                fragment_trail,
            );
        };

        let condition_type = self
            .schema
            .get_type_definition(&type_condition)
            .filter(|_| self.schema.is_composite(&type_condition))
            .ok_or_else(|| {
                ValidationError::InvalidTypeCondition(type_condition.clone(), inline_fragment.pos)
            })?;

        let branch_validator = Self::new(
            self.schema,
            condition_type,
            self.variables,
            self.fragment_definitions,
        );
        let selections = branch_validator.validate(
            &inline_fragment.node.selection_set,
            fragments,
            fragment_trail,
        )?;

        let selections = match self.spread_site(&type_condition, inline_fragment.pos)? {
            SpreadSite::Covers => selections,
            SpreadSite::Concrete(on) => vec![Selection::TypeBranch { on, selections }],
            SpreadSite::Abstract(concrete_types) => concrete_types
                .into_iter()
                .map(|on| Selection::TypeBranch {
                    on,
                    selections: selections.clone(),
                })
                .collect(),
        };

        Ok(selections)
    }

    /// Classify how the type condition `condition` relates to the container
    /// type, rejecting conditions that can never apply.
    fn spread_site(&self, condition: &str, pos: Pos) -> Result<SpreadSite, ValidationError> {
        let container_name = self.container_type.name.node.as_str();

        if condition == container_name {
            return Ok(SpreadSite::Covers);
        }

        if !self.schema.is_composite(condition) {
            return Err(ValidationError::InvalidTypeCondition(
                condition.to_string(),
                pos,
            ));
        }

        let condition_possibles = self.schema.possible_types(condition);
        let container_possibles = self.schema.possible_types(container_name);

        let overlap: Vec<&str> = container_possibles
            .iter()
            .filter(|name| condition_possibles.contains(*name))
            .copied()
            .collect();

        if overlap.is_empty() {
            return Err(ValidationError::IncompatibleTypeCondition(
                condition.to_string(),
                container_name.to_string(),
                pos,
            ));
        }

        if overlap.len() == container_possibles.len() {
            // every possible runtime type satisfies the condition
            return Ok(SpreadSite::Covers);
        }

        let condition_is_object = matches!(
            self.schema.get_type_definition(condition).map(|td| &td.kind),
            Some(TypeKind::Object(_))
        );

        if condition_is_object {
            Ok(SpreadSite::Concrete(condition.to_string()))
        } else {
            Ok(SpreadSite::Abstract(
                overlap.into_iter().map(str::to_string).collect(),
            ))
        }
    }
}
