use async_graphql_parser::{
    types::{BaseType, Field, InputValueDefinition, TypeKind},
    Pos, Positioned,
};
use async_graphql_value::{Name, Number, Value};
use indexmap::IndexMap;

use binding_model::{
    operation::VariableDefinition as VariableSchema,
    selection::{ArgumentBinding, BaseWireType, WireType},
    value::QueryValue,
};

use crate::schema::Schema;
use crate::validation::validation_error::ValidationError;

use super::{underlying_type, wire_type};

pub struct ArgumentValidator<'a> {
    schema: &'a Schema,
    variables: &'a [VariableSchema],
    field: &'a Positioned<Field>,
}

impl<'a> ArgumentValidator<'a> {
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        variables: &'a [VariableSchema],
        field: &'a Positioned<Field>,
    ) -> Self {
        Self {
            schema,
            variables,
            field,
        }
    }

    /// Validations performed:
    /// - Ensure that all required arguments are provided
    /// - Ensure that there are no stray arguments (arguments that are not defined in the field)
    /// - Variable references name a declared variable of a compatible type
    pub(super) fn validate(
        &self,
        field_argument_definitions: &[Positioned<InputValueDefinition>],
    ) -> Result<IndexMap<String, ArgumentBinding>, ValidationError> {
        let definitions: Vec<_> = field_argument_definitions.iter().map(|d| &d.node).collect();
        self.validate_arguments(&definitions, &self.field.node.arguments)
    }

    fn validate_arguments(
        &self,
        field_argument_definitions: &[&InputValueDefinition],
        field_arguments: &[(Positioned<Name>, Positioned<Value>)],
    ) -> Result<IndexMap<String, ArgumentBinding>, ValidationError> {
        let field_name = self.field.node.name.node.as_str();

        // Stray arguments tracking: 1. Maintain a map of all the arguments supplied in the query
        let mut field_arguments: IndexMap<_, _> = field_arguments
            .iter()
            .filter_map(|(name, value)| {
                // Clients that round-trip a previously fetched value (with its
                // `__typename` attribute intact) into a mutation argument are
                // common enough that `__typename` is never treated as stray.
                if name.node == "__typename" {
                    None
                } else {
                    Some((&name.node, value))
                }
            })
            .collect();

        let validated_arguments = field_argument_definitions
            .iter()
            .filter_map(|argument_definition| {
                let argument_name = &argument_definition.name.node;
                // Stray arguments tracking: 2. Remove the argument being processed
                let argument_value = field_arguments.shift_remove(argument_name);

                self.validate_argument(argument_definition, argument_value)
                    .map(|binding| binding.map(|binding| (argument_name.to_string(), binding)))
            })
            .collect::<Result<_, _>>()?;

        // Stray arguments tracking: 3. Anything left in the map is a stray argument
        if !field_arguments.is_empty() {
            let stray_arguments = field_arguments
                .keys()
                .map(|name| name.to_string())
                .collect::<Vec<_>>();

            Err(ValidationError::StrayArguments(
                stray_arguments,
                field_name.to_string(),
                self.field.pos,
            ))
        } else {
            Ok(validated_arguments)
        }
    }

    /// Validate a single argument.
    /// Validations performed:
    /// - If the argument is a variable, the variable is declared and its type
    ///   is compatible with the argument's type
    /// - A null value is specified only for a nullable argument
    /// - Scalars match the expected type (custom scalars accept any literal
    ///   form, since their wire representation is opaque here)
    /// - Objects match the expected input shape (recursively)
    /// - Lists match the expected shape
    fn validate_argument(
        &self,
        argument_definition: &InputValueDefinition,
        argument_value: Option<&Positioned<Value>>,
    ) -> Option<Result<ArgumentBinding, ValidationError>> {
        match argument_value {
            Some(value) => match &value.node {
                Value::Variable(name) => {
                    Some(self.validate_variable_argument(argument_definition, name, value.pos))
                }
                Value::Null => Some(
                    self.validate_null_argument(argument_definition, value.pos)
                        .map(ArgumentBinding::Literal),
                ),
                Value::Number(number) => Some(
                    self.validate_number_argument(argument_definition, number, value.pos)
                        .map(ArgumentBinding::Literal),
                ),
                Value::String(string) => Some(
                    self.validate_string_argument(argument_definition, string, value.pos)
                        .map(ArgumentBinding::Literal),
                ),
                Value::Boolean(boolean) => Some(
                    self.validate_boolean_argument(argument_definition, boolean, value.pos)
                        .map(ArgumentBinding::Literal),
                ),
                Value::Binary(bytes) => Some(
                    self.validate_string_argument(
                        argument_definition,
                        &String::from_utf8_lossy(bytes),
                        value.pos,
                    )
                    .map(ArgumentBinding::Literal),
                ),
                Value::Enum(e) => {
                    Some(self.validate_enum_argument(argument_definition, e, value.pos))
                }
                Value::List(elems) => {
                    Some(self.validate_list_argument(argument_definition, elems, value.pos))
                }
                Value::Object(entries) => {
                    Some(self.validate_object_argument(argument_definition, entries, value.pos))
                }
            },
            None => {
                if argument_definition.ty.node.nullable
                    || argument_definition.default_value.is_some()
                {
                    None
                } else {
                    Some(Err(ValidationError::RequiredArgumentNotFound(
                        argument_definition.name.node.to_string(),
                        self.field.pos,
                    )))
                }
            }
        }
    }

    fn validate_variable_argument(
        &self,
        argument_definition: &InputValueDefinition,
        variable_name: &Name,
        pos: Pos,
    ) -> Result<ArgumentBinding, ValidationError> {
        let variable = self
            .variables
            .iter()
            .find(|v| v.name == variable_name.as_str())
            .ok_or_else(|| ValidationError::UndeclaredVariable(variable_name.to_string(), pos))?;

        let argument_type = &argument_definition.ty.node;
        let location = wire_type(argument_type);

        if !variable_usage_allowed(&variable.ty, &location, variable.default.is_some()) {
            return Err(ValidationError::InvalidArgumentType {
                argument_name: argument_definition.name.node.to_string(),
                expected_type: argument_type.to_string(),
                actual_type: variable.ty.to_string(),
                pos,
            });
        }

        Ok(ArgumentBinding::Variable(variable_name.to_string()))
    }

    fn validate_null_argument(
        &self,
        argument_definition: &InputValueDefinition,
        pos: Pos,
    ) -> Result<QueryValue, ValidationError> {
        let ty = &argument_definition.ty.node;

        if ty.nullable {
            Ok(QueryValue::Null)
        } else {
            Err(ValidationError::RequiredArgumentNotFound(
                argument_definition.name.node.to_string(),
                pos,
            ))
        }
    }

    fn validate_number_argument(
        &self,
        argument_definition: &InputValueDefinition,
        number: &Number,
        pos: Pos,
    ) -> Result<QueryValue, ValidationError> {
        self.validate_scalar_argument(
            "Number",
            &["Int", "Float"],
            || Ok(QueryValue::Number(number.clone())),
            argument_definition,
            pos,
        )
    }

    fn validate_boolean_argument(
        &self,
        argument_definition: &InputValueDefinition,
        boolean: &bool,
        pos: Pos,
    ) -> Result<QueryValue, ValidationError> {
        self.validate_scalar_argument(
            "Boolean",
            &["Boolean"],
            || Ok(QueryValue::Bool(*boolean)),
            argument_definition,
            pos,
        )
    }

    fn validate_string_argument(
        &self,
        argument_definition: &InputValueDefinition,
        string: &str,
        pos: Pos,
    ) -> Result<QueryValue, ValidationError> {
        self.validate_scalar_argument(
            "String",
            &["String", "ID"],
            || Ok(QueryValue::String(string.to_string())),
            argument_definition,
            pos,
        )
    }

    fn validate_enum_argument(
        &self,
        argument_definition: &InputValueDefinition,
        value: &Name,
        pos: Pos,
    ) -> Result<ArgumentBinding, ValidationError> {
        let underlying = underlying_type(&argument_definition.ty.node);

        let is_enum_type = matches!(
            self.schema
                .get_type_definition(underlying.as_str())
                .map(|td| &td.kind),
            Some(TypeKind::Enum(_))
        );

        if is_enum_type {
            Ok(ArgumentBinding::Literal(QueryValue::Enum(value.to_string())))
        } else {
            Err(ValidationError::InvalidArgumentType {
                argument_name: argument_definition.name.node.to_string(),
                expected_type: underlying.to_string(),
                actual_type: "Enum".to_string(),
                pos,
            })
        }
    }

    /// Check that the literal is compatible with the expected scalar type.
    /// Custom scalars declared in the SDL accept any literal form; only the
    /// builtin scalars get a shape check.
    fn validate_scalar_argument<const N: usize>(
        &self,
        argument_typename: &str,
        acceptable_destination_types: &[&str; N],
        to_value: impl FnOnce() -> Result<QueryValue, ValidationError>,
        argument_definition: &InputValueDefinition,
        pos: Pos,
    ) -> Result<QueryValue, ValidationError> {
        let ty = &argument_definition.ty.node;
        let underlying = underlying_type(ty);

        let is_custom_scalar = !Schema::is_builtin_scalar(underlying.as_str())
            && matches!(
                self.schema
                    .get_type_definition(underlying.as_str())
                    .map(|td| &td.kind),
                Some(TypeKind::Scalar)
            );

        if is_custom_scalar || acceptable_destination_types.contains(&underlying.as_str()) {
            to_value()
        } else {
            Err(ValidationError::InvalidArgumentType {
                argument_name: argument_definition.name.node.to_string(),
                expected_type: underlying.to_string(),
                actual_type: argument_typename.to_string(),
                pos,
            })
        }
    }

    /// Recursively validate an object argument against its input object
    /// definition.
    fn validate_object_argument(
        &self,
        argument_definition: &InputValueDefinition,
        entries: &IndexMap<Name, Value>,
        pos: Pos,
    ) -> Result<ArgumentBinding, ValidationError> {
        let ty = &argument_definition.ty.node;
        let underlying = underlying_type(ty);

        let type_definition = self
            .schema
            .get_type_definition(underlying.as_str())
            .ok_or_else(|| ValidationError::InvalidArgumentType {
                argument_name: argument_definition.name.node.to_string(),
                expected_type: ty.to_string(),
                actual_type: "Object".to_string(),
                pos,
            })?;

        // A custom scalar takes any literal form, objects included.
        let input_object_type = match &type_definition.kind {
            TypeKind::InputObject(input_object_type) => input_object_type,
            TypeKind::Scalar => {
                return Ok(ArgumentBinding::Literal(QueryValue::Object(
                    entries
                        .iter()
                        .map(|(name, value)| {
                            Ok((name.to_string(), constant_query_value(value, pos)?))
                        })
                        .collect::<Result<_, ValidationError>>()?,
                )))
            }
            _ => {
                return Err(ValidationError::InvalidArgumentType {
                    argument_name: argument_definition.name.node.to_string(),
                    expected_type: ty.to_string(),
                    actual_type: type_definition.name.to_string(),
                    pos,
                })
            }
        };

        let field_arguments: Vec<_> = entries
            .iter()
            .map(|(name, value)| {
                (
                    Positioned::new(name.clone(), pos),
                    Positioned::new(value.clone(), pos),
                )
            })
            .collect();

        let validated_entries = self.validate_arguments(
            &input_object_type
                .fields
                .iter()
                .map(|d| &d.node)
                .collect::<Vec<_>>(),
            &field_arguments,
        )?;

        Ok(collapse_object(validated_entries))
    }

    fn validate_list_argument(
        &self,
        argument_definition: &InputValueDefinition,
        elems: &[Value],
        pos: Pos,
    ) -> Result<ArgumentBinding, ValidationError> {
        let ty = &argument_definition.ty.node;
        let underlying = underlying_type(ty);

        match &ty.base {
            BaseType::Named(name) => {
                // A custom scalar takes any literal form, lists included.
                let is_custom_scalar = !Schema::is_builtin_scalar(name.as_str())
                    && matches!(
                        self.schema
                            .get_type_definition(name.as_str())
                            .map(|td| &td.kind),
                        Some(TypeKind::Scalar)
                    );

                if is_custom_scalar {
                    Ok(ArgumentBinding::Literal(QueryValue::List(
                        elems
                            .iter()
                            .map(|elem| constant_query_value(elem, pos))
                            .collect::<Result<_, _>>()?,
                    )))
                } else {
                    Err(ValidationError::InvalidArgumentType {
                        argument_name: argument_definition.name.node.to_string(),
                        expected_type: underlying.to_string(),
                        actual_type: format!("[{name}]"),
                        pos,
                    })
                }
            }
            BaseType::List(elem_type) => {
                // Peel off the list type to get the element type
                let elem_argument_definition = InputValueDefinition {
                    ty: Positioned::new(elem_type.as_ref().clone(), pos),
                    ..argument_definition.clone()
                };

                let validated_elems = elems
                    .iter()
                    .flat_map(|elem| {
                        self.validate_argument(
                            &elem_argument_definition,
                            Some(&Positioned::new(elem.clone(), pos)),
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(collapse_list(validated_elems))
            }
        }
    }
}

/// Whether a variable of type `variable` may be bound where `location` is
/// expected. List shapes must match level by level and the named base types
/// must be identical; a variable that may be null cannot feed a non-null
/// location, unless the variable carries a default (which applies at the top
/// level only).
fn variable_usage_allowed(variable: &WireType, location: &WireType, has_default: bool) -> bool {
    if !location.nullable && variable.nullable && !has_default {
        return false;
    }

    match (&variable.base, &location.base) {
        (BaseWireType::Named(v), BaseWireType::Named(l)) => v == l,
        (BaseWireType::List(v), BaseWireType::List(l)) => variable_usage_allowed(v, l, false),
        _ => false,
    }
}

/// A list whose elements are all constant is itself a constant.
fn collapse_list(elems: Vec<ArgumentBinding>) -> ArgumentBinding {
    if elems
        .iter()
        .all(|elem| matches!(elem, ArgumentBinding::Literal(_)))
    {
        ArgumentBinding::Literal(QueryValue::List(
            elems
                .into_iter()
                .map(|elem| match elem {
                    ArgumentBinding::Literal(value) => value,
                    _ => unreachable!(),
                })
                .collect(),
        ))
    } else {
        ArgumentBinding::List(elems)
    }
}

/// An object whose entries are all constant is itself a constant.
fn collapse_object(entries: IndexMap<String, ArgumentBinding>) -> ArgumentBinding {
    if entries
        .values()
        .all(|entry| matches!(entry, ArgumentBinding::Literal(_)))
    {
        ArgumentBinding::Literal(QueryValue::Object(
            entries
                .into_iter()
                .map(|(name, entry)| match entry {
                    ArgumentBinding::Literal(value) => (name, value),
                    _ => unreachable!(),
                })
                .collect(),
        ))
    } else {
        ArgumentBinding::Object(entries)
    }
}

/// Convert a literal that is known to contain no variable references.
/// A variable reference inside a custom scalar literal has no schema to
/// check against, so it is rejected outright.
fn constant_query_value(value: &Value, pos: Pos) -> Result<QueryValue, ValidationError> {
    match value {
        Value::Variable(name) => Err(ValidationError::UndeclaredVariable(name.to_string(), pos)),
        Value::Null => Ok(QueryValue::Null),
        Value::Number(n) => Ok(QueryValue::Number(n.clone())),
        Value::String(s) => Ok(QueryValue::String(s.clone())),
        Value::Boolean(b) => Ok(QueryValue::Bool(*b)),
        Value::Binary(bytes) => Ok(QueryValue::String(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
        Value::Enum(e) => Ok(QueryValue::Enum(e.to_string())),
        Value::List(elems) => Ok(QueryValue::List(
            elems
                .iter()
                .map(|elem| constant_query_value(elem, pos))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(entries) => Ok(QueryValue::Object(
            entries
                .iter()
                .map(|(name, value)| Ok((name.to_string(), constant_query_value(value, pos)?)))
                .collect::<Result<_, ValidationError>>()?,
        )),
    }
}
