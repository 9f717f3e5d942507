use std::collections::HashMap;

use async_graphql_parser::{
    types::{FragmentDefinition, OperationDefinition, OperationType, VariableDefinition},
    Positioned,
};
use async_graphql_value::Name;

use binding_model::{
    operation::{OperationKind, VariableDefinition as VariableSchema},
    selection::{max_depth, ArgumentBinding, FragmentArena, Selection},
};

use crate::schema::Schema;
use crate::validation::validation_error::ValidationError;

use super::{
    const_query_value, operation::ValidatedOperation,
    selection_set_validator::SelectionSetValidator, underlying_type, wire_type,
};

/// Context for validating an operation.
pub struct OperationValidator<'a> {
    schema: &'a Schema,
    operation_name: Option<String>,
    fragment_definitions: HashMap<Name, Positioned<FragmentDefinition>>,
    depth_limit: usize,
}

impl<'a> OperationValidator<'a> {
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        operation_name: Option<String>,
        fragment_definitions: HashMap<Name, Positioned<FragmentDefinition>>,
        depth_limit: usize,
    ) -> Self {
        Self {
            schema,
            operation_name,
            fragment_definitions,
            depth_limit,
        }
    }

    /// Validate an operation such as
    /// ```graphql
    ///    query sessions($projectId: ID!) {
    ///       sessions(projectId: $projectId) {
    ///          id
    ///       }
    ///    }
    /// ```
    ///
    /// Validations performed:
    /// - The operation's root type exists in the schema
    /// - The variable schema is well formed (no duplicates, known types)
    /// - The selected fields are valid (see [`SelectionSetValidator`])
    /// - Every fragment definition is used, directly or transitively
    /// - Every declared variable is bound at exactly one site
    /// - The selection tree stays within the depth limit
    pub(super) fn validate(
        self,
        operation: Positioned<OperationDefinition>,
    ) -> Result<ValidatedOperation, ValidationError> {
        let kind = match operation.node.ty {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        };

        let root_type_name = match kind {
            OperationKind::Query => self.schema.query_root(),
            OperationKind::Mutation => self.schema.mutation_root(),
            OperationKind::Subscription => self.schema.subscription_root(),
        }
        .ok_or_else(|| ValidationError::OperationRootNotFound(kind.to_string()))?;

        let container_type = self
            .schema
            .get_type_definition(root_type_name)
            .ok_or_else(|| ValidationError::OperationRootNotFound(kind.to_string()))?;

        let variables = self.validate_variables(&operation.node.variable_definitions)?;

        let mut fragments = FragmentArena::default();
        let mut fragment_trail = vec![];

        let selection_set_validator = SelectionSetValidator::new(
            self.schema,
            container_type,
            &variables,
            &self.fragment_definitions,
        );

        let fields = selection_set_validator.validate(
            &operation.node.selection_set,
            &mut fragments,
            &mut fragment_trail,
        )?;

        self.check_fragment_usage(&fragments)?;
        check_variable_bindings(&variables, &fields, &fragments)?;
        self.check_depth(&fields, &fragments)?;

        Ok(ValidatedOperation {
            name: self.operation_name,
            kind,
            variables,
            fragments,
            fields,
        })
    }

    /// Validate the variable schema: no duplicate declarations, every
    /// declared type known to the schema. Whether each variable is actually
    /// bound is checked after selection validation (see
    /// [`check_variable_bindings`]).
    fn validate_variables(
        &self,
        variable_definitions: &[Positioned<VariableDefinition>],
    ) -> Result<Vec<VariableSchema>, ValidationError> {
        let mut variables: Vec<VariableSchema> = vec![];

        for variable_definition in variable_definitions {
            let name = variable_definition.node.name.node.to_string();

            if variables.iter().any(|v| v.name == name) {
                return Err(ValidationError::DuplicateVariable(
                    name,
                    variable_definition.pos,
                ));
            }

            let ty = &variable_definition.node.var_type.node;
            let underlying = underlying_type(ty);
            if !self.schema.is_known_type(underlying.as_str()) {
                return Err(ValidationError::InvalidVariableType(
                    name,
                    underlying.to_string(),
                    variable_definition.pos,
                ));
            }

            variables.push(VariableSchema {
                name,
                ty: wire_type(ty),
                default: variable_definition
                    .node
                    .default_value
                    .as_ref()
                    .map(|value| const_query_value(&value.node)),
            });
        }

        Ok(variables)
    }

    fn check_fragment_usage(&self, fragments: &FragmentArena) -> Result<(), ValidationError> {
        let mut unused: Vec<_> = self
            .fragment_definitions
            .keys()
            .filter(|name| fragments.get(name.as_str()).is_none())
            .map(|name| name.to_string())
            .collect();

        // sort for a deterministic error when several fragments are unused
        unused.sort();
        match unused.into_iter().next() {
            Some(name) => Err(ValidationError::UnusedFragment(name)),
            None => Ok(()),
        }
    }

    fn check_depth(
        &self,
        fields: &[Selection],
        fragments: &FragmentArena,
    ) -> Result<(), ValidationError> {
        // Depth is measured on the inlined tree so that fields reached
        // through fragments count from their spread site.
        let inlined = fragments.inline(fields).map_err(|e| {
            ValidationError::FragmentDefinitionNotFound(e.0, async_graphql_parser::Pos::default())
        })?;

        let depth = max_depth(&inlined);
        if depth > self.depth_limit {
            return Err(ValidationError::SelectionSetTooDeep(depth, self.depth_limit));
        }
        Ok(())
    }
}

/// Enforce the binding-site contract: every declared variable appears exactly
/// once in the operation text (the operation's selections plus each fragment
/// definition, counted once regardless of how often it is spread).
/// Undeclared variable uses are caught earlier, at the argument site.
fn check_variable_bindings(
    variables: &[VariableSchema],
    fields: &[Selection],
    fragments: &FragmentArena,
) -> Result<(), ValidationError> {
    let mut census: HashMap<&str, usize> = HashMap::new();

    count_selection_bindings(fields, &mut census);
    for name in fragments.names() {
        if let Some(shape) = fragments.get(name) {
            count_selection_bindings(&shape.selections, &mut census);
        }
    }

    for variable in variables {
        match census.get(variable.name.as_str()).copied().unwrap_or(0) {
            0 => return Err(ValidationError::UnusedVariable(variable.name.clone())),
            1 => {}
            _ => {
                return Err(ValidationError::VariableBoundMultipleTimes(
                    variable.name.clone(),
                ))
            }
        }
    }

    Ok(())
}

fn count_selection_bindings<'a>(selections: &'a [Selection], census: &mut HashMap<&'a str, usize>) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                for binding in field.arguments.values() {
                    count_argument_bindings(binding, census);
                }
                count_selection_bindings(&field.selections, census);
            }
            Selection::FragmentRef { .. } => {}
            Selection::TypeBranch { selections, .. } => {
                count_selection_bindings(selections, census);
            }
        }
    }
}

fn count_argument_bindings<'a>(binding: &'a ArgumentBinding, census: &mut HashMap<&'a str, usize>) {
    match binding {
        ArgumentBinding::Literal(_) => {}
        ArgumentBinding::Variable(name) => {
            *census.entry(name.as_str()).or_insert(0) += 1;
        }
        ArgumentBinding::List(elems) => {
            for elem in elems {
                count_argument_bindings(elem, census);
            }
        }
        ArgumentBinding::Object(entries) => {
            for entry in entries.values() {
                count_argument_bindings(entry, census);
            }
        }
    }
}
