use async_graphql_parser::types::{DocumentOperations, ExecutableDocument};
use async_graphql_value::Name;
use tracing::instrument;

use crate::schema::Schema;
use crate::validation::validation_error::ValidationError;

use super::{operation::ValidatedOperation, operation_validator::OperationValidator};

/// Context for validating a document.
pub struct DocumentValidator<'a> {
    schema: &'a Schema,
    operation_name: Option<String>,
    depth_limit: usize,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(schema: &'a Schema, operation_name: Option<String>, depth_limit: usize) -> Self {
        Self {
            schema,
            operation_name,
            depth_limit,
        }
    }

    /// Validate the document.
    ///
    /// Validations performed:
    /// - There is at least one operation
    /// - Either there is only one operation, or the operation name specified
    ///   matches one of the operations in the document
    /// - Everything else is delegated to the operation validator
    #[instrument(name = "DocumentValidator::validate", skip(self, document))]
    pub fn validate(
        self,
        document: ExecutableDocument,
    ) -> Result<ValidatedOperation, ValidationError> {
        let (operation_name, raw_operation) = match document.operations {
            DocumentOperations::Single(operation) => Ok((self.operation_name, operation)),
            DocumentOperations::Multiple(mut operations) => {
                if operations.is_empty() {
                    Err(ValidationError::NoOperationFound)
                } else {
                    match self.operation_name {
                        None if operations.len() == 1 => {
                            // `operationName` is required only for truly multiple operations,
                            // but the parser maps a named operation (`query Foo { ... }`) to
                            // `DocumentOperations::Multiple` even when there is only one.

                            // This unwrap is okay because we already check that there is exactly one operation.
                            let (operation_name, operation) = operations.into_iter().next().unwrap();
                            Ok((Some(operation_name.to_string()), operation))
                        }
                        None => Err(ValidationError::MultipleOperationsNoOperationName),
                        Some(operation_name) => {
                            let operation = operations.remove(&Name::new(&operation_name));

                            match operation {
                                None => {
                                    Err(ValidationError::MultipleOperationsUnmatchedOperationName(
                                        operation_name,
                                    ))
                                }
                                Some(operation) => Ok((Some(operation_name), operation)),
                            }
                        }
                    }
                }
            }
        }?;

        let operation_validator = OperationValidator::new(
            self.schema,
            operation_name,
            document.fragments,
            self.depth_limit,
        );

        operation_validator.validate(raw_operation)
    }
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::parse_query;

    use binding_model::{
        operation::OperationKind,
        selection::{ArgumentBinding, FieldKind, Selection},
        value::QueryValue,
    };

    use super::*;

    const SDL: &str = r#"
        scalar DateTime

        interface Node {
            id: ID!
        }

        type Project implements Node {
            id: ID!
            name: String!
            sessions(first: Int, after: String): [ProjectSession!]!
        }

        type ProjectSession implements Node {
            id: ID!
            numTraces: Int!
            tokenUsage: TokenUsage!
        }

        type TokenUsage {
            prompt: Int!
            completion: Int!
            total: Int!
        }

        type Trace {
            traceId: ID!
            startTime: DateTime!
            spans: [Span!]!
        }

        type Span {
            name: String!
            latencyMs: Float
        }

        union SpanOrTrace = Span | Trace

        input TimeRange {
            start: DateTime!
            end: DateTime
        }

        type Query {
            node(id: ID!): Node
            project(id: ID!): Project
            projects(ids: [ID]!): [Project!]!
            traces(projectId: ID!, timeRange: TimeRange): [Trace!]!
            search(text: String!): [SpanOrTrace!]!
        }
    "#;

    fn validate(source: &str) -> Result<ValidatedOperation, ValidationError> {
        validate_named(source, None)
    }

    fn validate_named(
        source: &str,
        operation_name: Option<&str>,
    ) -> Result<ValidatedOperation, ValidationError> {
        let schema = Schema::from_sdl(SDL).unwrap();
        let document = parse_query(source).unwrap();
        DocumentValidator::new(&schema, operation_name.map(str::to_string), 10).validate(document)
    }

    fn field(selection: &Selection) -> &binding_model::selection::FieldSelection {
        match selection {
            Selection::Field(field) => field,
            other => panic!("expected a field, got {other:?}"),
        }
    }

    #[test]
    fn single_named_operation_validates() {
        let operation = validate(
            r#"
            query projectName($id: ID!) {
                project(id: $id) { name }
            }
            "#,
        )
        .unwrap();

        assert_eq!(operation.name.as_deref(), Some("projectName"));
        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.variables.len(), 1);
        assert_eq!(operation.variables[0].name, "id");
        assert_eq!(operation.variables[0].ty.to_string(), "ID!");
        assert!(operation.variables[0].default.is_none());

        let project = field(&operation.fields[0]);
        assert_eq!(project.name, "project");
        assert_eq!(project.kind, FieldKind::Composite);
        assert_eq!(
            project.arguments.get("id"),
            Some(&ArgumentBinding::Variable("id".to_string()))
        );
        assert_eq!(field(&project.selections[0]).name, "name");
    }

    #[test]
    fn alias_is_preserved() {
        let operation = validate(r#"query aliased { renamed: project(id: "p1") { name } }"#).unwrap();

        let project = field(&operation.fields[0]);
        assert_eq!(project.alias.as_deref(), Some("renamed"));
        assert_eq!(project.output_name(), "renamed");
        assert_eq!(
            project.arguments.get("id"),
            Some(&ArgumentBinding::Literal(QueryValue::String(
                "p1".to_string()
            )))
        );
    }

    #[test]
    fn operation_name_selects_among_multiple() {
        let source = r#"
            query one { project(id: "p1") { name } }
            query two { search(text: "error") { __typename } }
        "#;

        let operation = validate_named(source, Some("two")).unwrap();
        assert_eq!(operation.name.as_deref(), Some("two"));

        assert!(matches!(
            validate(source),
            Err(ValidationError::MultipleOperationsNoOperationName)
        ));
        assert!(matches!(
            validate_named(source, Some("three")),
            Err(ValidationError::MultipleOperationsUnmatchedOperationName(name)) if name == "three"
        ));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = validate(r#"query bad { project(id: "p1") { owner } }"#);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidField(name, parent, _))
                if name == "owner" && parent == "Project"
        ));
    }

    #[test]
    fn leaf_field_rejects_subselection() {
        let result = validate(r#"query bad { project(id: "p1") { name { length } } }"#);
        assert!(matches!(
            result,
            Err(ValidationError::LeafWithSelection(name, _)) if name == "name"
        ));
    }

    #[test]
    fn composite_field_requires_subselection() {
        let result = validate(r#"query bad { project(id: "p1") }"#);
        assert!(matches!(
            result,
            Err(ValidationError::CompositeWithoutSelection(name, _)) if name == "project"
        ));
    }

    #[test]
    fn typename_is_a_discriminator_leaf() {
        let operation =
            validate(r#"query withTypename { node(id: "n1") { __typename id } }"#).unwrap();

        let node = field(&operation.fields[0]);
        let typename = field(&node.selections[0]);
        assert_eq!(typename.name, "__typename");
        assert_eq!(typename.kind, FieldKind::TypeDiscriminator);

        assert!(matches!(
            validate(r#"query bad { node(id: "n1") { __typename { x } } }"#),
            Err(ValidationError::LeafWithSelection(_, _))
        ));
    }

    #[test]
    fn stray_and_missing_arguments_are_rejected() {
        assert!(matches!(
            validate(r#"query bad { project(id: "p1", limit: 3) { name } }"#),
            Err(ValidationError::StrayArguments(stray, field, _))
                if stray == vec!["limit".to_string()] && field == "project"
        ));

        assert!(matches!(
            validate(r#"query bad { project { name } }"#),
            Err(ValidationError::RequiredArgumentNotFound(name, _)) if name == "id"
        ));
    }

    #[test]
    fn argument_literal_must_match_scalar_type() {
        assert!(matches!(
            validate(r#"query bad { search(text: 42) { __typename } }"#),
            Err(ValidationError::InvalidArgumentType {
                argument_name,
                ..
            }) if argument_name == "text"
        ));
    }

    #[test]
    fn custom_scalar_accepts_any_literal_form() {
        let operation = validate(
            r#"
            query byRange {
                traces(projectId: "p1", timeRange: { start: "2024-01-01T00:00:00Z" }) {
                    traceId
                }
            }
            "#,
        )
        .unwrap();

        let traces = field(&operation.fields[0]);
        assert!(matches!(
            traces.arguments.get("timeRange"),
            Some(ArgumentBinding::Literal(QueryValue::Object(_)))
        ));
    }

    #[test]
    fn variable_nested_in_input_object_stays_symbolic() {
        let operation = validate(
            r#"
            query byRange($start: DateTime!) {
                traces(projectId: "p1", timeRange: { start: $start }) {
                    traceId
                }
            }
            "#,
        )
        .unwrap();

        let traces = field(&operation.fields[0]);
        match traces.arguments.get("timeRange") {
            Some(ArgumentBinding::Object(entries)) => {
                assert_eq!(
                    entries.get("start"),
                    Some(&ArgumentBinding::Variable("start".to_string()))
                );
            }
            other => panic!("expected an object binding, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_variable_is_rejected_at_use_site() {
        assert!(matches!(
            validate(r#"query bad { project(id: $id) { name } }"#),
            Err(ValidationError::UndeclaredVariable(name, _)) if name == "id"
        ));
    }

    #[test]
    fn declared_variables_must_be_bound_exactly_once() {
        assert!(matches!(
            validate(r#"query bad($id: ID!) { search(text: "x") { __typename } }"#),
            Err(ValidationError::UnusedVariable(name)) if name == "id"
        ));

        assert!(matches!(
            validate(
                r#"
                query bad($id: ID!) {
                    a: project(id: $id) { name }
                    b: project(id: $id) { name }
                }
                "#
            ),
            Err(ValidationError::VariableBoundMultipleTimes(name)) if name == "id"
        ));
    }

    #[test]
    fn duplicate_and_unknown_variable_declarations_are_rejected() {
        assert!(matches!(
            validate(r#"query bad($id: ID!, $id: ID!) { project(id: $id) { name } }"#),
            Err(ValidationError::DuplicateVariable(name, _)) if name == "id"
        ));

        assert!(matches!(
            validate(r#"query bad($w: Widget!) { project(id: $w) { name } }"#),
            Err(ValidationError::InvalidVariableType(name, ty, _))
                if name == "w" && ty == "Widget"
        ));
    }

    #[test]
    fn variable_type_must_match_argument_type() {
        assert!(matches!(
            validate(r#"query bad($n: Int!) { project(id: $n) { name } }"#),
            Err(ValidationError::InvalidArgumentType { argument_name, .. })
                if argument_name == "id"
        ));

        // nullable variable without a default cannot feed a non-null argument
        assert!(matches!(
            validate(r#"query bad($id: ID) { project(id: $id) { name } }"#),
            Err(ValidationError::InvalidArgumentType { .. })
        ));

        // a default makes the nullable variable acceptable
        validate(r#"query ok($id: ID = "p1") { project(id: $id) { name } }"#).unwrap();
    }

    #[test]
    fn variable_list_shape_must_match_argument_shape() {
        // same underlying name, but a list cannot feed a plain `ID!`
        assert!(matches!(
            validate(r#"query bad($ids: [ID!]!) { project(id: $ids) { name } }"#),
            Err(ValidationError::InvalidArgumentType { argument_name, .. })
                if argument_name == "id"
        ));

        // nor the reverse: a plain `ID!` where a list is expected
        assert!(matches!(
            validate(r#"query bad($id: ID!) { projects(ids: $id) { name } }"#),
            Err(ValidationError::InvalidArgumentType { argument_name, .. })
                if argument_name == "ids"
        ));

        // matching shapes bind; non-null elements may feed nullable ones
        validate(r#"query ok($ids: [ID!]!) { projects(ids: $ids) { name } }"#).unwrap();
    }

    #[test]
    fn fragment_spread_becomes_a_shared_reference() {
        let operation = validate(
            r#"
            query withFragment {
                project(id: "p1") { ...projectFields }
            }
            fragment projectFields on Project {
                id
                name
            }
            "#,
        )
        .unwrap();

        let project = field(&operation.fields[0]);
        assert_eq!(
            project.selections,
            vec![Selection::FragmentRef {
                name: "projectFields".to_string(),
                on: None,
            }]
        );

        let shape = operation.fragments.get("projectFields").unwrap();
        assert_eq!(shape.type_condition, "Project");
        assert_eq!(shape.selections.len(), 2);
    }

    #[test]
    fn narrowing_fragment_spread_records_its_condition() {
        let operation = validate(
            r#"
            query narrowed {
                node(id: "n1") { ...sessionCounts }
            }
            fragment sessionCounts on ProjectSession {
                numTraces
            }
            "#,
        )
        .unwrap();

        let node = field(&operation.fields[0]);
        assert_eq!(
            node.selections,
            vec![Selection::FragmentRef {
                name: "sessionCounts".to_string(),
                on: Some("ProjectSession".to_string()),
            }]
        );
    }

    #[test]
    fn abstract_condition_expands_to_concrete_branches() {
        let operation = validate(
            r#"
            query viaNode {
                node(id: "n1") {
                    ... on Node { id }
                }
            }
            "#,
        )
        .unwrap();

        // `Node` covers every possible type of the container, so no branch
        let node = field(&operation.fields[0]);
        assert_eq!(field(&node.selections[0]).name, "id");

        let operation = validate(
            r#"
            query viaUnion {
                search(text: "error") {
                    ... on Span { name }
                }
            }
            "#,
        )
        .unwrap();

        let search = field(&operation.fields[0]);
        match &search.selections[..] {
            [Selection::TypeBranch { on, selections }] => {
                assert_eq!(on, "Span");
                assert_eq!(field(&selections[0]).name, "name");
            }
            other => panic!("expected a single type branch, got {other:?}"),
        }
    }

    #[test]
    fn incompatible_condition_is_rejected() {
        assert!(matches!(
            validate(
                r#"
                query bad {
                    project(id: "p1") {
                        ... on Trace { traceId }
                    }
                }
                "#
            ),
            Err(ValidationError::IncompatibleTypeCondition(cond, container, _))
                if cond == "Trace" && container == "Project"
        ));

        assert!(matches!(
            validate(
                r#"
                query bad {
                    project(id: "p1") {
                        ... on TimeRange { start }
                    }
                }
                "#
            ),
            Err(ValidationError::InvalidTypeCondition(cond, _)) if cond == "TimeRange"
        ));
    }

    #[test]
    fn fragment_cycle_is_rejected() {
        assert!(matches!(
            validate(
                r#"
                query bad { project(id: "p1") { ...a } }
                fragment a on Project { ...b }
                fragment b on Project { ...a }
                "#
            ),
            Err(ValidationError::FragmentCycle(_, _))
        ));
    }

    #[test]
    fn unused_and_undefined_fragments_are_rejected() {
        assert!(matches!(
            validate(
                r#"
                query bad { project(id: "p1") { name } }
                fragment orphan on Project { id }
                "#
            ),
            Err(ValidationError::UnusedFragment(name)) if name == "orphan"
        ));

        assert!(matches!(
            validate(r#"query bad { project(id: "p1") { ...missing } }"#),
            Err(ValidationError::FragmentDefinitionNotFound(name, _)) if name == "missing"
        ));
    }

    #[test]
    fn depth_limit_counts_through_fragments() {
        let schema = Schema::from_sdl(SDL).unwrap();
        let source = r#"
            query deep { project(id: "p1") { ...sessionList } }
            fragment sessionList on Project {
                sessions { tokenUsage { total } }
            }
        "#;
        let document = parse_query(source).unwrap();

        let result = DocumentValidator::new(&schema, None, 3).validate(document);
        assert!(matches!(
            result,
            Err(ValidationError::SelectionSetTooDeep(4, 3))
        ));

        let document = parse_query(source).unwrap();
        DocumentValidator::new(&schema, None, 4)
            .validate(document)
            .unwrap();
    }
}
