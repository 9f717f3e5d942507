use serde_json::{Map, Value};
use tracing::instrument;

use binding_model::{
    operation::QueryBinding,
    selection::{
        BaseWireType, FieldKind, FieldSelection, FragmentArena, Selection, WireType,
        TYPENAME_FIELD,
    },
};

use crate::error::ShapeValidationError;

/// Validate a response's `data` document against the binding's operation
/// tree.
///
/// Checks performed, per selection level:
/// - A non-nullable field is present and not null
/// - Scalars, enums, lists, and objects arrive as the matching JSON kind
///   (custom scalars pass through unchecked, their wire form is opaque)
/// - When type branches are present, the object reports a `__typename`; a
///   branch whose condition matches it is validated, and an unreported type
///   name means the common fields alone are validated, which is not an error
#[instrument(skip_all, fields(operation = %binding.name))]
pub fn validate_shape(binding: &QueryBinding, data: &Value) -> Result<(), ShapeValidationError> {
    let Value::Object(object) = data else {
        return Err(ShapeValidationError::DataNotAnObject);
    };

    validate_object(
        &binding.operation_tree,
        &binding.fragments,
        object,
        &mut vec![],
    )
}

fn validate_object(
    selections: &[Selection],
    fragments: &FragmentArena,
    object: &Map<String, Value>,
    path: &mut Vec<String>,
) -> Result<(), ShapeValidationError> {
    let mut branches: Vec<(&str, &[Selection])> = vec![];

    for selection in selections {
        match selection {
            Selection::Field(field) => validate_field(field, fragments, object, path)?,
            Selection::FragmentRef { name, on } => {
                let shape = fragments
                    .get(name)
                    .ok_or_else(|| ShapeValidationError::UnknownFragment(name.clone()))?;
                match on {
                    None => validate_object(&shape.selections, fragments, object, path)?,
                    Some(on) => branches.push((on.as_str(), &shape.selections)),
                }
            }
            Selection::TypeBranch { on, selections } => branches.push((on, selections)),
        }
    }

    if !branches.is_empty() {
        let reported = object
            .get(TYPENAME_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| ShapeValidationError::MissingDiscriminator { path: path.join(".") })?;

        for (on, branch_selections) in branches {
            if on == reported {
                validate_object(branch_selections, fragments, object, path)?;
            }
        }
        // A type name with no matching branch validates the common fields
        // alone; unknown concrete types are expected under schema evolution.
    }

    Ok(())
}

fn validate_field(
    field: &FieldSelection,
    fragments: &FragmentArena,
    object: &Map<String, Value>,
    path: &mut Vec<String>,
) -> Result<(), ShapeValidationError> {
    let key = field.output_name();
    path.push(key.to_string());

    let result = match object.get(key) {
        None => {
            if field.ty.nullable {
                Ok(())
            } else {
                Err(ShapeValidationError::MissingField { path: path.join(".") })
            }
        }
        Some(value) => validate_value(field, fragments, value, &field.ty, path),
    };

    path.pop();
    result
}

fn validate_value(
    field: &FieldSelection,
    fragments: &FragmentArena,
    value: &Value,
    ty: &WireType,
    path: &mut Vec<String>,
) -> Result<(), ShapeValidationError> {
    if value.is_null() {
        return if ty.nullable {
            Ok(())
        } else {
            Err(ShapeValidationError::UnexpectedNull { path: path.join(".") })
        };
    }

    match &ty.base {
        BaseWireType::List(inner) => {
            let Value::Array(elems) = value else {
                return Err(mismatch("array", value, path));
            };

            for (index, elem) in elems.iter().enumerate() {
                path.push(index.to_string());
                let result = validate_value(field, fragments, elem, inner, path);
                path.pop();
                result?;
            }
            Ok(())
        }
        BaseWireType::Named(type_name) => {
            validate_named(field, fragments, value, type_name, path)
        }
    }
}

fn validate_named(
    field: &FieldSelection,
    fragments: &FragmentArena,
    value: &Value,
    type_name: &str,
    path: &mut Vec<String>,
) -> Result<(), ShapeValidationError> {
    match field.kind {
        FieldKind::Composite => {
            let Value::Object(object) = value else {
                return Err(mismatch("object", value, path));
            };
            validate_object(&field.selections, fragments, object, path)
        }
        FieldKind::Enum | FieldKind::TypeDiscriminator => {
            if value.is_string() {
                Ok(())
            } else {
                Err(mismatch("string", value, path))
            }
        }
        FieldKind::Scalar => {
            let expected = match type_name {
                "Int" | "Float" => "number",
                "String" | "ID" => "string",
                "Boolean" => "boolean",
                // a custom scalar's wire form is opaque
                _ => return Ok(()),
            };

            if json_kind(value) == expected {
                Ok(())
            } else {
                Err(mismatch(expected, value, path))
            }
        }
    }
}

fn mismatch(expected: &'static str, actual: &Value, path: &[String]) -> ShapeValidationError {
    ShapeValidationError::TypeMismatch {
        path: path.join("."),
        expected,
        actual: json_kind(actual),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use binding_builder::{build_binding, BuildOptions, Schema};
    use serde_json::json;

    use super::*;

    const SDL: &str = r#"
        scalar DateTime

        interface Node {
            id: ID!
        }

        type Project implements Node {
            id: ID!
            name: String!
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

        type Query {
            session(id: ID!): ProjectSession
            traces(projectId: ID!): [Trace!]!
            node(id: ID!): Node
        }
    "#;

    fn binding(source: &str) -> QueryBinding {
        let schema = Schema::from_sdl(SDL).unwrap();
        build_binding(&schema, source, None, &BuildOptions::default()).unwrap()
    }

    const USAGE_QUERY: &str = r#"
        query usage($id: ID!) {
            session(id: $id) { tokenUsage { total } }
        }
    "#;

    #[test]
    fn matching_response_passes() {
        let binding = binding(USAGE_QUERY);
        let data = json!({ "session": { "tokenUsage": { "total": 42 } } });

        assert_eq!(validate_shape(&binding, &data), Ok(()));
    }

    #[test]
    fn missing_non_null_field_is_reported_with_its_path() {
        let binding = binding(USAGE_QUERY);
        let data = json!({ "session": { "tokenUsage": { "prompt": 5 } } });

        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::MissingField {
                path: "session.tokenUsage.total".to_string()
            })
        );
    }

    #[test]
    fn null_for_non_null_field_is_rejected() {
        let binding = binding(USAGE_QUERY);
        let data = json!({ "session": { "tokenUsage": { "total": null } } });

        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::UnexpectedNull {
                path: "session.tokenUsage.total".to_string()
            })
        );
    }

    #[test]
    fn nullable_field_may_be_absent_or_null() {
        let binding = binding(USAGE_QUERY);

        // `session` itself is nullable
        assert_eq!(validate_shape(&binding, &json!({ "session": null })), Ok(()));
        assert_eq!(validate_shape(&binding, &json!({})), Ok(()));
    }

    const TRACES_QUERY: &str = r#"
        query traceSpans($projectId: ID!) {
            traces(projectId: $projectId) {
                traceId
                startTime
                spans { name latencyMs }
            }
        }
    "#;

    #[test]
    fn list_elements_are_validated_with_indexed_paths() {
        let binding = binding(TRACES_QUERY);
        let data = json!({
            "traces": [{
                "traceId": "t1",
                "startTime": "2024-01-01T00:00:00Z",
                "spans": [
                    { "name": "llm", "latencyMs": 12.5 },
                    { "name": 42 },
                ],
            }],
        });

        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::TypeMismatch {
                path: "traces.0.spans.1.name".to_string(),
                expected: "string",
                actual: "number",
            })
        );
    }

    #[test]
    fn custom_scalar_accepts_any_wire_form() {
        let binding = binding(TRACES_QUERY);
        let data = json!({
            "traces": [{
                "traceId": "t1",
                "startTime": { "epochMs": 1704067200000_i64 },
                "spans": [],
            }],
        });

        assert_eq!(validate_shape(&binding, &data), Ok(()));
    }

    #[test]
    fn non_array_where_list_expected_is_rejected() {
        let binding = binding(TRACES_QUERY);
        let data = json!({ "traces": { "traceId": "t1" } });

        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::TypeMismatch {
                path: "traces".to_string(),
                expected: "array",
                actual: "object",
            })
        );
    }

    const NODE_QUERY: &str = r#"
        query nodeCounts($id: ID!) {
            node(id: $id) {
                id
                ... on ProjectSession { numTraces }
            }
        }
    "#;

    #[test]
    fn matching_branch_is_validated() {
        let binding = binding(NODE_QUERY);

        let data = json!({
            "node": { "__typename": "ProjectSession", "id": "s1", "numTraces": 3 },
        });
        assert_eq!(validate_shape(&binding, &data), Ok(()));

        let data = json!({
            "node": { "__typename": "ProjectSession", "id": "s1" },
        });
        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::MissingField {
                path: "node.numTraces".to_string()
            })
        );
    }

    #[test]
    fn unmatched_type_name_validates_common_fields_only() {
        let binding = binding(NODE_QUERY);
        let data = json!({
            "node": { "__typename": "Project", "id": "p1" },
        });

        assert_eq!(validate_shape(&binding, &data), Ok(()));
    }

    #[test]
    fn polymorphic_object_must_report_its_type() {
        let binding = binding(NODE_QUERY);

        // the demand is backed by the wire text, which requests the
        // discriminator next to the branch; a faithful server answers it
        assert!(binding.text.contains("__typename"));

        let data = json!({ "node": { "id": "s1", "numTraces": 3 } });
        assert_eq!(
            validate_shape(&binding, &data),
            Err(ShapeValidationError::MissingField {
                path: "node.__typename".to_string()
            })
        );
    }

    #[test]
    fn non_object_data_is_rejected() {
        let binding = binding(USAGE_QUERY);

        assert_eq!(
            validate_shape(&binding, &json!([1, 2, 3])),
            Err(ShapeValidationError::DataNotAnObject)
        );
    }
}
