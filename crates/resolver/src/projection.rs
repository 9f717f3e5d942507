use serde_json::{Map, Value};

use binding_model::{
    operation::QueryBinding,
    selection::{FragmentArena, Selection, TYPENAME_FIELD},
};

use crate::error::ProjectionError;

/// Project the view a named fragment selects out of (already shape-validated)
/// response data positioned where the fragment applies.
///
/// Only selected fields are copied, under their output names. Fields behind a
/// type branch are present only when the data reports the branch's type name;
/// otherwise they are absent, not null.
pub fn project_fragment(
    binding: &QueryBinding,
    fragment_name: &str,
    data: &Value,
) -> Result<Value, ProjectionError> {
    let shape = binding
        .fragments
        .get(fragment_name)
        .ok_or_else(|| ProjectionError::UnknownFragment(fragment_name.to_string()))?;

    project_selections(&shape.selections, &binding.fragments, data)
}

/// Project the operation's own view: the fields the source text selects,
/// stripping anything extra the server sent along.
pub fn project_operation(binding: &QueryBinding, data: &Value) -> Result<Value, ProjectionError> {
    project_selections(&binding.fragment_tree, &binding.fragments, data)
}

fn project_selections(
    selections: &[Selection],
    fragments: &FragmentArena,
    value: &Value,
) -> Result<Value, ProjectionError> {
    match value {
        Value::Array(elems) => elems
            .iter()
            .map(|elem| project_selections(selections, fragments, elem))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(object) => {
            let mut projected = Map::new();
            project_into(selections, fragments, object, &mut projected)?;
            Ok(Value::Object(projected))
        }
        // null where a composite was selected stays null
        other => Ok(other.clone()),
    }
}

fn project_into(
    selections: &[Selection],
    fragments: &FragmentArena,
    object: &Map<String, Value>,
    projected: &mut Map<String, Value>,
) -> Result<(), ProjectionError> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let key = field.output_name();
                if let Some(value) = object.get(key) {
                    let value = if field.selections.is_empty() {
                        value.clone()
                    } else {
                        project_selections(&field.selections, fragments, value)?
                    };
                    projected.insert(key.to_string(), value);
                }
            }
            Selection::FragmentRef { name, on } => {
                let shape = fragments
                    .get(name)
                    .ok_or_else(|| ProjectionError::UnknownFragment(name.clone()))?;

                if branch_applies(on.as_deref(), object) {
                    project_into(&shape.selections, fragments, object, projected)?;
                }
            }
            Selection::TypeBranch { on, selections } => {
                if branch_applies(Some(on), object) {
                    project_into(selections, fragments, object, projected)?;
                }
            }
        }
    }
    Ok(())
}

fn branch_applies(on: Option<&str>, object: &Map<String, Value>) -> bool {
    match on {
        None => true,
        Some(on) => object.get(TYPENAME_FIELD).and_then(Value::as_str) == Some(on),
    }
}

#[cfg(test)]
mod tests {
    use binding_builder::{build_binding, BuildOptions, Schema};
    use serde_json::json;

    use super::*;

    const SDL: &str = r#"
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

        type Query {
            session(id: ID!): ProjectSession
            node(id: ID!): Node
        }
    "#;

    fn binding(source: &str) -> QueryBinding {
        let schema = Schema::from_sdl(SDL).unwrap();
        build_binding(&schema, source, None, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn fragment_projection_selects_only_its_fields() {
        let binding = binding(
            r#"
            query sessionView($id: ID!) {
                session(id: $id) { id ...usage }
            }
            fragment usage on ProjectSession {
                tokenUsage { total }
            }
            "#,
        );

        let session = json!({
            "id": "s1",
            "numTraces": 3,
            "tokenUsage": { "prompt": 5, "completion": 7, "total": 12 },
        });

        assert_eq!(
            project_fragment(&binding, "usage", &session),
            Ok(json!({ "tokenUsage": { "total": 12 } }))
        );
    }

    #[test]
    fn unknown_fragment_is_rejected() {
        let binding = binding(r#"query plain($id: ID!) { session(id: $id) { id } }"#);

        assert_eq!(
            project_fragment(&binding, "usage", &json!({})),
            Err(ProjectionError::UnknownFragment("usage".to_string()))
        );
    }

    #[test]
    fn branch_fields_follow_the_reported_type() {
        let binding = binding(
            r#"
            query nodeView($id: ID!) {
                node(id: $id) {
                    id
                    ... on ProjectSession { numTraces }
                }
            }
            "#,
        );

        let matching = json!({
            "node": { "__typename": "ProjectSession", "id": "s1", "numTraces": 3 },
        });
        assert_eq!(
            project_operation(&binding, &matching),
            Ok(json!({ "node": { "id": "s1", "numTraces": 3 } }))
        );

        let other = json!({
            "node": { "__typename": "Project", "id": "p1", "name": "demo" },
        });
        assert_eq!(
            project_operation(&binding, &other),
            Ok(json!({ "node": { "id": "p1" } }))
        );
    }

    #[test]
    fn aliases_are_the_projected_keys() {
        let binding = binding(
            r#"
            query renamed($id: ID!) {
                current: session(id: $id) { total: numTraces }
            }
            "#,
        );

        let data = json!({ "current": { "total": 3, "extra": true } });

        assert_eq!(
            project_operation(&binding, &data),
            Ok(json!({ "current": { "total": 3 } }))
        );
    }

    #[test]
    fn lists_and_nulls_project_elementwise() {
        let binding = binding(
            r#"
            query sessionView($id: ID!) {
                session(id: $id) { id }
            }
            "#,
        );

        assert_eq!(
            project_operation(&binding, &json!({ "session": null })),
            Ok(json!({ "session": null }))
        );
    }
}
