use async_graphql_parser::{
    parse_schema,
    types::{FieldDefinition, ObjectType, TypeDefinition, TypeKind, TypeSystemDefinition},
    Positioned,
};

use crate::error::GenerationError;

pub const QUERY_ROOT_TYPENAME: &str = "Query";
pub const MUTATION_ROOT_TYPENAME: &str = "Mutation";
pub const SUBSCRIPTION_ROOT_TYPENAME: &str = "Subscription";

const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// The graph schema that generation validates operation text against. Built
/// once from SDL text and read-only for the rest of the generation run.
#[derive(Debug, Clone)]
pub struct Schema {
    pub type_definitions: Vec<TypeDefinition>,
    query_root: Option<String>,
    mutation_root: Option<String>,
    subscription_root: Option<String>,
}

impl Schema {
    pub fn from_sdl(sdl: &str) -> Result<Schema, GenerationError> {
        let document =
            parse_schema(sdl).map_err(|e| GenerationError::SchemaParsingFailed(e.to_string()))?;

        let mut type_definitions: Vec<TypeDefinition> = vec![];
        let mut declared_roots: Option<(Option<String>, Option<String>, Option<String>)> = None;

        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Type(td) => type_definitions.push(td.node),
                TypeSystemDefinition::Schema(sd) => {
                    declared_roots = Some((
                        sd.node.query.map(|name| name.node.to_string()),
                        sd.node.mutation.map(|name| name.node.to_string()),
                        sd.node.subscription.map(|name| name.node.to_string()),
                    ));
                }
                TypeSystemDefinition::Directive(_) => {}
            }
        }

        let default_root = |name: &str, type_definitions: &[TypeDefinition]| {
            type_definitions
                .iter()
                .any(|td| td.name.node.as_str() == name)
                .then(|| name.to_string())
        };

        let (query_root, mutation_root, subscription_root) = match declared_roots {
            Some(roots) => roots,
            None => (
                default_root(QUERY_ROOT_TYPENAME, &type_definitions),
                default_root(MUTATION_ROOT_TYPENAME, &type_definitions),
                default_root(SUBSCRIPTION_ROOT_TYPENAME, &type_definitions),
            ),
        };

        Ok(Schema {
            type_definitions,
            query_root,
            mutation_root,
            subscription_root,
        })
    }

    pub fn query_root(&self) -> Option<&str> {
        self.query_root.as_deref()
    }

    pub fn mutation_root(&self) -> Option<&str> {
        self.mutation_root.as_deref()
    }

    pub fn subscription_root(&self) -> Option<&str> {
        self.subscription_root.as_deref()
    }

    pub fn get_type_definition(&self, type_name: &str) -> Option<&TypeDefinition> {
        self.type_definitions
            .iter()
            .find(|td| td.name.node.as_str() == type_name)
    }

    /// A type name is known if it is defined in the SDL or is a builtin scalar.
    pub fn is_known_type(&self, type_name: &str) -> bool {
        Self::is_builtin_scalar(type_name) || self.get_type_definition(type_name).is_some()
    }

    pub fn is_builtin_scalar(type_name: &str) -> bool {
        BUILTIN_SCALARS.contains(&type_name)
    }

    /// Whether the named type can carry a selection set.
    pub fn is_composite(&self, type_name: &str) -> bool {
        matches!(
            self.get_type_definition(type_name).map(|td| &td.kind),
            Some(TypeKind::Object(_) | TypeKind::Interface(_) | TypeKind::Union(_))
        )
    }

    /// The fields selectable on the named type (objects and interfaces).
    pub fn type_fields<'a>(
        &self,
        type_definition: &'a TypeDefinition,
    ) -> Option<&'a [Positioned<FieldDefinition>]> {
        match &type_definition.kind {
            TypeKind::Object(ObjectType { fields, .. }) => Some(fields),
            TypeKind::Interface(interface) => Some(&interface.fields),
            _ => None,
        }
    }

    /// The concrete object types a value of the named type may be at runtime:
    /// the type itself for objects, implementors for interfaces, members for
    /// unions.
    pub fn possible_types(&self, type_name: &str) -> Vec<&str> {
        let Some(type_definition) = self.get_type_definition(type_name) else {
            return vec![];
        };

        match &type_definition.kind {
            TypeKind::Object(_) => vec![type_definition.name.node.as_str()],
            TypeKind::Interface(_) => self
                .type_definitions
                .iter()
                .filter(|td| match &td.kind {
                    TypeKind::Object(object) => object
                        .implements
                        .iter()
                        .any(|implemented| implemented.node.as_str() == type_name),
                    _ => false,
                })
                .map(|td| td.name.node.as_str())
                .collect(),
            TypeKind::Union(union) => union
                .members
                .iter()
                .map(|member| member.node.as_str())
                .collect(),
            _ => vec![],
        }
    }
}
