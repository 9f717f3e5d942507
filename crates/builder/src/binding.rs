use std::path::Path;

use async_graphql_parser::{parse_query, types::DocumentOperations, Pos};
use tracing::{debug, instrument};

use binding_model::{
    cache_identity::cache_identity,
    operation::QueryBinding,
    pack::BindingPack,
    persisted_documents::PersistedDocuments,
    selection::{FieldKind, FieldSelection, Selection, WireType, TYPENAME_FIELD},
    wire_text::wire_text,
};

use crate::error::GenerationError;
use crate::schema::Schema;
use crate::validation::{document_validator::DocumentValidator, validation_error::ValidationError};

pub const DEFAULT_DEPTH_LIMIT: usize = 15;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum field nesting depth accepted in an operation.
    pub depth_limit: usize,
    /// Whether the pack's persisted documents admit operation text that is
    /// not listed in the pack.
    pub allow_unlisted: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
            allow_unlisted: false,
        }
    }
}

/// Build the binding for one operation of a document.
///
/// The wire text is rendered from the operation tree, so everything the
/// response shape demands of the server, injected `__typename` discriminators
/// included, is in the text that goes over the wire (and gets hashed).
/// Rendering is deterministic: rebuilding a binding from its own text yields
/// the same text and the same operation tree.
pub fn build_binding(
    schema: &Schema,
    source: &str,
    operation_name: Option<&str>,
    options: &BuildOptions,
) -> Result<QueryBinding, GenerationError> {
    let document =
        parse_query(source).map_err(|e| GenerationError::QueryParsingFailed(e.to_string()))?;

    let operation = DocumentValidator::new(
        schema,
        operation_name.map(str::to_string),
        options.depth_limit,
    )
    .validate(document)?;

    let name = operation
        .name
        .ok_or(GenerationError::Validation(ValidationError::AnonymousOperation))?;

    // This cannot fail for a validated operation, but the error is mapped
    // rather than swallowed in case the arena and tree ever disagree.
    let inlined = operation.fragments.inline(&operation.fields).map_err(|e| {
        GenerationError::Validation(ValidationError::FragmentDefinitionNotFound(
            e.0,
            Pos::default(),
        ))
    })?;
    let operation_tree = inject_discriminators(inlined);

    let text = wire_text(&name, operation.kind, &operation.variables, &operation_tree);

    Ok(QueryBinding {
        name,
        kind: operation.kind,
        cache_identity: cache_identity(&text)?,
        text,
        variables: operation.variables,
        fragments: operation.fragments,
        fragment_tree: operation.fields,
        operation_tree,
    })
}

/// Build one binding per operation in the document. Single-operation
/// documents need no operation name; multi-operation documents are walked
/// name by name.
pub fn build_document_bindings(
    schema: &Schema,
    source: &str,
    options: &BuildOptions,
) -> Result<Vec<QueryBinding>, GenerationError> {
    let document =
        parse_query(source).map_err(|e| GenerationError::QueryParsingFailed(e.to_string()))?;

    let operation_names: Vec<Option<String>> = match &document.operations {
        DocumentOperations::Single(_) => vec![None],
        DocumentOperations::Multiple(operations) => operations
            .keys()
            .map(|name| Some(name.to_string()))
            .collect(),
    };

    operation_names
        .into_iter()
        .map(|name| build_binding(schema, source, name.as_deref(), options))
        .collect()
}

/// Build a pack from a set of operation documents. Operation names must be
/// unique across the whole set: the pack is keyed by them.
#[instrument(skip_all)]
pub fn build_pack<'a>(
    schema: &Schema,
    sources: impl IntoIterator<Item = &'a str>,
    options: &BuildOptions,
) -> Result<BindingPack, GenerationError> {
    let mut bindings: Vec<QueryBinding> = vec![];

    for source in sources {
        for binding in build_document_bindings(schema, source, options)? {
            if bindings.iter().any(|b| b.name == binding.name) {
                return Err(GenerationError::DuplicateOperation(binding.name));
            }
            debug!(operation = %binding.name, kind = %binding.kind, "generated binding");
            bindings.push(binding);
        }
    }

    let persisted_documents = PersistedDocuments::from_bindings(&bindings, options.allow_unlisted);

    Ok(BindingPack {
        bindings,
        persisted_documents,
    })
}

/// Build a pack from a schema file and a set of operation document files.
pub fn build_pack_from_files(
    schema_path: &Path,
    document_paths: &[impl AsRef<Path>],
    options: &BuildOptions,
) -> Result<BindingPack, GenerationError> {
    let sdl = std::fs::read_to_string(schema_path)?;
    let schema = Schema::from_sdl(&sdl)?;

    let sources = document_paths
        .iter()
        .map(|path| std::fs::read_to_string(path))
        .collect::<Result<Vec<_>, _>>()?;

    build_pack(&schema, sources.iter().map(String::as_str), options)
}

/// Inject a `__typename` discriminator into every selection level that
/// carries a type branch, so that branch matching at runtime never needs
/// schema knowledge. A discriminator already selected by the author (without
/// an alias) is reused, not duplicated.
fn inject_discriminators(selections: Vec<Selection>) -> Vec<Selection> {
    let needs_discriminator = selections
        .iter()
        .any(|selection| matches!(selection, Selection::TypeBranch { .. }))
        && !selections.iter().any(|selection| {
            matches!(
                selection,
                Selection::Field(field) if field.name == TYPENAME_FIELD && field.alias.is_none()
            )
        });

    let mut injected = Vec::with_capacity(selections.len() + usize::from(needs_discriminator));

    if needs_discriminator {
        injected.push(Selection::Field(FieldSelection {
            alias: None,
            name: TYPENAME_FIELD.to_string(),
            arguments: Default::default(),
            ty: WireType::non_null("String"),
            kind: FieldKind::TypeDiscriminator,
            selections: vec![],
        }));
    }

    for selection in selections {
        match selection {
            Selection::Field(field) => injected.push(Selection::Field(FieldSelection {
                selections: inject_discriminators(field.selections),
                ..field
            })),
            Selection::TypeBranch { on, selections } => injected.push(Selection::TypeBranch {
                on,
                selections: inject_discriminators(selections),
            }),
            Selection::FragmentRef { .. } => injected.push(selection),
        }
    }

    injected
}
