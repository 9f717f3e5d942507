use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgMatches, Command};

use binding_builder::{build_pack_from_files, BuildOptions, DEFAULT_DEPTH_LIMIT};

use super::command::{
    depth_limit_arg, documents_arg, get, get_required, schema_arg, CommandDefinition,
};

pub struct CheckCommandDefinition {}

impl CommandDefinition for CheckCommandDefinition {
    fn command(&self) -> Command {
        Command::new("check")
            .about("Validate operation documents against a schema without writing a pack")
            .arg(schema_arg())
            .arg(documents_arg())
            .arg(depth_limit_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let schema: PathBuf = get_required(matches, "schema")?;
        let documents: Vec<PathBuf> = matches
            .get_many::<PathBuf>("documents")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default();

        let options = BuildOptions {
            depth_limit: get(matches, "depth-limit").unwrap_or(DEFAULT_DEPTH_LIMIT),
            ..BuildOptions::default()
        };

        let pack = build_pack_from_files(&schema, &documents, &options)?;

        for binding in &pack.bindings {
            println!("{} {}: ok", binding.kind, binding.name);
        }

        Ok(())
    }
}
