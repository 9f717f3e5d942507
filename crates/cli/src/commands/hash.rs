use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use binding_builder::{build_document_bindings, BuildOptions, Schema};

use super::command::{get_required, schema_arg, CommandDefinition};

pub struct HashCommandDefinition {}

impl CommandDefinition for HashCommandDefinition {
    fn command(&self) -> Command {
        Command::new("hash")
            .about("Print the cache identity of each operation in a document")
            .arg(schema_arg())
            .arg(
                Arg::new("document")
                    .help("The path to the operation document file.")
                    .required(true)
                    .value_parser(clap::value_parser!(PathBuf))
                    .index(2),
            )
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let schema_path: PathBuf = get_required(matches, "schema")?;
        let document_path: PathBuf = get_required(matches, "document")?;

        let sdl = std::fs::read_to_string(&schema_path)?;
        let schema = Schema::from_sdl(&sdl)?;

        let source = std::fs::read_to_string(&document_path)?;
        let bindings = build_document_bindings(&schema, &source, &BuildOptions::default())?;

        // The identity is computed over the rendered wire text, so it is
        // obtained by building the binding, not by hashing the file bytes.
        for binding in &bindings {
            println!("{}\t{}", binding.name, binding.cache_identity);
        }

        Ok(())
    }
}
