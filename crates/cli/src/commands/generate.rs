use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgMatches, Command};

use binding_builder::{build_pack_from_files, BuildOptions, DEFAULT_DEPTH_LIMIT};
use binding_model::pack_serializer::PackSerializer;

use super::command::{
    allow_unlisted_arg, depth_limit_arg, documents_arg, get, get_required, manifest_arg,
    output_arg, schema_arg, CommandDefinition,
};

pub struct GenerateCommandDefinition {}

impl CommandDefinition for GenerateCommandDefinition {
    fn command(&self) -> Command {
        Command::new("generate")
            .about("Generate a binding pack from a schema and operation documents")
            .arg(schema_arg())
            .arg(documents_arg())
            .arg(output_arg())
            .arg(manifest_arg())
            .arg(depth_limit_arg())
            .arg(allow_unlisted_arg())
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let schema: PathBuf = get_required(matches, "schema")?;
        let documents: Vec<PathBuf> = matches
            .get_many::<PathBuf>("documents")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default();
        let output: PathBuf = get_required(matches, "output")?;
        let manifest: Option<PathBuf> = get(matches, "manifest");

        let options = BuildOptions {
            depth_limit: get(matches, "depth-limit").unwrap_or(DEFAULT_DEPTH_LIMIT),
            allow_unlisted: matches.get_flag("allow-unlisted"),
        };

        let pack = build_pack_from_files(&schema, &documents, &options)?;

        let bytes = pack.serialize()?;
        let mut writer = BufWriter::new(File::create(&output)?);
        writer.write_all(&bytes)?;
        writer.flush()?;

        println!(
            "Wrote {} binding(s) to {}",
            pack.bindings.len(),
            output.display()
        );

        if let Some(manifest_path) = manifest {
            let entries: serde_json::Map<String, serde_json::Value> = pack
                .bindings
                .iter()
                .map(|binding| {
                    (
                        binding.name.clone(),
                        serde_json::Value::String(binding.cache_identity.clone()),
                    )
                })
                .collect();

            let manifest_writer = BufWriter::new(File::create(&manifest_path)?);
            serde_json::to_writer_pretty(manifest_writer, &entries)?;

            println!("Wrote manifest to {}", manifest_path.display());
        }

        Ok(())
    }
}
