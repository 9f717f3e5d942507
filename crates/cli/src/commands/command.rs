use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub trait CommandDefinition {
    fn command(&self) -> Command;

    fn execute(&self, matches: &ArgMatches) -> Result<()>;
}

pub struct SubcommandDefinition {
    pub name: &'static str,
    pub about: &'static str,
    pub command_definitions: Vec<Box<dyn CommandDefinition>>,
}

impl SubcommandDefinition {
    pub fn new(
        name: &'static str,
        about: &'static str,
        command_definitions: Vec<Box<dyn CommandDefinition>>,
    ) -> Self {
        Self {
            name,
            about,
            command_definitions,
        }
    }
}

impl CommandDefinition for SubcommandDefinition {
    fn command(&self) -> Command {
        Command::new(self.name)
            .about(self.about)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .subcommands(
                self.command_definitions
                    .iter()
                    .map(|command_definition| command_definition.command()),
            )
    }

    fn execute(&self, matches: &ArgMatches) -> Result<()> {
        let subcommand = matches.subcommand().unwrap();
        for command_definition in &self.command_definitions {
            if command_definition.command().get_name() == subcommand.0 {
                return command_definition.execute(subcommand.1);
            }
        }

        Err(anyhow!("Unknown subcommand: {}", subcommand.0))
    }
}

pub fn get_required<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    arg_id: &str,
) -> Result<T> {
    get(matches, arg_id).ok_or_else(|| anyhow!("Required argument `{}` is not present", arg_id))
}

pub fn get<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, arg_id: &str) -> Option<T> {
    matches.get_one::<T>(arg_id).cloned()
}

const DEFAULT_PACK_FILE: &str = "bindings.bindpack";

pub fn schema_arg() -> Arg {
    Arg::new("schema")
        .help("The path to the schema SDL file.")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .index(1)
}

pub fn documents_arg() -> Arg {
    Arg::new("documents")
        .help("Paths to operation document files.")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .num_args(1..)
        .index(2)
}

pub fn output_arg() -> Arg {
    Arg::new("output")
        .help("Binding pack output file path")
        .short('o')
        .long("output")
        .required(false)
        .hide_default_value(false)
        .value_parser(clap::value_parser!(PathBuf))
        .default_value(DEFAULT_PACK_FILE)
        .num_args(1)
}

pub fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .help("JSON manifest output file path")
        .long_help(
            "If specified, a JSON manifest mapping each operation name to its cache identity will be written to this path.",
        )
        .long("manifest")
        .required(false)
        .value_parser(clap::value_parser!(PathBuf))
        .num_args(1)
}

pub fn depth_limit_arg() -> Arg {
    Arg::new("depth-limit")
        .help("Maximum accepted selection nesting depth")
        .long("depth-limit")
        .required(false)
        .value_parser(clap::value_parser!(usize))
        .num_args(1)
}

pub fn allow_unlisted_arg() -> Arg {
    Arg::new("allow-unlisted")
        .help("Let the pack's persisted documents admit operation text not listed in the pack")
        .long("allow-unlisted")
        .required(false)
        .action(ArgAction::SetTrue)
}
