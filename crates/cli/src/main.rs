use anyhow::Result;

use commands::{
    check::CheckCommandDefinition,
    command::{CommandDefinition, SubcommandDefinition},
    generate::GenerateCommandDefinition,
    hash::HashCommandDefinition,
};

mod commands;
mod logging;

fn main() -> Result<()> {
    logging::init();

    let subcommand_definition = SubcommandDefinition::new(
        "graphbind",
        "Generate and inspect typed query binding packs",
        vec![
            Box::new(GenerateCommandDefinition {}),
            Box::new(CheckCommandDefinition {}),
            Box::new(HashCommandDefinition {}),
        ],
    );

    let command = subcommand_definition
        .command()
        .version(env!("CARGO_PKG_VERSION"));

    let matches = command.get_matches();

    subcommand_definition.execute(&matches)
}
