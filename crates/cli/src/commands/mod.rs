//! Top level subcommands

pub(crate) mod check;
pub(crate) mod command;
pub(crate) mod generate;
pub(crate) mod hash;
