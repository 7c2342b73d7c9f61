//! Functionality related to the `wesqc check` subcommand.

pub mod command;
pub mod manifest;
