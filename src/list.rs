//! Functionality related to the `wesqc list` subcommand.

pub mod command;
