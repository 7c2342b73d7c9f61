//! Utilities that are used across the `wesqc` subcommands.

pub mod display;
pub mod genome;
pub mod pathbuf;
