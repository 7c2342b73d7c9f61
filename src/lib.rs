//! `wesqc` is a command line tool for running quality control over
//! whole-exome sequencing alignments. It drives mosdepth, VerifyBamID2 and
//! samtools to measure target coverage, infer genetic sex and estimate
//! contamination, and summarizes the results in a fixed-layout report. This
//! package is composed of both a library crate, as well as a binary crate.
//!
//! This documentation refers to the library crate, for use by developers of
//! `wesqc`. The stages live under [`qc`]; the external tools they drive are
//! described in [`tools`].
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]

pub mod check;
pub mod config;
pub mod errors;
pub mod formats;
pub mod list;
pub mod qc;
pub mod resources;
pub mod tools;
pub mod utils;
