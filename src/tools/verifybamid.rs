//! Command lines for VerifyBamID2, the contamination estimator.
//!
//! VerifyBamID2 accepts its population reference in two shapes: a single
//! `--SVDPrefix` from which it derives the UD, V, bed and mu files, or the
//! UD, bed and mu files passed individually. The first is tried first.

use std::path::Path;
use std::path::PathBuf;

use crate::resources::ResourceBundle;
use crate::resources::ResourceKind;
use crate::tools::Invocation;
use crate::utils::pathbuf::AppendSuffix;

/// Name of the tool in logs and errors.
pub const TOOL: &str = "verifybamid2";

/// A VerifyBamID2 run for one alignment.
#[derive(Clone, Debug)]
pub struct VerifyBamId<'a> {
    /// The VerifyBamID2 executable.
    pub program: &'a Path,

    /// The resource bundle.
    pub bundle: &'a ResourceBundle,

    /// Reference FASTA.
    pub reference_fasta: &'a Path,

    /// The BAM file.
    pub alignment: &'a Path,

    /// Output prefix.
    pub output: &'a Path,

    /// Worker threads.
    pub threads: usize,

    /// Convergence epsilon (primary form only).
    pub epsilon: f64,
}

impl<'a> VerifyBamId<'a> {
    /// The primary command line, using the bundle's combined prefix.
    pub fn primary(&self) -> Invocation {
        Invocation::new(TOOL, self.program)
            .option("--SVDPrefix", self.bundle.svd_prefix())
            .option("--Reference", self.reference_fasta)
            .option("--BamFile", self.alignment)
            .option("--Output", self.output)
            .option("--NumThread", self.threads.to_string())
            .option("--Epsilon", format!("{:e}", self.epsilon))
    }

    /// The fallback command line, naming the resource files individually.
    pub fn fallback(&self) -> Invocation {
        Invocation::new(TOOL, self.program)
            .option("--UDPath", self.bundle.path(ResourceKind::Ud))
            .option("--BedPath", self.bundle.path(ResourceKind::Bed))
            .option("--MeanPath", self.bundle.path(ResourceKind::Mu))
            .option("--Reference", self.reference_fasta)
            .option("--BamFile", self.alignment)
            .option("--Output", self.output)
            .option("--NumThread", self.threads.to_string())
    }
}

/// The result table VerifyBamID2 writes for `output`.
pub fn self_sm_path(output: &Path) -> PathBuf {
    output.append_suffix(".selfSM")
}
