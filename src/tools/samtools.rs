//! Command lines for samtools, used to turn a CRAM into an indexed BAM for
//! VerifyBamID2.

use std::path::Path;

use crate::tools::Invocation;

/// Name of the tool in logs and errors.
pub const TOOL: &str = "samtools";

/// `samtools view -b -T <reference> -o <bam> <cram>`.
pub fn cram_to_bam(program: &Path, reference_fasta: &Path, cram: &Path, bam: &Path) -> Invocation {
    Invocation::new(TOOL, program)
        .arg("view")
        .arg("-b")
        .option("-T", reference_fasta)
        .option("-o", bam)
        .arg(cram)
}

/// `samtools index <bam>`.
pub fn index(program: &Path, bam: &Path) -> Invocation {
    Invocation::new(TOOL, program).arg("index").arg(bam)
}
