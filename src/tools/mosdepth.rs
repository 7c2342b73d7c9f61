//! Command lines for mosdepth, the depth calculator.

use std::path::Path;
use std::path::PathBuf;

use crate::tools::Invocation;
use crate::utils::pathbuf::AppendSuffix;

/// Name of the tool in logs and errors.
pub const TOOL: &str = "mosdepth";

/// A mosdepth run over one region set.
#[derive(Clone, Debug)]
pub struct Mosdepth<'a> {
    /// The mosdepth executable.
    pub program: &'a Path,

    /// Reference FASTA (needed to decode CRAM).
    pub reference_fasta: &'a Path,

    /// The BED file given to `--by`.
    pub regions: &'a Path,

    /// Depth thresholds for the per-interval thresholds table, if any.
    pub thresholds: Option<&'a [u32]>,

    /// Decompression threads.
    pub threads: usize,

    /// Output prefix.
    pub prefix: &'a Path,

    /// The BAM or CRAM file.
    pub alignment: &'a Path,
}

impl<'a> Mosdepth<'a> {
    /// Builds the command line. `REF_PATH` is also set so that htslib can
    /// find the reference for CRAM slices without an embedded reference.
    pub fn invocation(&self) -> Invocation {
        let mut invocation = Invocation::new(TOOL, self.program)
            .option("--threads", self.threads.to_string())
            .option("--fasta", self.reference_fasta)
            .option("--by", self.regions);

        if let Some(thresholds) = self.thresholds {
            let joined = thresholds
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            invocation = invocation.option("--thresholds", joined);
        }

        invocation
            .arg(self.prefix)
            .arg(self.alignment)
            .env("REF_PATH", self.reference_fasta)
    }
}

/// The summary table mosdepth writes for `prefix`.
pub fn summary_path(prefix: &Path) -> PathBuf {
    prefix.append_suffix(".mosdepth.summary.txt")
}

/// The thresholds table mosdepth writes for `prefix` when `--thresholds`
/// is given.
pub fn thresholds_path(prefix: &Path) -> PathBuf {
    prefix.append_suffix(".thresholds.bed.gz")
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;

    #[test]
    pub fn test_invocation_with_thresholds() {
        let invocation = Mosdepth {
            program: Path::new("mosdepth"),
            reference_fasta: Path::new("ref.fa"),
            regions: Path::new("targets.bed"),
            thresholds: Some(&[1, 10, 30]),
            threads: 4,
            prefix: Path::new("results/NA06994"),
            alignment: Path::new("NA06994.cram"),
        }
        .invocation();

        let args: Vec<OsString> = [
            "--threads",
            "4",
            "--fasta",
            "ref.fa",
            "--by",
            "targets.bed",
            "--thresholds",
            "1,10,30",
            "results/NA06994",
            "NA06994.cram",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        assert_eq!(invocation.args(), args.as_slice());
        assert_eq!(
            invocation.envs(),
            &[(OsString::from("REF_PATH"), OsString::from("ref.fa"))]
        );
    }

    #[test]
    pub fn test_invocation_without_thresholds() {
        let invocation = Mosdepth {
            program: Path::new("mosdepth"),
            reference_fasta: Path::new("ref.fa"),
            regions: Path::new("chrX.bed"),
            thresholds: None,
            threads: 1,
            prefix: Path::new("results/NA06994.chrX"),
            alignment: Path::new("NA06994.cram"),
        }
        .invocation();

        assert_eq!(invocation.option_value("--thresholds"), None);
        assert_eq!(
            summary_path(Path::new("results/NA06994.chrX")),
            PathBuf::from("results/NA06994.chrX.mosdepth.summary.txt")
        );
    }
}
