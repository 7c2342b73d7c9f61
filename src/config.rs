//! The configuration value handed to every pipeline stage.
//!
//! All paths and tunables of a run live in one [`PipelineConfig`], built once
//! from the command line and then borrowed by the stages. There is no
//! process-wide state.

use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::resources::ResourceBundle;
use crate::resources::Resolution;
use crate::utils::pathbuf::AppendSuffix;

/// Depth thresholds requested from mosdepth by the coverage stage.
pub const DEPTH_THRESHOLDS: [u32; 3] = [1, 10, 30];

/// FREEMIX above which a sample is flagged as possibly contaminated.
pub const DEFAULT_CONTAMINATION_THRESHOLD: f64 = 0.03;

/// Default number of threads forwarded to the external tools.
pub const DEFAULT_THREADS: usize = 4;

/// Default `--Epsilon` passed to VerifyBamID2.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Where the external tools are found.
#[derive(Clone, Debug, Serialize)]
pub struct ToolPaths {
    /// The mosdepth executable.
    pub mosdepth: PathBuf,

    /// The VerifyBamID2 executable.
    pub verifybamid2: PathBuf,

    /// The samtools executable.
    pub samtools: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        ToolPaths {
            mosdepth: PathBuf::from("mosdepth"),
            verifybamid2: PathBuf::from("verifybamid2"),
            samtools: PathBuf::from("samtools"),
        }
    }
}

/// Everything a QC run needs to know.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineConfig {
    /// The BAM or CRAM file under QC.
    pub alignment: PathBuf,

    /// The target-capture BED file.
    pub regions: PathBuf,

    /// The reference FASTA the alignment was produced against.
    pub reference_fasta: PathBuf,

    /// Directory all outputs are written to.
    pub results_dir: PathBuf,

    /// Directory holding the VerifyBamID2 resource bundle.
    pub resource_dir: PathBuf,

    /// Name used as the prefix of every output file.
    pub sample: String,

    /// Which resource bundle to use.
    pub resolution: Resolution,

    /// Threads forwarded to the external tools.
    pub threads: usize,

    /// `--Epsilon` for the primary VerifyBamID2 invocation.
    pub epsilon: f64,

    /// FREEMIX above which contamination is reported.
    pub contamination_threshold: f64,

    /// Convert a CRAM input to BAM before running VerifyBamID2.
    pub convert_cram: bool,

    /// External tool executables.
    pub tools: ToolPaths,
}

impl PipelineConfig {
    /// Creates a configuration with default tunables. The sample name is
    /// derived from the alignment file name.
    pub fn new<A, R, F, D>(alignment: A, regions: R, reference_fasta: F, results_dir: D) -> Self
    where
        A: Into<PathBuf>,
        R: Into<PathBuf>,
        F: Into<PathBuf>,
        D: Into<PathBuf>,
    {
        let alignment = alignment.into();
        let sample = sample_name(&alignment);

        PipelineConfig {
            alignment,
            regions: regions.into(),
            reference_fasta: reference_fasta.into(),
            results_dir: results_dir.into(),
            resource_dir: PathBuf::from("data/references/verifybamid2"),
            sample,
            resolution: Resolution::default(),
            threads: DEFAULT_THREADS,
            epsilon: DEFAULT_EPSILON,
            contamination_threshold: DEFAULT_CONTAMINATION_THRESHOLD,
            convert_cram: true,
            tools: ToolPaths::default(),
        }
    }

    /// The prefix every output file of the run starts with.
    pub fn output_prefix(&self) -> PathBuf {
        self.results_dir.join(&self.sample)
    }

    /// An output file of the run, named `<sample><suffix>`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_prefix().append_suffix(suffix)
    }

    /// The persistent log of the run.
    pub fn run_log(&self) -> PathBuf {
        self.output_path(".qc.log")
    }

    /// The selected VerifyBamID2 resource bundle.
    pub fn resource_bundle(&self) -> ResourceBundle {
        ResourceBundle::new(&self.resource_dir, self.resolution)
    }
}

/// Derives a sample name from an alignment path: the file name up to its
/// first `.` (`NA06994.alt_bwamem_GRCh38DH.exome.cram` gives `NA06994`).
pub fn sample_name(alignment: &Path) -> String {
    let file_name = alignment
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.split('.').next() {
        Some(s) if !s.is_empty() => String::from(s),
        _ => String::from("sample"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_sample_name_from_alignment() {
        assert_eq!(
            sample_name(Path::new(
                "data/NA06994.alt_bwamem_GRCh38DH.20150826.CEU.exome.cram"
            )),
            "NA06994"
        );
        assert_eq!(sample_name(Path::new("sample.bam")), "sample");
        assert_eq!(sample_name(Path::new(".hidden.bam")), "sample");
    }

    #[test]
    pub fn test_output_paths() {
        let config = PipelineConfig::new("data/NA06994.cram", "targets.bed", "ref.fa", "results");

        assert_eq!(config.output_prefix(), PathBuf::from("results/NA06994"));
        assert_eq!(
            config.output_path(".qc_report.txt"),
            PathBuf::from("results/NA06994.qc_report.txt")
        );
        assert_eq!(config.run_log(), PathBuf::from("results/NA06994.qc.log"));
        assert_eq!(
            config.resource_bundle().svd_prefix(),
            PathBuf::from("data/references/verifybamid2/1000g.phase3.100k.b38.vcf.gz.dat")
        );
    }
}
