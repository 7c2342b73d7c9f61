//! Functionality related to the `wesqc run` command itself.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::debug;
use tracing::info;

use crate::config::sample_name;
use crate::config::PipelineConfig;
use crate::config::ToolPaths;
use crate::config::DEFAULT_CONTAMINATION_THRESHOLD;
use crate::config::DEFAULT_EPSILON;
use crate::config::DEFAULT_THREADS;
use crate::qc::pipeline::Pipeline;
use crate::resources::Resolution;
use crate::tools::SubprocessRunner;

//========================//
// Command line arguments //
//========================//

/// Clap arguments for the `wesqc run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source BAM or CRAM file.
    #[arg(value_name = "BAM/CRAM")]
    alignment: PathBuf,

    /// Target-capture regions (BED, optionally gzipped).
    #[arg(short = 'b', long, value_name = "PATH")]
    regions: PathBuf,

    /// Reference FASTA the alignment was produced against.
    #[arg(short = 'r', long = "reference", value_name = "PATH")]
    reference_fasta: PathBuf,

    /// Directory to write results to.
    #[arg(short = 'o', long, value_name = "PATH", default_value = "results")]
    results_dir: PathBuf,

    /// Prefix for the output files. Defaults to the alignment file name up to
    /// the first `.`.
    #[arg(short = 'p', long, value_name = "STRING")]
    sample: Option<String>,

    /// Directory holding the VerifyBamID2 resource bundle.
    #[arg(long, value_name = "PATH", default_value = "data/references/verifybamid2")]
    resource_dir: PathBuf,

    /// Marker resolution of the resource bundle.
    #[arg(long, value_enum, default_value_t = Resolution::HundredK)]
    resolution: Resolution,

    /// Threads forwarded to mosdepth and VerifyBamID2.
    #[arg(short = 't', long, value_name = "USIZE", default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Convergence epsilon for VerifyBamID2.
    #[arg(long, value_name = "F64", default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// FREEMIX above which the sample is flagged as contaminated.
    #[arg(long, value_name = "F64", default_value_t = DEFAULT_CONTAMINATION_THRESHOLD)]
    contamination_threshold: f64,

    /// Pass a CRAM input to VerifyBamID2 as is instead of converting it.
    #[arg(long)]
    no_cram_conversion: bool,

    /// mosdepth executable.
    #[arg(long, value_name = "PATH", env = "WESQC_MOSDEPTH", default_value = "mosdepth")]
    mosdepth: PathBuf,

    /// VerifyBamID2 executable.
    #[arg(
        long,
        value_name = "PATH",
        env = "WESQC_VERIFYBAMID2",
        default_value = "verifybamid2"
    )]
    verifybamid2: PathBuf,

    /// samtools executable.
    #[arg(long, value_name = "PATH", env = "WESQC_SAMTOOLS", default_value = "samtools")]
    samtools: PathBuf,
}

impl RunArgs {
    /// Builds the [`PipelineConfig`] described by the arguments.
    pub fn into_config(self) -> PipelineConfig {
        let sample = self
            .sample
            .unwrap_or_else(|| sample_name(&self.alignment));

        PipelineConfig {
            alignment: self.alignment,
            regions: self.regions,
            reference_fasta: self.reference_fasta,
            results_dir: self.results_dir,
            resource_dir: self.resource_dir,
            sample,
            resolution: self.resolution,
            threads: self.threads,
            epsilon: self.epsilon,
            contamination_threshold: self.contamination_threshold,
            convert_cram: !self.no_cram_conversion,
            tools: ToolPaths {
                mosdepth: self.mosdepth,
                verifybamid2: self.verifybamid2,
                samtools: self.samtools,
            },
        }
    }
}

//=========//
// Run log //
//=========//

/// Opens `<results>/<sample>.qc.log` for appending, creating the results
/// directory if needed.
pub fn open_run_log(config: &PipelineConfig) -> anyhow::Result<File> {
    fs::create_dir_all(&config.results_dir).with_context(|| {
        format!(
            "creating results directory: {}",
            config.results_dir.display()
        )
    })?;

    let path = config.run_log();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening run log: {}", path.display()))
}

//==============//
// Main program //
//==============//

/// Runs the main program for the `run` subcommand.
pub fn run(config: PipelineConfig) -> anyhow::Result<()> {
    info!("Starting run command...");
    debug!("Arguments:");
    debug!("  [*] Alignment: {}", config.alignment.display());
    debug!("  [*] Regions: {}", config.regions.display());
    debug!("  [*] Reference FASTA: {}", config.reference_fasta.display());
    debug!("  [*] Results directory: {}", config.results_dir.display());
    debug!("  [*] Sample: {}", config.sample);
    debug!("  [*] Resource directory: {}", config.resource_dir.display());
    debug!("  [*] Resolution: {}", config.resolution);
    debug!("  [*] Threads: {}", config.threads);
    debug!("  [*] Epsilon: {:e}", config.epsilon);
    debug!(
        "  [*] Contamination threshold: {}",
        config.contamination_threshold
    );
    debug!("  [*] Convert CRAM: {}", config.convert_cram);
    debug!("  [*] Tools: {:?}", config.tools);

    let report = Pipeline::new(&config, &SubprocessRunner).run()?;
    print!("{}", report.render());

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(args: &[&str]) -> PipelineConfig {
        let mut argv = vec!["wesqc"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().args.into_config()
    }

    #[test]
    pub fn test_defaults() {
        let config = parse(&[
            "data/NA06994.alt_bwamem_GRCh38DH.exome.cram",
            "--regions",
            "targets.bed",
            "--reference",
            "GRCh38.fa",
        ]);

        assert_eq!(config.sample, "NA06994");
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.resolution, Resolution::HundredK);
        assert_eq!(config.threads, 4);
        assert_eq!(config.epsilon, 1e-8);
        assert_eq!(config.contamination_threshold, 0.03);
        assert!(config.convert_cram);
    }

    #[test]
    pub fn test_overrides() {
        let config = parse(&[
            "sample.bam",
            "-b",
            "targets.bed.gz",
            "-r",
            "GRCh38.fa",
            "-o",
            "out",
            "-p",
            "HG002",
            "--resolution",
            "10k",
            "-t",
            "16",
            "--no-cram-conversion",
            "--samtools",
            "/opt/samtools/bin/samtools",
        ]);

        assert_eq!(config.sample, "HG002");
        assert_eq!(config.output_prefix(), PathBuf::from("out/HG002"));
        assert_eq!(config.resolution, Resolution::TenK);
        assert_eq!(config.threads, 16);
        assert!(!config.convert_cram);
        assert_eq!(
            config.tools.samtools,
            PathBuf::from("/opt/samtools/bin/samtools")
        );
    }

    #[test]
    pub fn test_open_run_log_creates_results_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(
            "NA06994.bam",
            "targets.bed",
            "ref.fa",
            dir.path().join("results"),
        );

        open_run_log(&config).unwrap();
        assert!(config.run_log().exists());
    }
}
