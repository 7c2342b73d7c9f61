//! Runs the stages in order and decides which failures end the run.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::info;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::errors::Disposition;
use crate::errors::QcError;
use crate::errors::Stage;
use crate::errors::StageError;
use crate::qc::contamination::ContaminationEstimate;
use crate::qc::contamination::ContaminationStage;
use crate::qc::coverage::CoverageStage;
use crate::qc::report::QcReport;
use crate::qc::sex::SexInferenceStage;
use crate::tools::ToolRunner;
use crate::utils::pathbuf::AppendExtension;

/// The QC pipeline for one sample.
pub struct Pipeline<'a, R: ToolRunner + ?Sized> {
    config: &'a PipelineConfig,
    runner: &'a R,
}

impl<'a, R: ToolRunner + ?Sized> Pipeline<'a, R> {
    /// Creates a new [`Pipeline`].
    pub fn new(config: &'a PipelineConfig, runner: &'a R) -> Self {
        Pipeline { config, runner }
    }

    /// Runs Coverage, Sex-Inference and Contamination, then writes the
    /// report. The report is written whenever the first two stages succeed.
    ///
    /// Absorbed failures are logged here. Fatal ones are returned unlogged
    /// for the caller to report.
    pub fn run(&self) -> Result<QcReport, StageError> {
        let config = self.config;
        let runner = self.runner;

        info!("Starting QC for sample {}.", config.sample);
        self.check_preconditions()?;

        let coverage = CoverageStage::new(config).run(runner)?;
        let sex = SexInferenceStage::new(config).run(runner)?;

        let contamination = match ContaminationStage::new(config).run(runner) {
            Ok(estimate) => estimate,
            Err(err) => match err.disposition() {
                Disposition::Absorb => {
                    warn!("{}", err);
                    warn!("  [*] Contamination will be reported as unknown.");
                    ContaminationEstimate::from_failure(&err)
                }
                Disposition::Abort => return Err(err),
            },
        };

        let report = QcReport::new(config, coverage, sex, contamination);
        report
            .write(config)
            .map_err(|e| StageError::new(Stage::Report, e))?;

        info!("QC for sample {} complete.", config.sample);
        Ok(report)
    }

    fn check_preconditions(&self) -> Result<(), StageError> {
        let config = self.config;
        let fail = |e| StageError::new(Stage::Preconditions, e);

        require(&config.alignment, "alignment file").map_err(fail)?;
        require(&config.regions, "region set").map_err(fail)?;
        require(&config.reference_fasta, "reference FASTA").map_err(fail)?;

        if let Some(index) = alignment_index(config) {
            if !index.exists() {
                warn!(
                    "  [*] No alignment index found at {}; mosdepth may refuse the file.",
                    index.display()
                );
            }
        }

        fs::create_dir_all(&config.results_dir).map_err(|e| {
            fail(QcError::io(
                format!("creating {}", config.results_dir.display()),
                e,
            ))
        })
    }
}

fn require(path: &Path, description: &'static str) -> Result<(), QcError> {
    if path.exists() {
        Ok(())
    } else {
        Err(QcError::PreconditionMissing {
            description,
            path: path.to_path_buf(),
        })
    }
}

/// The conventional index path of the alignment (`.bam.bai` or `.cram.crai`).
fn alignment_index(config: &PipelineConfig) -> Option<PathBuf> {
    let alignment = config.alignment.clone();
    let index = match alignment.extension()?.to_str()? {
        ext if ext.eq_ignore_ascii_case("bam") => "bai",
        ext if ext.eq_ignore_ascii_case("cram") => "crai",
        _ => return None,
    };

    alignment.append_extension(index).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qc::contamination::ContaminationOutcome;
    use crate::qc::sex::SexCall;
    use crate::qc::testing::*;
    use crate::tools::mosdepth;
    use crate::tools::samtools;
    use crate::tools::testing::*;
    use crate::tools::verifybamid;

    #[test]
    pub fn test_full_run_writes_report() {
        let sandbox = Sandbox::new();
        sandbox.provision_all();
        let runner = RecordingRunner::new(|invocation| match invocation.tool() {
            mosdepth::TOOL => fake_depths(invocation, 62.3, 35.0, 0.02),
            _ => fake_verifybamid(invocation, 0.004, false),
        });

        let report = Pipeline::new(&sandbox.config, &runner).run().unwrap();

        assert_eq!(report.coverage.mean_depth, 62.3);
        assert_eq!(report.coverage.pct_at_10x, 100.0);
        assert_eq!(report.sex.call, SexCall::Female);
        assert_eq!(report.contamination.outcome, ContaminationOutcome::Primary);
        assert_eq!(runner.count(mosdepth::TOOL), 3);
        assert_eq!(runner.count(verifybamid::TOOL), 1);

        let text = fs::read_to_string(sandbox.config.output_path(".qc_report.txt")).unwrap();
        assert_eq!(text, report.render());
        assert!(sandbox.config.output_path(".results.json").exists());
    }

    #[test]
    pub fn test_contamination_failure_still_reports() {
        let sandbox = Sandbox::new();
        sandbox.provision_all();
        let runner = RecordingRunner::new(|invocation| match invocation.tool() {
            mosdepth::TOOL => fake_depths(invocation, 30.0, 20.0, 10.0),
            _ => failed("Error: BamFile is not readable"),
        });

        let report = Pipeline::new(&sandbox.config, &runner).run().unwrap();

        assert!(report.contamination.freemix.is_nan());
        assert_eq!(report.contamination.outcome, ContaminationOutcome::Failed);
        assert_eq!(runner.count(verifybamid::TOOL), 2);

        let text = fs::read_to_string(sandbox.config.output_path(".qc_report.txt")).unwrap();
        assert!(text.contains("  FREEMIX:              N/A\n"));
    }

    #[test]
    pub fn test_missing_resources_skip_contamination() {
        let sandbox = Sandbox::new();
        let runner = RecordingRunner::new(|invocation| fake_depths(invocation, 30.0, 20.0, 10.0));

        let report = Pipeline::new(&sandbox.config, &runner).run().unwrap();

        assert_eq!(report.contamination.outcome, ContaminationOutcome::Skipped);
        assert_eq!(runner.count(verifybamid::TOOL), 0);
        assert_eq!(runner.count(samtools::TOOL), 0);
    }

    #[test]
    pub fn test_missing_alignment_stops_before_any_tool() {
        let sandbox = Sandbox::new();
        fs::remove_file(&sandbox.config.alignment).unwrap();
        let runner = RecordingRunner::new(|_| succeeded());

        let err = Pipeline::new(&sandbox.config, &runner).run().unwrap_err();

        assert_eq!(err.stage, Stage::Preconditions);
        assert!(matches!(
            err.error,
            QcError::PreconditionMissing {
                description: "alignment file",
                ..
            }
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    pub fn test_coverage_failure_aborts_without_report() {
        let sandbox = Sandbox::new();
        sandbox.provision_all();
        let runner = RecordingRunner::new(|_| failed("[E::hts_open_format] fail to open file"));

        let err = Pipeline::new(&sandbox.config, &runner).run().unwrap_err();

        assert_eq!(err.stage, Stage::Coverage);
        assert_eq!(runner.calls().len(), 1);
        assert!(!sandbox.config.output_path(".qc_report.txt").exists());
    }

    #[test]
    pub fn test_results_directory_is_created() {
        let mut sandbox = Sandbox::new();
        sandbox.config.results_dir = sandbox.dir.path().join("nested/results");
        let runner = RecordingRunner::new(|invocation| fake_depths(invocation, 30.0, 20.0, 10.0));

        Pipeline::new(&sandbox.config, &runner).run().unwrap();

        assert!(sandbox.config.output_path(".qc_report.txt").exists());
    }

    #[test]
    pub fn test_alignment_index_paths() {
        let bam = PipelineConfig::new("data/NA06994.bam", "t.bed", "ref.fa", "results");
        let cram = PipelineConfig::new("data/NA06994.cram", "t.bed", "ref.fa", "results");
        let sam = PipelineConfig::new("data/NA06994.sam", "t.bed", "ref.fa", "results");

        assert_eq!(
            alignment_index(&bam),
            Some(PathBuf::from("data/NA06994.bam.bai"))
        );
        assert_eq!(
            alignment_index(&cram),
            Some(PathBuf::from("data/NA06994.cram.crai"))
        );
        assert_eq!(alignment_index(&sam), None);
    }
}
