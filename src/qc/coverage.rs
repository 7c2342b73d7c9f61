//! Depth statistics over the target-capture regions.

use std::path::PathBuf;

use num_format::Locale;
use num_format::ToFormattedString;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::config::DEPTH_THRESHOLDS;
use crate::errors::QcError;
use crate::errors::Stage;
use crate::errors::StageError;
use crate::qc::metrics;
use crate::qc::metrics::MetricsError;
use crate::tools::mosdepth;
use crate::tools::mosdepth::Mosdepth;
use crate::tools::ToolRunner;
use crate::utils::display::DepthFormat;
use crate::utils::display::PercentageFormat;

/// Coverage of the target regions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CoverageMetrics {
    /// Mean depth over the target regions.
    pub mean_depth: f64,

    /// Percent of target bases at or above 10×.
    pub pct_at_10x: f64,

    /// Percent of target bases at or above 30×.
    pub pct_at_30x: f64,

    /// Size of the target footprint in bases.
    pub total_bases: u64,

    /// Thresholds table rows that could not be read. These under-count the
    /// percentages above.
    pub skipped_rows: usize,
}

/// Runs mosdepth over the target regions and summarizes its output.
pub struct CoverageStage<'a> {
    config: &'a PipelineConfig,
}

impl<'a> CoverageStage<'a> {
    /// Creates a new [`CoverageStage`].
    pub fn new(config: &'a PipelineConfig) -> Self {
        CoverageStage { config }
    }

    /// Runs the stage. Every failure is fatal to the run.
    pub fn run<R>(&self, runner: &R) -> Result<CoverageMetrics, StageError>
    where
        R: ToolRunner + ?Sized,
    {
        self.compute(runner)
            .map_err(|e| StageError::new(Stage::Coverage, e))
    }

    fn compute<R>(&self, runner: &R) -> Result<CoverageMetrics, QcError>
    where
        R: ToolRunner + ?Sized,
    {
        let config = self.config;
        info!("Computing coverage over {}.", config.regions.display());

        let total_bases = self.target_bases()?;
        info!(
            "  [*] Target footprint: {} bases.",
            total_bases.to_formatted_string(&Locale::en)
        );

        let prefix = config.output_prefix();
        Mosdepth {
            program: &config.tools.mosdepth,
            reference_fasta: &config.reference_fasta,
            regions: &config.regions,
            thresholds: Some(&DEPTH_THRESHOLDS),
            threads: config.threads,
            prefix: &prefix,
            alignment: &config.alignment,
        }
        .invocation()
        .run(runner)?;

        let summary = mosdepth::summary_path(&prefix);
        let mean_depth = metrics::read_mean_depth(&summary).map_err(malformed(summary))?;

        let thresholds = mosdepth::thresholds_path(&prefix);
        let percentages = metrics::read_threshold_percentages(&thresholds, total_bases)
            .map_err(malformed(thresholds))?;

        if percentages.skipped_rows > 0 {
            warn!(
                "  [*] Skipped {} unreadable thresholds row(s); coverage percentages may be \
                under-counted.",
                percentages.skipped_rows
            );
        }

        let result = CoverageMetrics {
            mean_depth,
            pct_at_10x: percentages.pct_at_10x,
            pct_at_30x: percentages.pct_at_30x,
            total_bases,
            skipped_rows: percentages.skipped_rows,
        };

        info!("  [*] Mean depth: {}", DepthFormat(result.mean_depth));
        info!("  [*] Bases >= 10x: {}", PercentageFormat(result.pct_at_10x));
        info!("  [*] Bases >= 30x: {}", PercentageFormat(result.pct_at_30x));

        Ok(result)
    }

    /// Sums the target footprint, refusing an empty region set so that the
    /// percentages are never divided by zero.
    fn target_bases(&self) -> Result<u64, QcError> {
        let path = &self.config.regions;
        let invalid = |source| QcError::InvalidInput {
            path: path.clone(),
            source,
        };

        let total = crate::formats::open(path)
            .map_err(MetricsError::from)
            .and_then(metrics::sum_region_bases)
            .map_err(invalid)?;

        match total {
            0 => Err(invalid(MetricsError::DivisionByZero)),
            n => Ok(n),
        }
    }
}

fn malformed(path: PathBuf) -> impl FnOnce(MetricsError) -> QcError {
    move |source| QcError::MalformedOutput { path, source }
}
