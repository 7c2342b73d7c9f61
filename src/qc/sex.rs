//! Genetic sex inferred from the ratio of chrY to chrX depth.
//!
//! Each sex chromosome gets its own mosdepth run over a single interval
//! spanning the whole chromosome, so the depths are not diluted by the
//! autosomal targets. The ratio is then bucketed:
//!
//! | chrY / chrX       | call          |
//! |-------------------|---------------|
//! | `< 0.1`           | Female        |
//! | `0.3 ..= 0.7`     | Male          |
//! | anything else     | Indeterminate |
//!
//! The gaps map to Indeterminate rather than a guess: they are where
//! mosaicism, aneuploidy and low coverage land.

use std::fmt;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::errors::QcError;
use crate::errors::Stage;
use crate::errors::StageError;
use crate::qc::metrics;
use crate::tools::mosdepth;
use crate::tools::mosdepth::Mosdepth;
use crate::tools::ToolRunner;
use crate::utils::display::DepthFormat;
use crate::utils::display::FractionFormat;
use crate::utils::genome::SexChromosome;

/// Ratios strictly below this are called Female.
pub const FEMALE_MAX_RATIO: f64 = 0.1;

/// Lower bound (inclusive) of the Male range.
pub const MALE_MIN_RATIO: f64 = 0.3;

/// Upper bound (inclusive) of the Male range.
pub const MALE_MAX_RATIO: f64 = 0.7;

/// The inferred genetic sex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SexCall {
    /// XX.
    Female,

    /// XY.
    Male,

    /// Ambiguous ratio or unusable data.
    Indeterminate,
}

impl fmt::Display for SexCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Female => write!(f, "Female (XX)"),
            Self::Male => write!(f, "Male (XY)"),
            Self::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// chrY depth over chrX depth, or 0 when there is no chrX depth to divide by.
pub fn depth_ratio(depth_x: f64, depth_y: f64) -> f64 {
    if depth_x == 0.0 {
        0.0
    } else {
        depth_y / depth_x
    }
}

/// Buckets a chrY/chrX depth ratio.
pub fn classify_ratio(ratio: f64) -> SexCall {
    if ratio < FEMALE_MAX_RATIO {
        SexCall::Female
    } else if (MALE_MIN_RATIO..=MALE_MAX_RATIO).contains(&ratio) {
        SexCall::Male
    } else {
        SexCall::Indeterminate
    }
}

/// Calls sex from the two depths. Without chrX depth the ratio is 0, which
/// would read as Female; no chrX coverage means the data is unusable, so
/// that case is Indeterminate instead.
pub fn infer_sex(depth_x: f64, depth_y: f64) -> SexCall {
    if !(depth_x.is_finite() && depth_x > 0.0) {
        return SexCall::Indeterminate;
    }

    classify_ratio(depth_ratio(depth_x, depth_y))
}

/// The outcome of the sex-inference stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SexInference {
    /// Mean depth over chrX.
    pub depth_x: f64,

    /// Mean depth over chrY.
    pub depth_y: f64,

    /// chrY / chrX (0 when chrX has no depth).
    pub ratio: f64,

    /// The call.
    pub call: SexCall,
}

impl SexInference {
    /// Derives the ratio and call from the two depths.
    pub fn from_depths(depth_x: f64, depth_y: f64) -> Self {
        SexInference {
            depth_x,
            depth_y,
            ratio: depth_ratio(depth_x, depth_y),
            call: infer_sex(depth_x, depth_y),
        }
    }
}

/// Measures chrX and chrY depth and calls sex.
pub struct SexInferenceStage<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SexInferenceStage<'a> {
    /// Creates a new [`SexInferenceStage`].
    pub fn new(config: &'a PipelineConfig) -> Self {
        SexInferenceStage { config }
    }

    /// Runs the stage. Either mosdepth run failing is fatal.
    pub fn run<R>(&self, runner: &R) -> Result<SexInference, StageError>
    where
        R: ToolRunner + ?Sized,
    {
        info!("Inferring genetic sex.");

        let depth_x = self.chromosome_depth(SexChromosome::X, runner)?;
        let depth_y = self.chromosome_depth(SexChromosome::Y, runner)?;
        let result = SexInference::from_depths(depth_x, depth_y);

        if depth_x == 0.0 {
            warn!("  [*] No coverage on chrX: not enough data to infer sex.");
        }

        info!("  [*] chrX mean depth: {}", DepthFormat(result.depth_x));
        info!("  [*] chrY mean depth: {}", DepthFormat(result.depth_y));
        info!("  [*] chrY/chrX ratio: {}", FractionFormat(result.ratio));
        info!("  [*] Inferred sex: {}", result.call);

        Ok(result)
    }

    fn chromosome_depth<R>(&self, chromosome: SexChromosome, runner: &R) -> Result<f64, StageError>
    where
        R: ToolRunner + ?Sized,
    {
        let fail = |e| StageError::new(Stage::SexInference, e);
        let config = self.config;

        let suffix = format!(".{}", chromosome.name());
        let regions = config.output_path(&format!("{}.bed", suffix));
        chromosome
            .region_set()
            .write(&regions)
            .map_err(|e| fail(QcError::io(format!("writing {}", regions.display()), e)))?;

        let prefix = config.output_path(&suffix);
        Mosdepth {
            program: &config.tools.mosdepth,
            reference_fasta: &config.reference_fasta,
            regions: &regions,
            thresholds: None,
            threads: config.threads,
            prefix: &prefix,
            alignment: &config.alignment,
        }
        .invocation()
        .run(runner)
        .map_err(fail)?;

        let summary = mosdepth::summary_path(&prefix);
        metrics::read_mean_depth(&summary).map_err(|source| {
            fail(QcError::MalformedOutput {
                path: summary.clone(),
                source,
            })
        })
    }
}
