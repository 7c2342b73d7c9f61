//! Aggregation of the stage results into the final report.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::QcError;
use crate::qc::contamination::ContaminationEstimate;
use crate::qc::coverage::CoverageMetrics;
use crate::qc::sex::SexInference;
use crate::resources::Resolution;
use crate::utils::display::DepthFormat;
use crate::utils::display::FractionFormat;
use crate::utils::display::PercentageFormat;

/// Width of the label column in the text report.
const LABEL_WIDTH: usize = 22;

/// Everything the QC run found for one sample.
#[derive(Clone, Debug, Serialize)]
pub struct QcReport {
    /// The sample name.
    pub sample: String,

    /// Target-region coverage.
    pub coverage: CoverageMetrics,

    /// Sex inference.
    pub sex: SexInference,

    /// Contamination estimate.
    pub contamination: ContaminationEstimate,

    /// The resource bundle resolution used for contamination.
    pub resolution: Resolution,

    /// FREEMIX above which contamination is reported.
    pub contamination_threshold: f64,
}

/// The files a report was written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportFiles {
    /// The human-readable report.
    pub text: PathBuf,

    /// The JSON results.
    pub json: PathBuf,
}

impl QcReport {
    /// Creates a new [`QcReport`].
    pub fn new(
        config: &PipelineConfig,
        coverage: CoverageMetrics,
        sex: SexInference,
        contamination: ContaminationEstimate,
    ) -> Self {
        QcReport {
            sample: config.sample.clone(),
            coverage,
            sex,
            contamination,
            resolution: config.resolution,
            contamination_threshold: config.contamination_threshold,
        }
    }

    /// The qualitative reading of the FREEMIX value.
    pub fn contamination_interpretation(&self) -> &'static str {
        match self.contamination.exceeds(self.contamination_threshold) {
            Some(true) => "Possible contamination detected",
            Some(false) => "No clear signs of contamination",
            None => "Unknown (contamination could not be estimated)",
        }
    }

    /// Renders the fixed-layout text report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let title = format!("QC report: {}", self.sample);

        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "=".repeat(title.len()));
        let _ = writeln!(out);

        let _ = writeln!(out, "Coverage (target regions)");
        line(&mut out, "Mean depth", DepthFormat(self.coverage.mean_depth));
        line(&mut out, "Bases >= 10x", PercentageFormat(self.coverage.pct_at_10x));
        line(&mut out, "Bases >= 30x", PercentageFormat(self.coverage.pct_at_30x));
        let _ = writeln!(out);

        let _ = writeln!(out, "Genetic sex");
        line(&mut out, "chrX mean depth", DepthFormat(self.sex.depth_x));
        line(&mut out, "chrY mean depth", DepthFormat(self.sex.depth_y));
        line(&mut out, "chrY/chrX ratio", FractionFormat(self.sex.ratio));
        line(&mut out, "Inferred sex", self.sex.call);
        let _ = writeln!(out);

        let _ = writeln!(out, "Contamination (VerifyBamID2, {} markers)", self.resolution);
        line(&mut out, "FREEMIX", FractionFormat(self.contamination.freemix));
        line(&mut out, "Status", self.contamination.outcome);
        line(
            &mut out,
            "Interpretation",
            format!(
                "{} (threshold {})",
                self.contamination_interpretation(),
                self.contamination_threshold
            ),
        );

        out
    }

    /// Writes `<sample>.qc_report.txt` and `<sample>.results.json` into the
    /// results directory.
    pub fn write(&self, config: &PipelineConfig) -> Result<ReportFiles, QcError> {
        let files = ReportFiles {
            text: config.output_path(".qc_report.txt"),
            json: config.output_path(".results.json"),
        };

        fs::write(&files.text, self.render())
            .map_err(|e| QcError::io(format!("writing {}", files.text.display()), e))?;

        let json = serde_json::to_string_pretty(&self)
            .map_err(|e| QcError::io("serializing results", e.into()))?;
        fs::write(&files.json, json)
            .map_err(|e| QcError::io(format!("writing {}", files.json.display()), e))?;

        info!("Report written to {}.", files.text.display());
        Ok(files)
    }
}

fn line<V: std::fmt::Display>(out: &mut String, label: &str, value: V) {
    let _ = writeln!(
        out,
        "  {:<width$}{}",
        format!("{}:", label),
        value,
        width = LABEL_WIDTH
    );
}
