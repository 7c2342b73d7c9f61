//! Sample contamination (FREEMIX) estimated with VerifyBamID2.
//!
//! The stage moves through these states:
//!
//! ```text
//! NotStarted --(required resource missing)--> Skipped           (NaN)
//! NotStarted --> Preparing --(samtools fails)--> Failed         (NaN)
//! Preparing --> PrimaryAttempt --(ok)--> Done(value)
//! PrimaryAttempt --(invocation fails)--> FallbackAttempt --(ok)--> Done(value)
//! FallbackAttempt --(invocation fails)--> Failed                (NaN)
//! ```
//!
//! Only a failed primary *invocation* leads to the fallback. Missing
//! resources and unreadable results do not. Every failure is returned as a
//! [`StageError`] that the orchestrator absorbs into a NaN estimate.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::errors::QcError;
use crate::errors::Stage;
use crate::errors::StageError;
use crate::qc::metrics;
use crate::resources::ResourceKind;
use crate::tools::samtools;
use crate::tools::verifybamid;
use crate::tools::verifybamid::VerifyBamId;
use crate::tools::ToolRunner;
use crate::utils::display::FractionFormat;
use crate::utils::pathbuf::AppendSuffix;

/// How the stage finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ContaminationOutcome {
    /// The primary (`--SVDPrefix`) invocation produced the estimate.
    Primary,

    /// The fallback (individual resource paths) invocation produced it.
    Fallback,

    /// The resource bundle was incomplete; nothing was run.
    Skipped,

    /// Tools ran but no estimate could be obtained.
    Failed,
}

impl std::fmt::Display for ContaminationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "estimated (SVD prefix)"),
            Self::Fallback => write!(f, "estimated (individual resource files)"),
            Self::Skipped => write!(f, "skipped (resources missing)"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The contamination estimate. `freemix` is NaN when it could not be
/// computed.
#[derive(Clone, Debug, Serialize)]
pub struct ContaminationEstimate {
    /// Estimated fraction of reads from a foreign sample.
    pub freemix: f64,

    /// How the stage finished.
    pub outcome: ContaminationOutcome,
}

impl ContaminationEstimate {
    /// The estimate recorded in place of a failed stage.
    pub fn from_failure(error: &StageError) -> Self {
        let outcome = match error.error {
            QcError::ResourceMissing { .. } => ContaminationOutcome::Skipped,
            _ => ContaminationOutcome::Failed,
        };

        ContaminationEstimate {
            freemix: f64::NAN,
            outcome,
        }
    }

    /// Whether FREEMIX exceeds `threshold`, or `None` when it is unknown.
    pub fn exceeds(&self, threshold: f64) -> Option<bool> {
        if self.freemix.is_nan() {
            None
        } else {
            Some(self.freemix > threshold)
        }
    }
}

/// Runs VerifyBamID2 with the configured resource bundle.
pub struct ContaminationStage<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ContaminationStage<'a> {
    /// Creates a new [`ContaminationStage`].
    pub fn new(config: &'a PipelineConfig) -> Self {
        ContaminationStage { config }
    }

    /// Runs the stage.
    pub fn run<R>(&self, runner: &R) -> Result<ContaminationEstimate, StageError>
    where
        R: ToolRunner + ?Sized,
    {
        self.estimate(runner)
            .map_err(|e| StageError::new(Stage::Contamination, e))
    }

    fn estimate<R>(&self, runner: &R) -> Result<ContaminationEstimate, QcError>
    where
        R: ToolRunner + ?Sized,
    {
        let config = self.config;
        let bundle = config.resource_bundle();
        info!(
            "Estimating contamination with the {} resource bundle.",
            bundle.resolution()
        );

        //===============//
        // Preconditions //
        //===============//

        let missing = bundle.missing_required();
        if !missing.is_empty() {
            for path in &missing {
                warn!("  [*] Missing resource file: {}", path.display());
            }
            warn!(
                "  [*] Provision the {} VerifyBamID2 resource bundle into {} \
                (`wesqc list resources` shows the file names).",
                bundle.resolution(),
                bundle.directory().display()
            );

            return Err(QcError::ResourceMissing {
                resolution: bundle.resolution(),
                missing,
            });
        }

        if !bundle.path(ResourceKind::V).exists() {
            warn!("  [*] The V matrix is missing; only the fallback invocation can succeed.");
        }

        let bam = self.prepare_alignment(runner)?;

        //=============//
        // VerifyBamID //
        //=============//

        let output = config.output_path(".verifybamid2");
        let self_sm = verifybamid::self_sm_path(&output);
        remove_stale(&self_sm)?;

        let verifybamid = VerifyBamId {
            program: &config.tools.verifybamid2,
            bundle: &bundle,
            reference_fasta: &config.reference_fasta,
            alignment: &bam,
            output: &output,
            threads: config.threads,
            epsilon: config.epsilon,
        };

        let outcome = match verifybamid.primary().run(runner) {
            Ok(_) => ContaminationOutcome::Primary,
            Err(e) => {
                warn!("  [*] Primary invocation failed: {}", e);
                info!("  [*] Retrying with the individual resource files.");
                verifybamid.fallback().run(runner)?;
                ContaminationOutcome::Fallback
            }
        };

        let freemix = metrics::parse_contamination_result(&self_sm).map_err(|source| {
            QcError::MalformedOutput {
                path: self_sm.clone(),
                source,
            }
        })?;

        if freemix.is_nan() {
            warn!(
                "  [*] VerifyBamID2 exited cleanly but left no FREEMIX in {}.",
                self_sm.display()
            );
            return Ok(ContaminationEstimate {
                freemix,
                outcome: ContaminationOutcome::Failed,
            });
        }

        info!("  [*] FREEMIX: {}", FractionFormat(freemix));
        Ok(ContaminationEstimate { freemix, outcome })
    }

    /// VerifyBamID2 reads BAM, so a CRAM input is converted (and indexed)
    /// into the results directory first. Existing outputs are reused.
    ///
    /// samtools writes to `<sample>.bam.tmp`, which is renamed only once the
    /// conversion succeeds. A failed step leaves nothing behind for the next
    /// run to mistake for finished output.
    fn prepare_alignment<R>(&self, runner: &R) -> Result<PathBuf, QcError>
    where
        R: ToolRunner + ?Sized,
    {
        let config = self.config;
        let alignment = &config.alignment;

        let is_cram = alignment
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("cram"));

        if !is_cram || !config.convert_cram {
            return Ok(alignment.clone());
        }

        let bam = config.output_path(".bam");
        if bam.exists() {
            info!("  [*] Reusing converted BAM at {}.", bam.display());
        } else {
            info!("  [*] Converting CRAM to BAM.");
            let partial = bam.append_suffix(".tmp");
            let converted = samtools::cram_to_bam(
                &config.tools.samtools,
                &config.reference_fasta,
                alignment,
                &partial,
            )
            .run(runner);

            if let Err(err) = converted {
                discard(&partial);
                return Err(err);
            }

            fs::rename(&partial, &bam).map_err(|e| {
                QcError::io(format!("moving {} into place", partial.display()), e)
            })?;
        }

        let bai = bam.append_suffix(".bai");
        if !bai.exists() {
            info!("  [*] Indexing BAM.");
            if let Err(err) = samtools::index(&config.tools.samtools, &bam).run(runner) {
                discard(&bai);
                return Err(err);
            }
        }

        Ok(bam)
    }
}

/// Best-effort removal of a half-written output.
fn discard(path: &Path) {
    if let Err(e) = remove_stale(path) {
        warn!("  [*] Could not clean up: {}", e);
    }
}

fn remove_stale(path: &Path) -> Result<(), QcError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(QcError::io(format!("removing {}", path.display()), e)),
    }
}
