//! Error kinds shared by the QC stages, and the policy deciding which of
//! them end a run.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

use crate::qc::metrics::MetricsError;
use crate::resources::Resolution;

//=============//
// Error kinds //
//=============//

/// A failure raised while running the QC pipeline.
#[derive(Debug, Error)]
pub enum QcError {
    /// A required input file does not exist.
    #[error("required {description} is missing: {}", path.display())]
    PreconditionMissing {
        /// What the file is (e.g. "alignment file").
        description: &'static str,

        /// Where the file was expected.
        path: PathBuf,
    },

    /// An external tool could not be started or exited unsuccessfully.
    #[error("`{tool}` failed ({status}): {diagnostics}")]
    ExternalToolFailure {
        /// The tool that failed.
        tool: String,

        /// The exit status, or a note that the process never started.
        status: String,

        /// The tail of the tool's stderr (or the spawn error).
        diagnostics: String,
    },

    /// A tool output could not be parsed.
    #[error("malformed output in {}: {source}", path.display())]
    MalformedOutput {
        /// The output file being parsed.
        path: PathBuf,

        /// The underlying parse failure.
        source: MetricsError,
    },

    /// An input file exists but its contents are unusable.
    #[error("invalid input in {}: {source}", path.display())]
    InvalidInput {
        /// The offending input file.
        path: PathBuf,

        /// The underlying parse failure.
        source: MetricsError,
    },

    /// Files of the contamination resource bundle are missing.
    #[error(
        "the {resolution} VerifyBamID2 resource bundle is incomplete ({} file(s) missing)",
        missing.len()
    )]
    ResourceMissing {
        /// The selected bundle resolution.
        resolution: Resolution,

        /// Every required file that was not found.
        missing: Vec<PathBuf>,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,

        /// The underlying I/O error.
        source: io::Error,
    },
}

impl QcError {
    /// Wraps an [`io::Error`] with a description of what was being attempted.
    pub fn io<C: Into<String>>(context: C, source: io::Error) -> Self {
        QcError::Io {
            context: context.into(),
            source,
        }
    }
}

//========//
// Stages //
//========//

/// The pipeline stage a failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Input existence checks before any tool runs.
    Preconditions,

    /// Depth statistics over the target regions.
    Coverage,

    /// chrX/chrY depth ratio.
    SexInference,

    /// VerifyBamID2 FREEMIX estimate.
    Contamination,

    /// Writing the report files.
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preconditions => write!(f, "preconditions"),
            Self::Coverage => write!(f, "coverage"),
            Self::SexInference => write!(f, "sex inference"),
            Self::Contamination => write!(f, "contamination"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// What the orchestrator does with a failed stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Stop the run and surface the error.
    Abort,

    /// Record the value as unknown and keep going.
    Absorb,
}

/// A [`QcError`] tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    /// The stage that failed.
    pub stage: Stage,

    /// The failure itself. Already part of the message, so not a `source`.
    pub error: QcError,
}

impl StageError {
    /// Creates a new [`StageError`].
    pub fn new(stage: Stage, error: QcError) -> Self {
        StageError { stage, error }
    }

    /// Decides whether this failure ends the run. Contamination failures of
    /// every kind are absorbed so that the report is always produced; the
    /// report cannot meaningfully omit anything else.
    pub fn disposition(&self) -> Disposition {
        match (self.stage, &self.error) {
            (Stage::Contamination, _) => Disposition::Absorb,
            (_, QcError::ResourceMissing { .. }) => Disposition::Absorb,
            _ => Disposition::Abort,
        }
    }
}

//============//
// Exit codes //
//============//

/// Process exit codes for fatal failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// A required input file was not found.
    PreconditionMissing = 2,

    /// An external tool failed.
    ExternalToolFailure = 3,

    /// A tool output or an input file could not be parsed.
    InvalidData = 4,

    /// Anything else (I/O, argument handling).
    Other = 5,
}

impl From<&QcError> for ExitCode {
    fn from(error: &QcError) -> Self {
        match error {
            QcError::PreconditionMissing { .. } | QcError::ResourceMissing { .. } => {
                ExitCode::PreconditionMissing
            }
            QcError::ExternalToolFailure { .. } => ExitCode::ExternalToolFailure,
            QcError::MalformedOutput { .. } | QcError::InvalidInput { .. } => {
                ExitCode::InvalidData
            }
            QcError::Io { .. } => ExitCode::Other,
        }
    }
}

impl From<&anyhow::Error> for ExitCode {
    fn from(error: &anyhow::Error) -> Self {
        if let Some(stage_error) = error.downcast_ref::<StageError>() {
            return ExitCode::from(&stage_error.error);
        }

        match error.downcast_ref::<QcError>() {
            Some(e) => ExitCode::from(e),
            None => ExitCode::Other,
        }
    }
}

/// Logs the message and terminates the process with the given code.
pub fn exit<M>(message: M, code: ExitCode) -> !
where
    M: fmt::Display,
{
    error!("{}", message);
    std::process::exit(code as i32);
}
