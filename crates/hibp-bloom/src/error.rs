//! Error types for the filter builder

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::BuildStage;

/// Errors raised by the Bloom filter engine itself
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid false positive rate: {fpr} (must be strictly between 0 and 1)")]
    InvalidFpr { fpr: f64 },

    #[error("Filter of {size_bits} bits does not fit in memory on this platform")]
    FilterTooLarge { size_bits: u64 },

    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),
}

/// Errors from reading or writing a persisted filter
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt filter file {}: {reason}", .path.display())]
    CorruptFile { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Errors that abort a filter build
///
/// Cancellation is not an error; see [`crate::ports::BuildOutcome::Canceled`].
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Input file not found: {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("No output file specified")]
    OutputNotSpecified,

    #[error("A build is already running on this builder")]
    AlreadyRunning,

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(#[source] FilterError),

    #[error("Malformed record at line {line}: {length} characters, expected at least {expected}")]
    MalformedRecord {
        line: u64,
        length: usize,
        expected: usize,
    },

    #[error("I/O error while {stage} {}: {source}", .path.display())]
    Io {
        stage: BuildStage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Filter file error: {0}")]
    Codec(CodecError),

    #[error("Build task failed: {0}")]
    TaskFailed(String),
}

impl BuildError {
    /// Stage the build was in when the error occurred, if it got that far
    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            BuildError::InputNotFound { .. }
            | BuildError::OutputNotSpecified
            | BuildError::AlreadyRunning
            | BuildError::InvalidConfig(_) => None,
            BuildError::MalformedRecord { .. } => Some(BuildStage::Inserting),
            BuildError::Io { stage, .. } => Some(*stage),
            BuildError::Filter(_) => Some(BuildStage::Sizing),
            BuildError::Codec(_) => Some(BuildStage::Persisting),
            BuildError::TaskFailed(_) => None,
        }
    }
}

impl From<CodecError> for BuildError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io { path, source } => BuildError::Io {
                stage: BuildStage::Persisting,
                path,
                source,
            },
            other => BuildError::Codec(other),
        }
    }
}
