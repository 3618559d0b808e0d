//! Inbound Ports (Driving Ports)
//!
//! The API a caller (CLI, host application) uses to build filters.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{BuildStage, CancellationToken};
use crate::error::BuildError;
use crate::ports::outbound::ProgressSink;

/// A request to build one filter file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildRequest {
    /// Newline-delimited credential hashes
    pub input_path: PathBuf,
    /// Destination filter file; an empty path means "not specified"
    pub output_path: PathBuf,
}

impl BuildRequest {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    /// Check preconditions before any streaming starts
    ///
    /// Output first: a missing destination is reported even when the input
    /// is also missing.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(BuildError::OutputNotSpecified);
        }
        if !self.input_path.is_file() {
            return Err(BuildError::InputNotFound {
                path: self.input_path.clone(),
            });
        }
        Ok(())
    }
}

/// Summary of a completed build
#[derive(Clone, Debug, PartialEq)]
pub struct BuildReport {
    /// Records counted in the first pass (N)
    pub records: u64,
    /// Records inserted in the second pass
    pub inserted: u64,
    /// Filter size in bits (M)
    pub size_bits: u64,
    /// Number of hash functions (K)
    pub hash_count: u32,
    pub bits_set: u64,
    /// Estimated false positive rate at the final load
    pub estimated_fpr: f64,
    /// Size of the filter file
    pub bytes_written: u64,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Terminal result of a build that did not fail
#[derive(Clone, Debug, PartialEq)]
pub enum BuildOutcome {
    /// The filter file was written.
    Completed(BuildReport),
    /// Cancellation was observed in `stage`; nothing was written.
    Canceled { stage: BuildStage },
}

impl BuildOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, BuildOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&BuildReport> {
        match self {
            BuildOutcome::Completed(report) => Some(report),
            BuildOutcome::Canceled { .. } => None,
        }
    }
}

/// Primary filter build API (Driving Port)
pub trait FilterBuildApi: Send + Sync {
    /// Run one build to completion on the calling thread
    ///
    /// Blocks for the whole build. Progress goes to `progress`; `cancel` is
    /// polled at the counting and insertion check points.
    fn build(
        &self,
        request: &BuildRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome, BuildError>;
}
