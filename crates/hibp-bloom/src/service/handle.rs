//! Handle to a build running on Tokio's blocking pool

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::domain::{CancellationToken, ProgressUpdate};
use crate::error::BuildError;
use crate::ports::BuildOutcome;

/// A running build
///
/// Progress updates arrive in order on an unbounded channel. Dropping the
/// handle before [`wait`](Self::wait) returns requests cancellation, so an
/// abandoned build never writes its output.
pub struct BuildHandle {
    progress: mpsc::UnboundedReceiver<ProgressUpdate>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<BuildOutcome, BuildError>>>,
}

impl BuildHandle {
    pub(crate) fn new(
        progress: mpsc::UnboundedReceiver<ProgressUpdate>,
        cancel: CancellationToken,
        task: JoinHandle<Result<BuildOutcome, BuildError>>,
    ) -> Self {
        Self {
            progress,
            cancel,
            task: Some(task),
        }
    }

    /// Request cancellation; the build stops at its next check
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            info!("build cancellation requested");
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress update, or `None` once the build has finished and
    /// every update has been received
    pub async fn next_progress(&mut self) -> Option<ProgressUpdate> {
        self.progress.recv().await
    }

    /// Next already-delivered progress update, without waiting
    pub fn try_next_progress(&mut self) -> Option<ProgressUpdate> {
        self.progress.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the build to finish
    pub async fn wait(mut self) -> Result<BuildOutcome, BuildError> {
        let task = match self.task.as_mut() {
            Some(task) => task,
            None => return Err(BuildError::TaskFailed("build already awaited".to_string())),
        };
        let joined = task.await;
        self.task = None;
        joined.map_err(|e| BuildError::TaskFailed(e.to_string()))?
    }
}

impl Drop for BuildHandle {
    fn drop(&mut self) {
        if self.task.is_some() && self.cancel.cancel() {
            info!("build handle dropped, canceling build");
        }
    }
}
