//! Cooperative cancellation flag shared between a build and its caller

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot cancellation signal
///
/// Clones share the same flag. Cancelling is idempotent and the flag is
/// never reset, so one token belongs to exactly one build.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    ///
    /// Returns `true` only for the call that actually set the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
