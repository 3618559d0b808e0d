//! Outbound Ports (Driven Ports)
//!
//! Dependencies the builder needs from its surroundings: somewhere to put
//! the finished filter, and someone to tell about progress.

use std::path::Path;

use tokio::sync::mpsc;

use crate::domain::{BloomFilter, ProgressUpdate};
use crate::error::CodecError;

/// Persistent storage for finished filters (Driven Port)
pub trait FilterStore: Send + Sync {
    /// Write `filter` to `path`, returning the number of bytes written
    ///
    /// Must never leave a partially written file at `path`.
    fn write(&self, path: &Path, filter: &BloomFilter) -> Result<u64, CodecError>;

    /// Read a filter previously written with [`FilterStore::write`]
    fn read(&self, path: &Path) -> Result<BloomFilter, CodecError>;
}

/// Receiver of progress reports (Driven Port)
///
/// Called from the build thread. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Progress sink that discards every report
#[derive(Default)]
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn report(&self, _: ProgressUpdate) {}
}

impl ProgressSink for mpsc::UnboundedSender<ProgressUpdate> {
    fn report(&self, update: ProgressUpdate) {
        // A closed receiver means nobody is watching any more
        let _ = self.send(update);
    }
}
