//! Counters for filter builds
//!
//! Updated from the build thread and readable from any other thread while
//! a build runs. Insertion counts are added in batches at each progress
//! tick, not per record.
//!
//! ```ignore
//! let service = FilterBuilderService::new(Arc::new(FilterFileStore));
//! let metrics = service.metrics();
//! // ... build on another thread ...
//! println!("{} keys so far", metrics.snapshot().keys_inserted);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for filter builds
#[derive(Debug, Default)]
pub struct BuildMetrics {
    /// Builds started (passed validation)
    pub builds_started: AtomicU64,
    /// Builds that wrote a filter file
    pub builds_completed: AtomicU64,
    /// Builds that observed cancellation
    pub builds_canceled: AtomicU64,
    /// Builds that returned an error
    pub builds_failed: AtomicU64,
    /// Records counted by the most recent counting pass
    pub lines_counted: AtomicU64,
    /// Keys inserted, across all builds
    pub keys_inserted: AtomicU64,
    /// Progress reports emitted
    pub progress_reports: AtomicU64,
    /// Cancellation checks made during insertion
    pub cancel_checks: AtomicU64,
    /// Filter file bytes written
    pub bytes_written: AtomicU64,
}

impl BuildMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_build_started(&self) {
        self.builds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build_completed(&self, bytes_written: u64) {
        self.builds_completed.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes_written, Ordering::Relaxed);
    }

    pub fn record_build_canceled(&self) {
        self.builds_canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lines_counted(&self, lines: u64) {
        self.lines_counted.store(lines, Ordering::Relaxed);
    }

    /// Record a batch of insertions
    pub fn record_keys_inserted(&self, count: u64) {
        self.keys_inserted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_progress_report(&self) {
        self.progress_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancel_check(&self) {
        self.cancel_checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            builds_started: self.builds_started.load(Ordering::Relaxed),
            builds_completed: self.builds_completed.load(Ordering::Relaxed),
            builds_canceled: self.builds_canceled.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            lines_counted: self.lines_counted.load(Ordering::Relaxed),
            keys_inserted: self.keys_inserted.load(Ordering::Relaxed),
            progress_reports: self.progress_reports.load(Ordering::Relaxed),
            cancel_checks: self.cancel_checks.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub builds_started: u64,
    pub builds_completed: u64,
    pub builds_canceled: u64,
    pub builds_failed: u64,
    pub lines_counted: u64,
    pub keys_inserted: u64,
    pub progress_reports: u64,
    pub cancel_checks: u64,
    pub bytes_written: u64,
}
