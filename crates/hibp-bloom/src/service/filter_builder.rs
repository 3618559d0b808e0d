//! Filter Builder Service
//!
//! Orchestrates one build: count records, size the filter, insert every
//! key, persist. Runs synchronously on the calling thread; [`spawn`] moves
//! it onto Tokio's blocking pool.
//!
//! [`spawn`]: FilterBuilderService::spawn

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};

use super::handle::BuildHandle;
use crate::adapters::line_source::{count_lines, RecordReader};
use crate::domain::progress::{self, estimate_remaining};
use crate::domain::record::{extract_key, record_length};
use crate::domain::{BloomFilter, BuildConfig, BuildStage, CancellationToken, ProgressUpdate};
use crate::error::BuildError;
use crate::metrics::BuildMetrics;
use crate::ports::{
    BuildOutcome, BuildReport, BuildRequest, FilterBuildApi, FilterStore, ProgressSink,
};

/// Filter Builder Service implementation
///
/// Implements the `FilterBuildApi` port using an injected filter store.
/// Runs one build at a time; a request made while another build is in
/// flight fails with `AlreadyRunning`.
pub struct FilterBuilderService<S: FilterStore> {
    /// Destination for finished filters (driven port)
    store: Arc<S>,
    config: BuildConfig,
    metrics: Arc<BuildMetrics>,
    in_flight: AtomicBool,
}

impl<S: FilterStore> FilterBuilderService<S> {
    /// Create a new service with the default configuration
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, BuildConfig::default())
    }

    /// Create with custom configuration
    ///
    /// The configuration is validated when a build starts.
    pub fn with_config(store: Arc<S>, config: BuildConfig) -> Self {
        Self {
            store,
            config,
            metrics: Arc::new(BuildMetrics::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Shared counters, readable while a build is running
    pub fn metrics(&self) -> Arc<BuildMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn run(
        &self,
        request: &BuildRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome, BuildError> {
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        request.validate()?;
        let input = request.input_path.as_path();
        let output = request.output_path.as_path();

        let span = info_span!(
            "filter_build",
            input = %input.display(),
            output = %output.display()
        );
        let _enter = span.enter();

        self.metrics.record_build_started();
        let mut run = BuildRun {
            stage: BuildStage::Idle,
            percent: 0,
            started: Instant::now(),
            fallback_total: Duration::from_secs(self.config.estimated_total_minutes * 60),
            progress,
            metrics: &self.metrics,
        };

        run.enter(BuildStage::Counting);
        run.report(progress::COUNTING_STARTED);
        let counted = count_lines(input, self.config.count_check_interval, cancel).map_err(
            |source| BuildError::Io {
                stage: BuildStage::Counting,
                path: input.to_path_buf(),
                source,
            },
        )?;
        self.metrics.record_lines_counted(counted.lines);
        if counted.canceled || cancel.is_cancelled() {
            return Ok(run.cancel());
        }
        info!(
            records = counted.lines,
            elapsed_ms = run.started.elapsed().as_millis() as u64,
            "counted input records"
        );

        run.enter(BuildStage::Sizing);
        let mut filter = BloomFilter::new_with_fpr(counted.lines, self.config.target_fpr)?
            .with_key_length(self.config.key_length);
        info!(
            size_bits = filter.size_bits(),
            hash_count = filter.hash_count(),
            size_bytes = filter.as_bytes().len() as u64,
            target_fpr = self.config.target_fpr,
            "sized filter"
        );
        run.report(progress::SIZING_DONE);

        run.enter(BuildStage::Inserting);
        let inserted =
            match self.insert_records(input, &mut filter, counted.lines, &mut run, cancel)? {
                Some(inserted) => inserted,
                None => return Ok(run.cancel()),
            };
        if inserted != counted.lines {
            warn!(
                counted = counted.lines,
                inserted, "input changed between passes"
            );
        }
        info!(inserted, bits_set = filter.bits_set(), "inserted all records");

        run.enter(BuildStage::Persisting);
        let bytes_written = self.store.write(output, &filter)?;
        self.metrics.record_build_completed(bytes_written);
        run.report(progress::COMPLETE);
        run.enter(BuildStage::Done);

        let report = BuildReport {
            records: counted.lines,
            inserted,
            size_bits: filter.size_bits(),
            hash_count: filter.hash_count(),
            bits_set: filter.bits_set(),
            estimated_fpr: filter.false_positive_rate(),
            bytes_written,
            output_path: output.to_path_buf(),
            elapsed: run.started.elapsed(),
        };
        info!(
            bytes_written,
            estimated_fpr = report.estimated_fpr,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "filter build complete"
        );
        Ok(BuildOutcome::Completed(report))
    }

    /// Second pass: insert the key of every record
    ///
    /// Returns the number of records inserted, or `None` if cancellation
    /// was observed.
    fn insert_records(
        &self,
        input: &Path,
        filter: &mut BloomFilter,
        total: u64,
        run: &mut BuildRun<'_>,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, BuildError> {
        let io_err = |source: io::Error| BuildError::Io {
            stage: BuildStage::Inserting,
            path: input.to_path_buf(),
            source,
        };
        let key_length = self.config.key_length;
        let tick = progress::progress_tick(total);

        let mut reader = RecordReader::open(input).map_err(io_err)?;
        let mut processed = 0u64;
        let mut unrecorded = 0u64;

        while let Some(record) = reader.next_record().map_err(io_err)? {
            let key = extract_key(record, key_length).ok_or_else(|| {
                BuildError::MalformedRecord {
                    line: processed + 1,
                    length: record_length(record),
                    expected: key_length,
                }
            })?;
            filter.insert(key);
            processed += 1;
            unrecorded += 1;

            if processed % tick == 0 {
                self.metrics.record_keys_inserted(unrecorded);
                unrecorded = 0;
                run.report(progress::insertion_percent(processed, total));

                self.metrics.record_cancel_check();
                if cancel.is_cancelled() {
                    return Ok(None);
                }
            }
        }
        self.metrics.record_keys_inserted(unrecorded);

        // Last chance before anything touches the output
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(processed))
    }
}

impl<S: FilterStore + 'static> FilterBuilderService<S> {
    /// Start a build on Tokio's blocking thread pool
    ///
    /// Must be called from within a Tokio runtime. Preconditions
    /// (`OutputNotSpecified`, `InputNotFound`, invalid configuration) are
    /// checked here, before any background work starts.
    pub fn spawn(self: &Arc<Self>, request: BuildRequest) -> Result<BuildHandle, BuildError> {
        self.spawn_with_token(request, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), observing a caller-supplied token
    pub fn spawn_with_token(
        self: &Arc<Self>,
        request: BuildRequest,
        cancel: CancellationToken,
    ) -> Result<BuildHandle, BuildError> {
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        request.validate()?;
        if self.is_running() {
            return Err(BuildError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let service = Arc::clone(self);
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || service.build(&request, &tx, &token));

        Ok(BuildHandle::new(rx, cancel, task))
    }
}

impl<S: FilterStore> FilterBuildApi for FilterBuilderService<S> {
    fn build(
        &self,
        request: &BuildRequest,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome, BuildError> {
        let result = match InFlight::acquire(&self.in_flight) {
            Some(_guard) => self.run(request, progress, cancel),
            None => Err(BuildError::AlreadyRunning),
        };
        if result.is_err() {
            self.metrics.record_build_failed();
        }
        result
    }
}

/// Holds the service's in-flight flag for the duration of one build
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stage and progress bookkeeping for one build
struct BuildRun<'a> {
    stage: BuildStage,
    /// Last percent reported
    percent: u8,
    started: Instant,
    fallback_total: Duration,
    progress: &'a dyn ProgressSink,
    metrics: &'a BuildMetrics,
}

impl BuildRun<'_> {
    fn enter(&mut self, next: BuildStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }

    /// Report `percent` if it moves progress forward
    fn report(&mut self, percent: u8) {
        if percent <= self.percent {
            return;
        }
        self.percent = percent;
        let remaining = estimate_remaining(percent, self.started.elapsed(), self.fallback_total);
        debug!(percent, stage = %self.stage, "progress");

        self.metrics.record_progress_report();
        self.progress.report(ProgressUpdate {
            percent,
            stage: self.stage,
            remaining,
        });
    }

    fn cancel(mut self) -> BuildOutcome {
        debug_assert!(self.stage.is_cancelable(), "cannot cancel while {}", self.stage);
        let stage = self.stage;
        warn!(%stage, percent = self.percent, "build canceled, no filter written");
        self.enter(BuildStage::Canceled);
        self.metrics.record_build_canceled();
        BuildOutcome::Canceled { stage }
    }
}
