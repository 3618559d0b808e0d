//! # HIBP Bloom
//!
//! Builds a Bloom filter over the credential-hash keys of a breach
//! corpus file (one `<40 hex chars>:<count>` record per line) and writes
//! it to disk as a single self-describing binary file.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O
//!   - `BloomFilter`: Bit array with murmur3 double hashing
//!   - `BuildConfig` / `BuildConfigBuilder`: Validated build settings
//!   - `BuildStage`: Build state machine
//!   - `CancellationToken`: Cooperative cancellation flag
//!   - `progress`: Progress percentages and time estimates
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `FilterBuildApi`: Driving port (inbound API)
//!   - `FilterStore`: Driven port for persisting filters
//!   - `ProgressSink`: Driven port for progress updates
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `FilterBuilderService`: Implements `FilterBuildApi`
//!   - `BuildHandle`: Async handle to a build on the blocking pool
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `FilterFileStore`: Checksummed binary file codec
//!   - `line_source`: Counting and record-reading passes over the input
//!
//! ## Build Stages
//!
//! ```text
//! Idle → Counting → Sizing → Inserting → Persisting → Done
//!           ↓                    ↓
//!        Canceled             Canceled
//! ```
//!
//! Progress is reported as 1 when counting starts, 5 once the filter is
//! sized, 5..=95 during insertion and 100 after the file is written.
//!
//! ## Invariants
//!
//! - No false negatives: every inserted key is reported as present
//! - A canceled or failed build never leaves a file at the output path
//!
//! ## Usage Example
//!
//! ```ignore
//! use hibp_bloom::{BuildRequest, FilterBuilderService, FilterFileStore};
//! use std::sync::Arc;
//!
//! let service = Arc::new(FilterBuilderService::new(Arc::new(FilterFileStore)));
//! let mut handle = service.spawn(BuildRequest::new("pwned.txt", "HIBPBloomFilter.bin"))?;
//!
//! while let Some(update) = handle.next_progress().await {
//!     println!("{}% ({})", update.percent, update.remaining_label());
//! }
//! let outcome = handle.wait().await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{FilterFileStore, FilterHeader};
pub use domain::{
    BloomFilter, BuildConfig, BuildConfigBuilder, BuildStage, CancellationToken, ProgressUpdate,
};
pub use error::{BuildError, CodecError, FilterError};
pub use metrics::{BuildMetrics, MetricsSnapshot};
pub use ports::{
    BuildOutcome, BuildReport, BuildRequest, FilterBuildApi, FilterStore, NoOpProgress,
    ProgressSink,
};
pub use service::{BuildHandle, FilterBuilderService};
