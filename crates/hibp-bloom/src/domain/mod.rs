//! Domain Layer - Pure business logic
//!
//! This layer contains:
//! - Core Bloom filter implementation
//! - Hash functions
//! - Parameter calculations
//! - Build configuration
//! - Record key extraction
//! - Build stages, progress math and cancellation
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod bloom_filter;
pub mod cancellation;
pub mod config;
pub mod hash_functions;
pub mod parameters;
pub mod progress;
pub mod record;
pub mod stage;

pub use bloom_filter::BloomFilter;
pub use cancellation::CancellationToken;
pub use config::{BuildConfig, BuildConfigBuilder, DEFAULT_TARGET_FPR};
pub use hash_functions::HASH_SCHEME_MURMUR3_DOUBLE;
pub use parameters::{calculate_optimal_parameters, BloomFilterParams};
pub use progress::ProgressUpdate;
pub use record::CREDENTIAL_KEY_LENGTH;
pub use stage::BuildStage;
