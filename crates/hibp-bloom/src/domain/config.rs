//! Filter build configuration and validation
//!
//! # Example
//!
//! ```
//! use hibp_bloom::domain::BuildConfigBuilder;
//!
//! let config = BuildConfigBuilder::new()
//!     .target_fpr(0.0001)
//!     .count_check_interval(1 << 16)
//!     .build()
//!     .expect("Valid config");
//! assert_eq!(config.key_length, 40);
//! ```

use serde::{Deserialize, Serialize};

use super::parameters::validate_fpr;
use super::record::CREDENTIAL_KEY_LENGTH;
use crate::error::FilterError;

/// Default target false positive rate (0.1%)
pub const DEFAULT_TARGET_FPR: f64 = 0.001;

/// Lines between cancellation checks while counting (2^20)
pub const DEFAULT_COUNT_CHECK_INTERVAL: u64 = 1 << 20;

/// Fallback duration estimate for a full build, in minutes
pub const DEFAULT_ESTIMATED_MINUTES: u64 = 40;

/// Filter build configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Target false positive rate, strictly between 0 and 1
    pub target_fpr: f64,
    /// Characters of each record used as the key
    pub key_length: usize,
    /// Lines between cancellation checks during the counting pass
    pub count_check_interval: u64,
    /// Time estimate shown before any throughput has been measured
    pub estimated_total_minutes: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target_fpr: DEFAULT_TARGET_FPR,
            key_length: CREDENTIAL_KEY_LENGTH,
            count_check_interval: DEFAULT_COUNT_CHECK_INTERVAL,
            estimated_total_minutes: DEFAULT_ESTIMATED_MINUTES,
        }
    }
}

impl BuildConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), FilterError> {
        validate_fpr(self.target_fpr)?;

        if self.key_length == 0 {
            return Err(FilterError::InvalidParameters(
                "key_length cannot be 0".to_string(),
            ));
        }

        if self.count_check_interval == 0 {
            return Err(FilterError::InvalidParameters(
                "count_check_interval cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder-style method to set target FPR
    pub fn with_target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = fpr;
        self
    }

    /// Builder-style method to set the key length
    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }

    /// Builder-style method to set the counting check interval
    pub fn with_count_check_interval(mut self, lines: u64) -> Self {
        self.count_check_interval = lines;
        self
    }
}

/// Builder for BuildConfig with validation
#[derive(Default)]
pub struct BuildConfigBuilder {
    target_fpr: Option<f64>,
    key_length: Option<usize>,
    count_check_interval: Option<u64>,
    estimated_total_minutes: Option<u64>,
}

impl BuildConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set target false positive rate
    pub fn target_fpr(mut self, fpr: f64) -> Self {
        self.target_fpr = Some(fpr);
        self
    }

    /// Set the number of leading characters indexed per record
    pub fn key_length(mut self, key_length: usize) -> Self {
        self.key_length = Some(key_length);
        self
    }

    /// Set lines between cancellation checks while counting
    pub fn count_check_interval(mut self, lines: u64) -> Self {
        self.count_check_interval = Some(lines);
        self
    }

    /// Set the fallback estimate for a whole build
    pub fn estimated_total_minutes(mut self, minutes: u64) -> Self {
        self.estimated_total_minutes = Some(minutes);
        self
    }

    /// Build the BuildConfig, validating all parameters
    pub fn build(self) -> Result<BuildConfig, FilterError> {
        let defaults = BuildConfig::default();

        let config = BuildConfig {
            target_fpr: self.target_fpr.unwrap_or(defaults.target_fpr),
            key_length: self.key_length.unwrap_or(defaults.key_length),
            count_check_interval: self
                .count_check_interval
                .unwrap_or(defaults.count_check_interval),
            estimated_total_minutes: self
                .estimated_total_minutes
                .unwrap_or(defaults.estimated_total_minutes),
        };

        config.validate()?;
        Ok(config)
    }
}
