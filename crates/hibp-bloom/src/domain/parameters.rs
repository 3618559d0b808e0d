//! Optimal Bloom filter parameter calculation
//!
//! Formulas:
//! - m = ceil(-n*ln(fpr) / (ln(2)^2))  -- optimal bits
//! - k = round((m/n) * ln(2)), min 1   -- optimal hash functions
//!
//! An empty input (n = 0) yields the minimum filter: m = 1, k = 1.

use std::f64::consts::LN_2;

use crate::error::FilterError;

/// Bloom filter parameters
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    /// Number of bits in the filter (m)
    pub size_bits: u64,
    /// Number of hash functions (k)
    pub hash_count: u32,
    /// Expected false positive rate once all n elements are inserted
    pub expected_fpr: f64,
}

impl BloomFilterParams {
    /// Bytes needed to hold the bit array
    pub fn size_bytes(&self) -> u64 {
        self.size_bits.div_ceil(8)
    }
}

/// Reject rates outside the open interval (0, 1)
pub fn validate_fpr(target_fpr: f64) -> Result<(), FilterError> {
    if target_fpr.is_finite() && target_fpr > 0.0 && target_fpr < 1.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidFpr { fpr: target_fpr })
    }
}

/// Calculate optimal Bloom filter parameters for given constraints
///
/// # Arguments
/// * `num_elements` - Expected number of elements to insert (n)
/// * `target_fpr` - Target false positive rate, already validated
pub fn calculate_optimal_parameters(num_elements: u64, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: calculate_fpr(1, 0, 1),
        };
    }

    let size_bits = minimum_bits(num_elements, target_fpr);
    let hash_count = optimal_k(size_bits, num_elements);

    BloomFilterParams {
        size_bits,
        hash_count,
        expected_fpr: calculate_fpr(size_bits, num_elements, hash_count),
    }
}

/// Calculate the false positive rate for given parameters
///
/// Formula: FPR = (1 - e^(-kn/m))^k
pub fn calculate_fpr(m: u64, n: u64, k: u32) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}

/// Calculate optimal k for given m and n
pub fn optimal_k(m: u64, n: u64) -> u32 {
    if n == 0 {
        return 1;
    }
    let k = ((m as f64 / n as f64) * LN_2).round() as u32;
    k.max(1)
}

/// Calculate minimum m for given n and target FPR
pub fn minimum_bits(n: u64, target_fpr: f64) -> u64 {
    let ln2_squared = LN_2 * LN_2;
    let m = (-(n as f64) * target_fpr.ln() / ln2_squared).ceil() as u64;
    m.max(1)
}
