//! Core Bloom Filter implementation
//!
//! Invariants:
//! - m and k are fixed at construction
//! - No false negatives: if inserted, might_contain() MUST return true
//! - Bits are only ever set, never cleared

use bitvec::prelude::*;

use super::hash_functions::{hash_positions, HASH_SCHEME_MURMUR3_DOUBLE};
use super::parameters::{calculate_fpr, calculate_optimal_parameters, validate_fpr};
use super::record::CREDENTIAL_KEY_LENGTH;
use crate::error::FilterError;

/// Bloom filter for probabilistic membership testing
///
/// A Bloom filter is a space-efficient probabilistic data structure that
/// can test whether an element is a member of a set. False positives are
/// possible, but false negatives are not.
///
/// Bits are stored LSB-first in bytes: bit `i` lives in byte `i / 8` at
/// position `i % 8`. This is also the on-disk payload layout.
#[derive(Clone, Debug)]
pub struct BloomFilter {
    /// Bit array storing the filter state
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    k: u32,
    /// Size in bits (m)
    m: u64,
    /// Number of insert calls (n)
    n: u64,
    /// Rate the filter was sized for
    target_fpr: f64,
    /// Characters of each record used as the key
    key_length: usize,
}

impl BloomFilter {
    /// Create a new Bloom filter with specified parameters
    ///
    /// # Arguments
    /// * `m` - Size in bits
    /// * `k` - Number of hash functions
    pub fn new(m: u64, k: u32) -> Result<Self, FilterError> {
        if m == 0 || k == 0 {
            return Err(FilterError::InvalidParameters(format!(
                "size_bits and hash_count must be positive (m={}, k={})",
                m, k
            )));
        }
        let len = usize::try_from(m).map_err(|_| FilterError::FilterTooLarge { size_bits: m })?;

        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; len],
            k,
            m,
            n: 0,
            // Rate at the load for which k is optimal
            target_fpr: 0.5f64.powi(k as i32),
            key_length: CREDENTIAL_KEY_LENGTH,
        })
    }

    /// Create a new Bloom filter with optimal parameters for target FPR
    ///
    /// `expected_elements` may be zero, which yields a one-bit filter.
    pub fn new_with_fpr(expected_elements: u64, target_fpr: f64) -> Result<Self, FilterError> {
        validate_fpr(target_fpr)?;
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        let mut filter = Self::new(params.size_bits, params.hash_count)?;
        filter.target_fpr = target_fpr;
        Ok(filter)
    }

    /// Rebuild a filter from its persisted parts
    ///
    /// `bytes` must hold exactly ceil(m / 8) bytes.
    pub fn from_raw_parts(
        bytes: Vec<u8>,
        m: u64,
        k: u32,
        n: u64,
        target_fpr: f64,
        key_length: usize,
    ) -> Result<Self, FilterError> {
        if m == 0 || k == 0 || key_length == 0 {
            return Err(FilterError::InvalidParameters(format!(
                "m, k and key_length must be positive (m={}, k={}, key_length={})",
                m, k, key_length
            )));
        }
        let len = usize::try_from(m).map_err(|_| FilterError::FilterTooLarge { size_bits: m })?;
        if bytes.len() != len.div_ceil(8) {
            return Err(FilterError::InvalidParameters(format!(
                "{} payload bytes cannot hold exactly {} bits",
                bytes.len(),
                m
            )));
        }

        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);
        bits.truncate(len);

        Ok(Self {
            bits,
            k,
            m,
            n,
            target_fpr,
            key_length,
        })
    }

    /// Set the key length recorded with this filter
    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }

    /// Insert an element into the filter
    ///
    /// After insertion, `might_contain(element)` is guaranteed to return true.
    pub fn insert(&mut self, element: &[u8]) {
        for pos in hash_positions(element, self.k, self.m) {
            // pos < m, and m fits in usize since construction
            self.bits.set(pos as usize, true);
        }
        self.n += 1;
    }

    /// Test if an element might be in the filter
    ///
    /// Returns:
    /// - `true` if the element might be in the set (could be false positive)
    /// - `false` if the element is definitely NOT in the set (never false negative)
    pub fn might_contain(&self, element: &[u8]) -> bool {
        hash_positions(element, self.k, self.m).all(|pos| self.bits[pos as usize])
    }

    /// Estimated false positive rate at the current load
    ///
    /// Formula: FPR = (1 - e^(-kn/m))^k
    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.k)
    }

    /// Get the number of bits set in the filter
    pub fn bits_set(&self) -> u64 {
        self.bits.count_ones() as u64
    }

    /// Fraction of bits set
    pub fn fill_ratio(&self) -> f64 {
        self.bits_set() as f64 / self.m as f64
    }

    /// Get the filter size in bits
    pub fn size_bits(&self) -> u64 {
        self.m
    }

    /// Get the number of hash functions
    pub fn hash_count(&self) -> u32 {
        self.k
    }

    /// Get the number of insert calls, duplicates included
    pub fn elements_inserted(&self) -> u64 {
        self.n
    }

    pub fn target_fpr(&self) -> f64 {
        self.target_fpr
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Hash derivation used for every position
    pub fn hash_scheme(&self) -> u16 {
        HASH_SCHEME_MURMUR3_DOUBLE
    }

    /// Raw bit array, ceil(m / 8) bytes with unused high bits zero
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }
}
