//! Hash functions for the Bloom filter
//!
//! Scheme 1 (the only scheme so far):
//! - MurmurHash3 x64_128 with seed 0 over the raw key bytes
//! - h1 = low 64 bits, h2 = high 64 bits
//! - position_i = (h1 + i * h2) mod m, wrapping 64-bit arithmetic, i in 0..k
//!
//! Persisted filters record the scheme id. A lookup tool must reproduce this
//! derivation exactly.

use std::io::Cursor;

/// Identifier of the hash derivation above, stored in every filter file
pub const HASH_SCHEME_MURMUR3_DOUBLE: u16 = 1;

/// MurmurHash3 seed for scheme 1
pub const HASH_SEED: u32 = 0;

/// Hash an element with 128-bit MurmurHash3
pub fn murmur_hash128(element: &[u8]) -> u128 {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory cursor cannot fail
    murmur3::murmur3_x64_128(&mut cursor, HASH_SEED).unwrap_or(0)
}

/// Split the 128-bit hash into the two base hashes (h1, h2)
pub fn base_hashes(element: &[u8]) -> (u64, u64) {
    let hash = murmur_hash128(element);
    (hash as u64, (hash >> 64) as u64)
}

/// Iterator over the k bit positions of one element
#[derive(Clone, Debug)]
pub struct HashPositions {
    h1: u64,
    h2: u64,
    m: u64,
    i: u32,
    k: u32,
}

impl Iterator for HashPositions {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.i >= self.k {
            return None;
        }
        let hash = self.h1.wrapping_add(u64::from(self.i).wrapping_mul(self.h2));
        self.i += 1;
        Some(hash % self.m)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.k - self.i) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HashPositions {}

/// Compute k hash positions in [0, m) for an element
///
/// Uses double hashing: h(i) = h1 + i * h2
/// This is more efficient than computing k independent hashes.
pub fn hash_positions(element: &[u8], k: u32, m: u64) -> HashPositions {
    debug_assert!(m > 0, "filter must have at least one bit");
    let (h1, h2) = base_hashes(element);
    HashPositions { h1, h2, m, i: 0, k }
}
