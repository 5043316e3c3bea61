// crates/alert-harness-core/src/telemetry/fingerprint.rs
// ============================================================================
// Module: Series Fingerprint
// Description: FNV-1a 64-bit fingerprint over a canonical label set.
// Purpose: Identify a time series identically to the telemetry store.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Labels are sorted by key (then value) and absorbed as
//! `key 0xFF value 0xFF` for every pair, using FNV-1a with 64-bit wrapping
//! arithmetic. The byte layout is a wire contract with the store.
//!
//! Invariants:
//! - The result does not depend on input order.
//! - An empty label set hashes to [`FNV_OFFSET_BASIS`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 1_099_511_628_211;
/// Byte absorbed after every key and every value.
const SEPARATOR: u8 = 0xFF;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Hash and textual identifier of one label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Raw hash written to the store.
    pub hash: u64,
    /// `k1=v1;k2=v2;hash=<u64>`.
    pub text: String,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Fingerprints a label map.
#[must_use]
pub fn fingerprint(labels: &BTreeMap<String, String>) -> Fingerprint {
    fingerprint_pairs(labels.iter().map(|(key, value)| (key.as_str(), value.as_str())))
}

/// Fingerprints label pairs given in any order.
#[must_use]
pub fn fingerprint_pairs<'a, I>(labels: I) -> Fingerprint
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = labels.into_iter().collect();
    pairs.sort_unstable();
    let mut hash = FNV_OFFSET_BASIS;
    let mut text = String::new();
    for (key, value) in &pairs {
        hash = absorb(hash, key.as_bytes());
        hash = absorb(hash, &[SEPARATOR]);
        hash = absorb(hash, value.as_bytes());
        hash = absorb(hash, &[SEPARATOR]);
        text.push_str(key);
        text.push('=');
        text.push_str(value);
        text.push(';');
    }
    text.push_str("hash=");
    text.push_str(&hash.to_string());
    Fingerprint {
        hash,
        text,
    }
}

/// Returns only the raw hash of a label map.
#[must_use]
pub fn fingerprint_hash(labels: &BTreeMap<String, String>) -> u64 {
    fingerprint(labels).hash
}

const fn absorb(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut index = 0;
    while index < bytes.len() {
        hash ^= bytes[index] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        index += 1;
    }
    hash
}
