//! Feature Layout - column roles and feature-list fingerprint
//!
//! **This file decides which upload columns may ever reach a model.**
//!
//! ## Rules:
//! 1. Label columns are ground truth: never features, never delivered back.
//! 2. Identifier columns carry no signal (ids, timestamps, addresses).
//! 3. Everything else is a candidate feature, aligned by name.

use crc32fast::Hasher;

// ============================================================================
// COLUMN ROLES
// ============================================================================

/// Ground-truth columns of the training dataset (leakage guard)
pub const LABEL_COLUMNS: &[&str] = &["attack", "category", "subcategory"];

/// Identifier / metadata columns dropped before inference
pub const IDENTIFIER_COLUMNS: &[&str] = &[
    "pkSeqID", // record sequence id
    "stime",   // flow start time
    "ltime",   // flow last time
    "saddr",   // source IP
    "daddr",   // destination IP
    "smac",    // source MAC
    "dmac",    // destination MAC
    "soui",    // source OUI
    "doui",    // destination OUI
    "sco",     // source country
    "dco",     // destination country
    "seq",     // argus sequence number
];

pub fn is_label_column(name: &str) -> bool {
    LABEL_COLUMNS.contains(&name)
}

pub fn is_identifier_column(name: &str) -> bool {
    IDENTIFIER_COLUMNS.contains(&name)
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 of an ordered feature list.
///
/// Two lists hash equal only if they hold the same names in the same order,
/// which is what a trained model depends on.
pub fn layout_hash(features: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    for name in features {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

/// Layout information for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutInfo {
    pub hash: u32,
    pub feature_count: usize,
}

impl LayoutInfo {
    pub fn of(features: &[String]) -> Self {
        Self {
            hash: layout_hash(features),
            feature_count: features.len(),
        }
    }
}

impl std::fmt::Display for LayoutInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} features, layout {:08x}", self.feature_count, self.hash)
    }
}
