//! # Store Primitives
//!
//! Hardcoded limits and constants for the DenseEdia store.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Every limit is enforced by the core itself, so the front ends cannot
//! bypass them.

/// Value of the first id handed out for every entity table.
///
/// Ids are allocated from per-table counters and never reused.
pub const FIRST_ID: u64 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for node titles, in bytes.
pub const MAX_TITLE_LENGTH: usize = 1024;

/// Maximum length for node kinds and link labels, in bytes.
pub const MAX_LABEL_LENGTH: usize = 256;

/// Maximum length for element names, in bytes.
pub const MAX_ELEMENT_NAME_LENGTH: usize = 256;

/// Maximum length of a stored payload (64KB of JSON text).
///
/// Larger values are rejected before anything is written.
pub const MAX_PAYLOAD_LENGTH: usize = 65536;

/// Upper bound for the `limit` of the most-used names aggregation.
pub const MAX_MOST_USED_LIMIT: usize = 1000;

