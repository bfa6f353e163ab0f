// crates/veritrust-core/src/core/time.rs
// ============================================================================
// Module: Veritrust Time Model
// Description: Canonical timestamp representation for locks, expiry, and artifacts.
// Purpose: Provide deterministic time values supplied by callers, never the core.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Veritrust uses explicit time values passed in by callers to keep pipeline
//! behavior deterministic and testable. The core never reads wall-clock time;
//! hosts sample it at the edges and thread it through task invocations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp in unix seconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix seconds.
    #[must_use]
    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the timestamp as unix seconds.
    #[must_use]
    pub const fn unix_seconds(self) -> i64 {
        self.0
    }

    /// Returns this timestamp advanced by the given number of seconds.
    #[must_use]
    pub const fn plus_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Returns true when this timestamp lies strictly before `other`.
    #[must_use]
    pub const fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }

    /// Returns true when this timestamp is older than `max_age_seconds`
    /// relative to `now`.
    #[must_use]
    pub const fn is_older_than(self, now: Self, max_age_seconds: i64) -> bool {
        now.0.saturating_sub(self.0) > max_age_seconds
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
