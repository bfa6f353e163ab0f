// crates/veritrust-pipeline/src/error.rs
// ============================================================================
// Module: Veritrust Pipeline Errors
// Description: Task failure taxonomy shared by every pipeline service.
// Purpose: Distinguish rejections from transient infrastructure failures.
// Dependencies: veritrust-core, thiserror
// ============================================================================

//! ## Overview
//! Task handlers either succeed, reject the task, or surface an
//! infrastructure failure. A rejection states whether the transport may
//! retry; infrastructure failures are always retryable by the transport's
//! own policy. Domain failures such as an invalid sample are not errors at
//! all: they are captured on the affected row and the task succeeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use veritrust_core::interfaces::BlobError;
use veritrust_core::interfaces::ScheduleError;
use veritrust_core::interfaces::StoreError;

// ============================================================================
// SECTION: Task Errors
// ============================================================================

/// Task handler failure.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Handler rejected the task outright.
    #[error("task rejected: {reason}")]
    Reject {
        /// Human-readable rejection reason.
        reason: String,
        /// Whether the transport may redeliver the task.
        retryable: bool,
    },
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Blob storage failure.
    #[error(transparent)]
    Blob(#[from] BlobError),
    /// Scheduling failure.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl TaskError {
    /// Builds a rejection the transport must not redeliver.
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
            retryable: false,
        }
    }

    /// Builds a rejection the transport may redeliver.
    #[must_use]
    pub fn reject_retryable(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
            retryable: true,
        }
    }
}
