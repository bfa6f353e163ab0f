// crates/veritrust-core/src/core/enrolment.rs
// ============================================================================
// Module: Veritrust Enrolment Entities
// Description: Enrolment samples, per-provider validations, and biometric models.
// Purpose: Capture enrolment pipeline state with stable numeric status codes.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Enrolment state is split across three entities: the sample (one capture
//! batch), one validation row per `(sample, validator)` pair, and the
//! per-`(learner, provider)` aggregate model. Status fields use small integer
//! codes on the wire; the code tables are load-bearing because sample validity
//! is decided by comparing codes against the acceptable band (`code <= 1`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::SampleId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::ValidationId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum age of a model lock before it is considered abandoned (5 hours).
pub const MODEL_LOCK_MAX_AGE_SECONDS: i64 = 5 * 3600;

// ============================================================================
// SECTION: Sample Status
// ============================================================================

/// Enrolment sample lifecycle status.
///
/// # Invariants
/// - Numeric codes are stable wire values; `Stored` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    /// Sample stored, awaiting validation.
    Stored,
    /// All validators accepted the sample.
    Valid,
    /// Validation failed or the sample was malformed.
    Error,
    /// Validation did not finish within the retry budget.
    Timeout,
    /// No validator exists for one of the requested instruments.
    MissingValidator,
}

impl SampleStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Stored => 0,
            Self::Valid => 1,
            Self::Error => 2,
            Self::Timeout => 3,
            Self::MissingValidator => 4,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stored),
            1 => Some(Self::Valid),
            2 => Some(Self::Error),
            3 => Some(Self::Timeout),
            4 => Some(Self::MissingValidator),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Enrolment Sample
// ============================================================================

/// One biometric/behavioral capture batch for a learner.
///
/// # Invariants
/// - `instruments` holds only instruments that attached successfully; a
///   mismatch against the requested set marks the sample `Error`.
/// - Status is terminal once it leaves `Stored`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolmentSample {
    /// Sample numeric key.
    pub id: SampleId,
    /// Learner the sample belongs to.
    pub learner_id: LearnerId,
    /// Blob storage path of the captured data.
    pub data_path: String,
    /// Instruments attached to the sample.
    pub instruments: BTreeSet<crate::core::identifiers::InstrumentId>,
    /// Lifecycle status.
    pub status: SampleStatus,
    /// Error message when status is `Error` or `MissingValidator`.
    pub error_message: Option<String>,
}

// ============================================================================
// SECTION: Sample Validation
// ============================================================================

/// Per-validator validation status.
///
/// # Invariants
/// - Codes above 1 are failure variants; overall sample validity requires
///   every row code to be <= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Awaiting the validator's verdict.
    Pending,
    /// Validator accepted the sample.
    Valid,
    /// Validator rejected the sample.
    Error,
    /// Validator never answered; forced by the summarizer.
    Timeout,
}

impl ValidationStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Valid => 1,
            Self::Error => 2,
            Self::Timeout => 3,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Valid),
            2 => Some(Self::Error),
            3 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Returns true when the status lies in the acceptable band (`code <= 1`).
    #[must_use]
    pub const fn is_acceptable(self) -> bool {
        self.code() <= 1
    }

    /// Returns a stable label for summaries and artifacts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// One validation row per `(sample, validator)` pair.
///
/// # Invariants
/// - Created at fan-out time; updated exactly once by the owning provider or
///   forced to `Timeout` by the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleValidation {
    /// Validation row numeric key.
    pub id: ValidationId,
    /// Sample under validation.
    pub sample_id: SampleId,
    /// Validator provider owning the row.
    pub provider_id: ProviderId,
    /// Validation status.
    pub status: ValidationStatus,
    /// Contribution of this sample toward the provider's model (0..=1).
    pub contribution: Option<f64>,
    /// Blob path of provider-supplied validation detail, when any.
    pub info_path: Option<String>,
    /// Error message when the validator rejected the sample.
    pub error_message: Option<String>,
}

// ============================================================================
// SECTION: Enrolment Model
// ============================================================================

/// Per-`(learner, provider)` aggregate biometric model.
///
/// # Invariants
/// - At most one non-stale lock at a time; a lock older than
///   [`MODEL_LOCK_MAX_AGE_SECONDS`] may be preempted.
/// - Never deleted; the record is a historical aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolmentModel {
    /// Learner the model belongs to.
    pub learner_id: LearnerId,
    /// Provider owning the model.
    pub provider_id: ProviderId,
    /// Enrolment completeness in the range 0..=1.
    pub percentage: f64,
    /// Whether the provider can analyse verification samples with this model.
    pub can_analyse: bool,
    /// Task correlation id holding the lock, when locked.
    pub locked_by: Option<TaskId>,
    /// Time the lock was taken, when locked.
    pub locked_at: Option<Timestamp>,
    /// Blob path of the stored model payload, when any.
    pub model_path: Option<String>,
    /// Samples used to build the current model.
    pub used_samples: BTreeSet<SampleId>,
}

impl EnrolmentModel {
    /// Returns true when the model currently holds a lock.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked_by.is_some() && self.locked_at.is_some()
    }

    /// Returns true when the current lock is older than the staleness window.
    #[must_use]
    pub fn lock_is_stale(&self, now: Timestamp) -> bool {
        self.locked_at
            .is_some_and(|at| at.is_older_than(now, MODEL_LOCK_MAX_AGE_SECONDS))
    }
}
