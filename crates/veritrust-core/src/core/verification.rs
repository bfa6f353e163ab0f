// crates/veritrust-core/src/core/verification.rs
// ============================================================================
// Module: Veritrust Verification Entities
// Description: Verification requests and per-instrument/per-provider results.
// Purpose: Capture verification pipeline state with stable numeric code tables.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A verification request fans out into one result row per provider of each
//! involved instrument, plus one aggregate result row per instrument. The
//! request is fully resolved for an instrument once no provider row remains in
//! the open band (pending/processing); that transition triggers summary
//! generation exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActivityId;
use crate::core::identifiers::InstrumentId;
use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::RequestId;

// ============================================================================
// SECTION: Result Status
// ============================================================================

/// Status of a provider or instrument result row.
///
/// # Invariants
/// - Numeric codes are stable wire values used by aggregation arithmetic.
/// - `Pending` and `Processing` form the open band for completion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Awaiting provider output.
    Pending,
    /// Provider produced a final result.
    Processed,
    /// Provider reported a failure.
    Error,
    /// Provider never answered within the budget.
    Timeout,
    /// No enabled provider exists for the instrument.
    MissingProvider,
    /// Instrument requires enrolment and no analysable model exists.
    MissingEnrolment,
    /// Provider acknowledged and is working on the sample.
    Processing,
    /// Provider delegated to an external service and awaits its answer.
    WaitingExternal,
}

impl ResultStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processed => 1,
            Self::Error => 2,
            Self::Timeout => 3,
            Self::MissingProvider => 4,
            Self::MissingEnrolment => 5,
            Self::Processing => 6,
            Self::WaitingExternal => 7,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Processed),
            2 => Some(Self::Error),
            3 => Some(Self::Timeout),
            4 => Some(Self::MissingProvider),
            5 => Some(Self::MissingEnrolment),
            6 => Some(Self::Processing),
            7 => Some(Self::WaitingExternal),
            _ => None,
        }
    }

    /// Returns true when the row is still open (pending or processing band).
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

// ============================================================================
// SECTION: Result Code
// ============================================================================

/// Alert severity code attached to a result.
///
/// # Invariants
/// - Numeric codes are stable; aggregation keeps the maximum across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// No verdict yet.
    Pending,
    /// No anomaly detected.
    Ok,
    /// Possible anomaly worth reviewing.
    Warning,
    /// Strong anomaly signal.
    Alert,
}

impl ResultCode {
    /// Returns the stable numeric code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Ok => 1,
            Self::Warning => 2,
            Self::Alert => 3,
        }
    }

    /// Parses a code from its numeric value.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Ok),
            2 => Some(Self::Warning),
            3 => Some(Self::Alert),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Request Status
// ============================================================================

/// Verification request lifecycle status.
///
/// # Invariants
/// - Derived from the provider-result band via [`RequestStatus::from_provider_band`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Request stored, fan-out not yet dispatched.
    Stored,
    /// Provider tasks dispatched, none answered yet.
    Scheduled,
    /// At least one provider answered, others still open.
    Processing,
    /// All providers answered successfully.
    Processed,
    /// At least one provider failed terminally.
    Error,
    /// At least one provider timed out.
    Timeout,
    /// An involved instrument had no enabled provider.
    MissingProvider,
}

impl RequestStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Stored => 0,
            Self::Scheduled => 1,
            Self::Processing => 2,
            Self::Processed => 3,
            Self::Error => 4,
            Self::Timeout => 5,
            Self::MissingProvider => 6,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stored),
            1 => Some(Self::Scheduled),
            2 => Some(Self::Processing),
            3 => Some(Self::Processed),
            4 => Some(Self::Error),
            5 => Some(Self::Timeout),
            6 => Some(Self::MissingProvider),
            _ => None,
        }
    }

    /// Derives the request status from the min/max provider-result band.
    ///
    /// `min` and `max` are the extreme [`ResultStatus`] values across every
    /// provider row of the request. Open rows keep the request in
    /// `Scheduled`/`Processing`; otherwise the worst terminal row decides.
    #[must_use]
    pub const fn from_provider_band(min: ResultStatus, max: ResultStatus) -> Self {
        if matches!(min, ResultStatus::Pending | ResultStatus::Processing) {
            return if max.code() > min.code() {
                Self::Processing
            } else {
                Self::Scheduled
            };
        }
        match max {
            ResultStatus::Pending | ResultStatus::Processing | ResultStatus::Processed => {
                Self::Processed
            }
            ResultStatus::Error => Self::Error,
            ResultStatus::Timeout => Self::Timeout,
            ResultStatus::MissingProvider => Self::MissingProvider,
            ResultStatus::MissingEnrolment | ResultStatus::WaitingExternal => Self::Error,
        }
    }
}

// ============================================================================
// SECTION: Verification Request
// ============================================================================

/// One verification request for a learner's activity submission.
///
/// # Invariants
/// - `instruments` holds only instruments that attached successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Request numeric key.
    pub id: RequestId,
    /// Learner the request belongs to.
    pub learner_id: LearnerId,
    /// Activity the submission belongs to, when known.
    pub activity_id: Option<ActivityId>,
    /// Assessment session correlating live captures, when any.
    pub session_id: Option<u64>,
    /// Blob storage path of the submitted data.
    pub data_path: String,
    /// Instruments attached to the request.
    pub instruments: BTreeSet<InstrumentId>,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Error message when status is `Error` or `MissingProvider`.
    pub error_message: Option<String>,
}

// ============================================================================
// SECTION: Result Rows
// ============================================================================

/// Aggregate result for one `(request, instrument)` pair.
///
/// # Invariants
/// - `result` and `code` hold the maximum across processed provider rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    /// Request the result belongs to.
    pub request_id: RequestId,
    /// Instrument the result aggregates.
    pub instrument_id: InstrumentId,
    /// Aggregation status.
    pub status: ResultStatus,
    /// Aggregated numeric score, when any provider processed.
    pub result: Option<f64>,
    /// Aggregated alert severity.
    pub code: ResultCode,
}

/// One result row per `(request, provider)` pair.
///
/// # Invariants
/// - One row per provider per request; created at fan-out time.
/// - `audit_path` is set once the provider submits audit data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestProviderResult {
    /// Request the row belongs to.
    pub request_id: RequestId,
    /// Provider owning the row.
    pub provider_id: ProviderId,
    /// Row status.
    pub status: ResultStatus,
    /// Numeric score reported by the provider.
    pub result: Option<f64>,
    /// Alert severity reported by the provider.
    pub code: ResultCode,
    /// Blob path of the persisted audit artifact, when any.
    pub audit_path: Option<String>,
    /// Raw audit payload submitted by the provider.
    pub audit_data: Option<Value>,
}
