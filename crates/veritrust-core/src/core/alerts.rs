// crates/veritrust-core/src/core/alerts.rs
// ============================================================================
// Module: Veritrust Alert Entities
// Description: Alert severity levels and alert records raised by modules.
// Purpose: Model alerts routed through the asynchronous alert queue.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Modules raise alerts by severity label. Labels parse case-insensitively
//! into a stable numeric level; unknown labels are rejected at ingestion so a
//! malformed producer cannot smuggle an unclassified alert into the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActivityId;
use crate::core::identifiers::AlertId;
use crate::core::identifiers::InstitutionId;
use crate::core::identifiers::InstrumentId;
use crate::core::identifiers::LearnerId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Alert Level
// ============================================================================

/// Severity of an alert.
///
/// # Invariants
/// - Numeric codes are stable wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Informational notice.
    Info,
    /// Something worth reviewing.
    Warning,
    /// Anomaly requiring attention.
    Alert,
    /// Platform-level failure.
    Error,
}

impl AlertLevel {
    /// Returns the stable numeric code for the level.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Warning => 1,
            Self::Alert => 2,
            Self::Error => 3,
        }
    }

    /// Parses a level from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Info),
            1 => Some(Self::Warning),
            2 => Some(Self::Alert),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    /// Parses a level from its textual label, case-insensitively.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ALERT" => Some(Self::Alert),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns the canonical uppercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Alert => "ALERT",
            Self::Error => "ERROR",
        }
    }
}

// ============================================================================
// SECTION: Alert Status
// ============================================================================

/// Lifecycle status of a stored alert.
///
/// # Invariants
/// - Numeric codes follow the shared status table: `0` stored, `2` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Alert stored and accepted.
    Stored,
    /// Alert invalidated during ingestion.
    Error,
}

impl AlertStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Stored => 0,
            Self::Error => 2,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stored),
            2 => Some(Self::Error),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Alert Record
// ============================================================================

/// A stored alert raised by a platform module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert numeric key.
    pub id: AlertId,
    /// Severity level.
    pub level: AlertLevel,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Institution the alert concerns, when scoped.
    pub institution_id: Option<InstitutionId>,
    /// Learner the alert concerns, when any.
    pub learner_id: Option<LearnerId>,
    /// Activity the alert concerns, when any.
    pub activity_id: Option<ActivityId>,
    /// Assessment session the alert was raised in, when any.
    pub session_id: Option<u64>,
    /// Instruments the alert concerns.
    pub instruments: BTreeSet<InstrumentId>,
    /// Raising module identifier, such as an instrument acronym.
    pub raised_by: String,
    /// Structured alert payload.
    pub data: Value,
    /// Error message when the status is `Error`.
    pub error_message: Option<String>,
    /// Creation time.
    pub raised_at: Timestamp,
}
