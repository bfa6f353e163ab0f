// crates/veritrust-core/tests/status_tables.rs
// ============================================================================
// Module: Status Table Tests
// Description: Validate status-code derivations used by the pipeline.
// Purpose: Ensure request status and severity follow the fixed tables.
// Dependencies: veritrust-core
// ============================================================================

//! Status derivation tests for request banding and alert levels.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use veritrust_core::AlertLevel;
use veritrust_core::RequestStatus;
use veritrust_core::ResultStatus;
use veritrust_core::ValidationStatus;

/// An open minimum row keeps the request in flight.
#[test]
fn open_band_keeps_request_scheduled_until_first_answer() {
    let status = RequestStatus::from_provider_band(ResultStatus::Pending, ResultStatus::Pending);
    assert_eq!(status, RequestStatus::Scheduled);

    let status = RequestStatus::from_provider_band(ResultStatus::Pending, ResultStatus::Processed);
    assert_eq!(status, RequestStatus::Processing);

    let status =
        RequestStatus::from_provider_band(ResultStatus::Processing, ResultStatus::Processing);
    assert_eq!(status, RequestStatus::Scheduled);
}

/// With no open rows the worst terminal row wins.
#[test]
fn worst_terminal_row_decides_request_status() {
    let status = RequestStatus::from_provider_band(ResultStatus::Processed, ResultStatus::Processed);
    assert_eq!(status, RequestStatus::Processed);

    let status = RequestStatus::from_provider_band(ResultStatus::Processed, ResultStatus::Error);
    assert_eq!(status, RequestStatus::Error);

    let status = RequestStatus::from_provider_band(ResultStatus::Processed, ResultStatus::Timeout);
    assert_eq!(status, RequestStatus::Timeout);

    let status =
        RequestStatus::from_provider_band(ResultStatus::Processed, ResultStatus::MissingProvider);
    assert_eq!(status, RequestStatus::MissingProvider);
}

/// Missing-enrolment and waiting rows band to request error.
#[test]
fn missing_enrolment_rows_surface_as_request_error() {
    let status =
        RequestStatus::from_provider_band(ResultStatus::Processed, ResultStatus::MissingEnrolment);
    assert_eq!(status, RequestStatus::Error);
}

/// Acceptance is exactly the `code <= 1` band.
#[test]
fn validation_acceptance_follows_the_code_boundary() {
    assert!(ValidationStatus::Pending.is_acceptable());
    assert!(ValidationStatus::Valid.is_acceptable());
    assert!(!ValidationStatus::Error.is_acceptable());
    assert!(!ValidationStatus::Timeout.is_acceptable());
}

/// Level labels parse in any case; unknown labels do not.
#[test]
fn alert_levels_parse_case_insensitively_and_reject_unknown_labels() {
    assert_eq!(AlertLevel::from_label("warning"), Some(AlertLevel::Warning));
    assert_eq!(AlertLevel::from_label("ALERT"), Some(AlertLevel::Alert));
    assert_eq!(AlertLevel::from_label("Info"), Some(AlertLevel::Info));
    assert_eq!(AlertLevel::from_label("critical"), None);
    assert_eq!(AlertLevel::from_label(""), None);
}

/// Status codes round-trip and out-of-range codes parse to none.
#[test]
fn result_status_codes_round_trip_and_cap() {
    for code in 0..=7 {
        let status = ResultStatus::from_code(code);
        assert!(status.is_some_and(|status| status.code() == code));
    }
    assert!(ResultStatus::from_code(8).is_none());
}
