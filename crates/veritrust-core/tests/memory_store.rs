// crates/veritrust-core/tests/memory_store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Validate the reference store's locking and attach semantics.
// Purpose: Ensure model claims and instrument attachment behave atomically.
// Dependencies: veritrust-core
// ============================================================================

//! Concurrency-sensitive store behavior exercised through the in-memory
//! reference implementation.

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

use std::collections::BTreeSet;
use std::io::Error;
use std::io::ErrorKind;

use veritrust_core::core::InstrumentRecord;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::TaskId;
use veritrust_core::Timestamp;
use veritrust_core::interfaces::EnrolmentStore;
use veritrust_core::interfaces::NewSample;
use veritrust_core::interfaces::StoreError;
use veritrust_core::runtime::InMemoryTrustStore;

/// Builds a nonzero identifier or fails the test.
fn nonzero<T>(raw: u64, build: impl Fn(u64) -> Option<T>) -> Result<T, Error> {
    build(raw).ok_or_else(|| Error::new(ErrorKind::InvalidInput, "nonzero id"))
}

/// Lock claims follow the free/self/stale rule.
#[test]
fn model_claim_rejects_live_holders_and_accepts_stale_ones() -> Result<(), Box<dyn std::error::Error>>
{
    let store = InMemoryTrustStore::new();
    let learner = nonzero(1, LearnerId::from_raw)?;
    let provider = nonzero(1, ProviderId::from_raw)?;
    let first = TaskId::from("task-a");
    let second = TaskId::from("task-b");
    let start = Timestamp::from_unix_seconds(1_000_000);

    let model = store.claim_model(learner, provider, &first, start, 5 * 3600)?;
    assert_eq!(model.locked_by, Some(first.clone()));

    // A different live task must not steal the lock.
    let denied = store.claim_model(learner, provider, &second, start.plus_seconds(60), 5 * 3600);
    assert!(matches!(denied, Err(StoreError::Conflict(_))));

    // The holder may re-enter its own claim.
    store.claim_model(learner, provider, &first, start.plus_seconds(60), 5 * 3600)?;

    // Once the lock is stale another task takes over.
    let stale_now = start.plus_seconds(5 * 3600 + 61);
    let stolen = store.claim_model(learner, provider, &second, stale_now, 5 * 3600)?;
    assert_eq!(stolen.locked_by, Some(second.clone()));

    // Releasing under the wrong task is a no-op.
    store.release_model(learner, provider, &first)?;
    let model = store
        .model(learner, provider)?
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "model"))?;
    assert_eq!(model.locked_by, Some(second.clone()));

    store.release_model(learner, provider, &second)?;
    let model = store
        .model(learner, provider)?
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "model"))?;
    assert_eq!(model.locked_by, None);
    Ok(())
}

/// Attachment keeps only instruments the catalog knows.
#[test]
fn attaching_instruments_skips_unknown_keys() -> Result<(), Box<dyn std::error::Error>> {
    let store = InMemoryTrustStore::new();
    let known = nonzero(1, InstrumentId::from_raw)?;
    let unknown = nonzero(99, InstrumentId::from_raw)?;
    store.upsert_instrument(InstrumentRecord {
        id: known,
        name: "keystroke dynamics".to_string(),
        requires_enrolment: true,
        enabled: true,
    })?;

    let learner = nonzero(7, LearnerId::from_raw)?;
    let sample_id = store.insert_sample(&NewSample {
        learner_id: learner,
        data_path: "samples/7/capture.json".to_string(),
        instruments: BTreeSet::new(),
    })?;

    let requested: BTreeSet<InstrumentId> = [known, unknown].into_iter().collect();
    let attached = store.attach_sample_instruments(sample_id, &requested)?;
    assert_eq!(attached, 1);

    let sample = store
        .sample(sample_id)?
        .ok_or_else(|| Error::new(ErrorKind::NotFound, "sample"))?;
    assert!(sample.instruments.contains(&known));
    assert!(!sample.instruments.contains(&unknown));
    Ok(())
}
