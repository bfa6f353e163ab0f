// crates/veritrust-pipeline/tests/verification_flow.rs
// ============================================================================
// Module: Verification Flow Tests
// Description: Drive requests through fan-out, provider results, and summary.
// Purpose: Ensure provider dispatch, completion idempotence, and aggregation
//          follow the request state machine.
// Dependencies: veritrust-pipeline, veritrust-core, serde_json
// ============================================================================

//! End-to-end verification pipeline behavior over the in-memory backends.

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
use std::sync::Arc;

use serde_json::json;

use veritrust_core::RequestStatus;
use veritrust_core::ResultCode;
use veritrust_core::ResultStatus;
use veritrust_core::Timestamp;
use veritrust_core::core::ConsentStatus;
use veritrust_core::core::EnrolmentModel;
use veritrust_core::core::InstrumentRecord;
use veritrust_core::core::LearnerRecord;
use veritrust_core::core::ProviderRecord;
use veritrust_core::core::identifiers::ActivityId;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::QueueName;
use veritrust_core::core::identifiers::RequestId;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::TaskId;
use veritrust_core::interfaces::BlobStore;
use veritrust_core::interfaces::EnrolmentStore;
use veritrust_core::interfaces::NewRequest;
use veritrust_core::interfaces::TaskKind;
use veritrust_core::interfaces::VerificationStore;
use veritrust_core::runtime::InMemoryBlobStore;
use veritrust_core::runtime::InMemoryTrustStore;
use veritrust_core::runtime::RecordingScheduler;
use veritrust_pipeline::ProviderOutcome;
use veritrust_pipeline::QueueRouter;
use veritrust_pipeline::RetryPolicy;
use veritrust_pipeline::VerificationTasks;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// In-memory collaborators plus the service under test.
struct Env {
    /// Shared store, inspected after each stage.
    store: Arc<InMemoryTrustStore>,
    /// Shared blob backend, inspected for sidecars and audits.
    blobs: Arc<InMemoryBlobStore>,
    /// Captures scheduled tasks instead of running them.
    scheduler: Arc<RecordingScheduler>,
    /// Service under test.
    tasks: VerificationTasks,
}

/// Builds a fresh environment over empty backends.
fn env() -> Env {
    let store = Arc::new(InMemoryTrustStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let scheduler = Arc::new(RecordingScheduler::new());
    let tasks = VerificationTasks::new(
        store.clone(),
        blobs.clone(),
        scheduler.clone(),
        QueueRouter::default(),
        RetryPolicy::default(),
    );
    Env {
        store,
        blobs,
        scheduler,
        tasks,
    }
}

/// Builds a non-zero identifier or fails the test.
fn nonzero<T>(raw: u64, build: impl Fn(u64) -> Option<T>) -> Result<T, Box<dyn std::error::Error>> {
    build(raw).ok_or_else(|| "nonzero id".into())
}

/// Seeds one learner with valid consent.
fn seed_learner(env: &Env, raw: u64) -> Result<LearnerId, Box<dyn std::error::Error>> {
    let id = nonzero(raw, LearnerId::from_raw)?;
    env.store.upsert_learner(LearnerRecord {
        id,
        institution_id: nonzero(1, InstitutionId::from_raw)?,
        subject: SubjectId::from(format!("subject-{raw}")),
        consent: ConsentStatus::Valid,
        active: true,
    })?;
    Ok(id)
}

/// Seeds one enabled instrument.
fn seed_instrument(
    env: &Env,
    raw: u64,
    requires_enrolment: bool,
) -> Result<InstrumentId, Box<dyn std::error::Error>> {
    let id = nonzero(raw, InstrumentId::from_raw)?;
    env.store.upsert_instrument(InstrumentRecord {
        id,
        name: format!("instrument-{raw}"),
        requires_enrolment,
        enabled: true,
    })?;
    Ok(id)
}

/// Seeds one enabled provider for the instrument.
fn seed_provider(
    env: &Env,
    raw: u64,
    instrument_id: InstrumentId,
) -> Result<ProviderId, Box<dyn std::error::Error>> {
    let id = nonzero(raw, ProviderId::from_raw)?;
    env.store.upsert_provider(ProviderRecord {
        id,
        instrument_id,
        acronym: format!("pr{raw}"),
        queue: QueueName::from(format!("provider-{raw}")),
        enabled: true,
        allow_validation: true,
        validation_active: true,
    })?;
    Ok(id)
}

/// Marks the learner's model with the given provider analysable.
fn seed_analysable_model(
    env: &Env,
    learner_id: LearnerId,
    provider_id: ProviderId,
) -> TestResult {
    let task = TaskId::from("seed-task");
    let now = Timestamp::from_unix_seconds(1_000_000);
    let mut model: EnrolmentModel =
        env.store
            .claim_model(learner_id, provider_id, &task, now, 5 * 3600)?;
    model.percentage = 1.0;
    model.can_analyse = true;
    env.store.save_model(&model)?;
    env.store.release_model(learner_id, provider_id, &task)?;
    Ok(())
}

/// Stores a request for the learner over the given instruments.
fn stored_request(
    env: &Env,
    learner_id: LearnerId,
    instruments: &[InstrumentId],
    activity: Option<u64>,
) -> Result<RequestId, Box<dyn std::error::Error>> {
    let activity_id = match activity {
        Some(raw) => Some(nonzero(raw, ActivityId::from_raw)?),
        None => None,
    };
    let request_id = env.tasks.store_request(&NewRequest {
        learner_id,
        activity_id,
        session_id: None,
        data_path: "requests/sub-1.bin".to_owned(),
        instruments: instruments.iter().copied().collect::<BTreeSet<_>>(),
    })?;
    env.blobs.save("requests/sub-1.bin", b"submission")?;
    env.scheduler.drain()?;
    Ok(request_id)
}

/// Missing consent discards the submission and records the reason.
#[test]
fn missing_consent_discards_the_submission() -> TestResult {
    let env = env();
    let learner_id = nonzero(1, LearnerId::from_raw)?;
    env.store.upsert_learner(LearnerRecord {
        id: learner_id,
        institution_id: nonzero(1, InstitutionId::from_raw)?,
        subject: SubjectId::from("subject-1"),
        consent: ConsentStatus::Expired,
        active: true,
    })?;
    let instrument_id = seed_instrument(&env, 1, false)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], None)?;

    env.tasks.verify_request(request_id)?;

    let request = env.store.request(request_id)?.ok_or("request")?;
    assert_eq!(request.status, RequestStatus::Error);
    assert!(env.blobs.open("requests/sub-1.bin").is_err());
    assert!(env.blobs.open("requests/sub-1.bin.error").is_ok());
    assert!(env.scheduler.scheduled()?.is_empty());
    Ok(())
}

/// Fan-out dispatches to provider queues and schedules the request.
#[test]
fn fan_out_dispatches_to_provider_queues() -> TestResult {
    let env = env();
    let learner_id = seed_learner(&env, 1)?;
    let instrument_id = seed_instrument(&env, 1, false)?;
    seed_provider(&env, 1, instrument_id)?;
    seed_provider(&env, 2, instrument_id)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], None)?;

    env.tasks.verify_request(request_id)?;

    let request = env.store.request(request_id)?.ok_or("request")?;
    assert_eq!(request.status, RequestStatus::Scheduled);
    let aggregate = env
        .store
        .request_result(request_id, instrument_id)?
        .ok_or("aggregate")?;
    assert_eq!(aggregate.status, ResultStatus::Pending);
    let scheduled = env.scheduler.scheduled()?;
    let queues: Vec<&str> = scheduled
        .iter()
        .filter(|task| matches!(task.kind, TaskKind::ProviderVerifyRequest { .. }))
        .map(|task| task.queue.as_str())
        .collect();
    assert_eq!(queues, ["provider-1", "provider-2"]);
    Ok(())
}

/// An instrument without providers is terminal before any dispatch.
#[test]
fn an_uncovered_instrument_is_missing_provider() -> TestResult {
    let env = env();
    let learner_id = seed_learner(&env, 1)?;
    let instrument_id = seed_instrument(&env, 1, false)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], None)?;

    env.tasks.verify_request(request_id)?;

    let request = env.store.request(request_id)?.ok_or("request")?;
    assert_eq!(request.status, RequestStatus::MissingProvider);
    let aggregate = env
        .store
        .request_result(request_id, instrument_id)?
        .ok_or("aggregate")?;
    assert_eq!(aggregate.status, ResultStatus::MissingProvider);
    assert!(env.scheduler.scheduled()?.is_empty());
    Ok(())
}

/// A non-analysable model skips the provider and lands a missing-enrolment row.
#[test]
fn a_non_analysable_model_skips_the_provider() -> TestResult {
    let env = env();
    let learner_id = seed_learner(&env, 1)?;
    let instrument_id = seed_instrument(&env, 1, true)?;
    let provider_id = seed_provider(&env, 1, instrument_id)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], None)?;

    env.tasks.verify_request(request_id)?;

    let request = env.store.request(request_id)?.ok_or("request")?;
    assert_eq!(request.status, RequestStatus::Error);
    let row = env
        .store
        .provider_result(request_id, provider_id)?
        .ok_or("provider row")?;
    assert_eq!(row.status, ResultStatus::MissingEnrolment);
    assert!(env.scheduler.scheduled()?.is_empty());
    Ok(())
}

/// The completion check schedules exactly one summary per instrument.
#[test]
fn completion_check_schedules_the_summary_exactly_once() -> TestResult {
    let env = env();
    let learner_id = seed_learner(&env, 1)?;
    let instrument_id = seed_instrument(&env, 1, true)?;
    let provider_id = seed_provider(&env, 1, instrument_id)?;
    seed_analysable_model(&env, learner_id, provider_id)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], None)?;
    env.tasks.verify_request(request_id)?;
    env.scheduler.drain()?;

    let outcome = ProviderOutcome {
        status: ResultStatus::Processed,
        result: Some(0.82),
        code: ResultCode::Warning,
        audit: Some(json!({ "windows": 4 })),
    };
    env.tasks
        .update_provider_result(request_id, provider_id, &outcome)?;
    // A duplicate delivery re-runs the check without a second summary.
    env.tasks
        .update_provider_result(request_id, provider_id, &outcome)?;

    let summaries = env
        .scheduler
        .drain()?
        .into_iter()
        .filter(|task| matches!(task.kind, TaskKind::CreateVerificationSummary { .. }))
        .count();
    assert_eq!(summaries, 1);
    // The audit landed next to the submission.
    assert!(env.blobs.open("requests/sub-1.bin__audit.json").is_ok());
    Ok(())
}

/// The summary folds provider rows into the aggregate and the request.
#[test]
fn summary_aggregates_rows_and_finishes_the_request() -> TestResult {
    let env = env();
    let learner_id = seed_learner(&env, 1)?;
    let instrument_id = seed_instrument(&env, 1, true)?;
    let first = seed_provider(&env, 1, instrument_id)?;
    let second = seed_provider(&env, 2, instrument_id)?;
    seed_analysable_model(&env, learner_id, first)?;
    seed_analysable_model(&env, learner_id, second)?;
    let request_id = stored_request(&env, learner_id, &[instrument_id], Some(7))?;
    env.tasks.verify_request(request_id)?;
    env.scheduler.drain()?;

    env.tasks.update_provider_result(
        request_id,
        first,
        &ProviderOutcome {
            status: ResultStatus::Processed,
            result: Some(0.4),
            code: ResultCode::Ok,
            audit: None,
        },
    )?;
    env.tasks.update_provider_result(
        request_id,
        second,
        &ProviderOutcome {
            status: ResultStatus::Processed,
            result: Some(0.9),
            code: ResultCode::Alert,
            audit: None,
        },
    )?;
    env.scheduler.drain()?;
    env.tasks
        .create_verification_summary(request_id, instrument_id)?;

    let aggregate = env
        .store
        .request_result(request_id, instrument_id)?
        .ok_or("aggregate")?;
    assert_eq!(aggregate.status, ResultStatus::Processed);
    assert_eq!(aggregate.result, Some(0.9));
    assert_eq!(aggregate.code, ResultCode::Alert);
    let request = env.store.request(request_id)?.ok_or("request")?;
    assert_eq!(request.status, RequestStatus::Processed);
    // The terminal summary refreshes the activity report.
    let report = env
        .scheduler
        .drain()?
        .into_iter()
        .find(|task| matches!(task.kind, TaskKind::UpdateActivityReport { .. }))
        .ok_or("report task")?;
    assert_eq!(report.queue.as_str(), "reporting");
    Ok(())
}
