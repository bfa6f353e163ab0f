// crates/veritrust-webhooks/tests/ingestion.rs
// ============================================================================
// Module: Webhook Ingestion Tests
// Description: Client matching, signatures, and handler outcomes.
// Purpose: Ensure deliveries are attributed, authenticated, and captured
//          the way the ingestion contract promises.
// Dependencies: veritrust-webhooks, veritrust-pipeline, veritrust-core
// ============================================================================

//! Webhook ingestion behavior over the in-memory backends.

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

use hmac::Hmac;
use hmac::Mac;
use serde_json::json;
use sha2::Sha512;

use veritrust_core::ResultCode;
use veritrust_core::ResultStatus;
use veritrust_core::Timestamp;
use veritrust_core::WebhookClient;
use veritrust_core::WebhookStatus;
use veritrust_core::core::ConsentStatus;
use veritrust_core::core::InstrumentRecord;
use veritrust_core::core::LearnerRecord;
use veritrust_core::core::ProviderRecord;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::QueueName;
use veritrust_core::core::identifiers::RequestId;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::WebhookClientId;
use veritrust_core::interfaces::NewRequest;
use veritrust_core::interfaces::VerificationStore;
use veritrust_core::interfaces::WebhookStore;
use veritrust_core::runtime::InMemoryBlobStore;
use veritrust_core::runtime::InMemoryTrustStore;
use veritrust_core::runtime::RecordingScheduler;
use veritrust_pipeline::QueueRouter;
use veritrust_pipeline::RetryPolicy;
use veritrust_pipeline::VerificationTasks;
use veritrust_webhooks::HANDLER_SIGNED_PROVIDER;
use veritrust_webhooks::HANDLER_TPT;
use veritrust_webhooks::HandlerRegistry;
use veritrust_webhooks::SIGNATURE_HEADER;
use veritrust_webhooks::SignedProviderHandler;
use veritrust_webhooks::TptHandler;
use veritrust_webhooks::WebhookDispatcher;
use veritrust_webhooks::WebhookError;
use veritrust_webhooks::WebhookRequest;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const NOW: Timestamp = Timestamp::from_unix_seconds(1_700_000_000);

/// Builds a non-zero identifier or fails the test.
fn nonzero<T>(raw: u64, build: impl Fn(u64) -> Option<T>) -> Result<T, Box<dyn std::error::Error>> {
    build(raw).ok_or_else(|| "nonzero id".into())
}

/// Signs a body the way registered clients do.
fn sign(secret: &str, body: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .map_err(|err| err.to_string())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Seeds one enabled client declaring the given header.
fn seed_client(
    store: &InMemoryTrustStore,
    raw: u64,
    header: &str,
    handler: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    store.upsert_webhook_client(WebhookClient {
        id: nonzero(raw, WebhookClientId::from_raw)?,
        name: format!("client-{raw}"),
        header: header.to_owned(),
        id_header: Some("X-NOTIFICATION-ID".to_owned()),
        secret: format!("secret-{raw}"),
        handler: handler.to_owned(),
        enabled: true,
    })?;
    Ok(())
}

/// Builds a dispatcher with both shipped handlers over the given backends.
fn dispatcher(
    store: &Arc<InMemoryTrustStore>,
    verification: Arc<VerificationTasks>,
) -> WebhookDispatcher {
    let mut registry = HandlerRegistry::new();
    registry.register(HANDLER_SIGNED_PROVIDER, Arc::new(SignedProviderHandler));
    registry.register(
        HANDLER_TPT,
        Arc::new(TptHandler::new(store.clone(), verification)),
    );
    WebhookDispatcher::new(store.clone(), registry)
}

/// Builds a verification service over the given store.
fn verification(store: &Arc<InMemoryTrustStore>) -> Arc<VerificationTasks> {
    Arc::new(VerificationTasks::new(
        store.clone(),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(RecordingScheduler::new()),
        QueueRouter::default(),
        RetryPolicy::default(),
    ))
}

/// Unmatched traffic is not-found class.
#[test]
fn unmatched_traffic_is_client_not_found() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    seed_client(&store, 1, "X-PROVIDER-A", HANDLER_SIGNED_PROVIDER)?;
    let dispatcher = dispatcher(&store, verification(&store));

    let request = WebhookRequest::new(
        [("X-UNKNOWN".to_owned(), "1".to_owned())],
        b"{}".to_vec(),
    );
    let denied = dispatcher.ingest(&request, NOW);
    match denied {
        Err(err @ WebhookError::ClientNotFound) => assert_eq!(err.status_class(), 404),
        other => panic!("expected ClientNotFound, got {other:?}"),
    }
    Ok(())
}

/// Ambiguous traffic is a sender error.
#[test]
fn ambiguous_traffic_is_rejected() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    seed_client(&store, 1, "X-PROVIDER-A", HANDLER_SIGNED_PROVIDER)?;
    seed_client(&store, 2, "X-PROVIDER-B", HANDLER_SIGNED_PROVIDER)?;
    let dispatcher = dispatcher(&store, verification(&store));

    let request = WebhookRequest::new(
        [
            ("X-PROVIDER-A".to_owned(), "1".to_owned()),
            ("X-PROVIDER-B".to_owned(), "1".to_owned()),
        ],
        b"{}".to_vec(),
    );
    let denied = dispatcher.ingest(&request, NOW);
    match denied {
        Err(err @ WebhookError::MultipleClients) => assert_eq!(err.status_class(), 400),
        other => panic!("expected MultipleClients, got {other:?}"),
    }
    Ok(())
}

/// A bad signature marks the stored message and propagates as forbidden.
#[test]
fn a_bad_signature_marks_the_message_and_propagates() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    seed_client(&store, 1, "X-PROVIDER-A", HANDLER_SIGNED_PROVIDER)?;
    let dispatcher = dispatcher(&store, verification(&store));

    let request = WebhookRequest::new(
        [
            ("X-PROVIDER-A".to_owned(), "1".to_owned()),
            (SIGNATURE_HEADER.to_owned(), "deadbeef".to_owned()),
        ],
        b"{\"event\":\"ping\"}".to_vec(),
    );
    let denied = dispatcher.ingest(&request, NOW);
    match denied {
        Err(err @ WebhookError::AuthFailed(_)) => assert_eq!(err.status_class(), 403),
        other => panic!("expected AuthFailed, got {other:?}"),
    }
    // The delivery stayed auditable.
    let message = store
        .webhook_message(nonzero(1, veritrust_core::core::identifiers::WebhookMessageId::from_raw)?)?
        .ok_or("message")?;
    assert_eq!(message.status, WebhookStatus::Error);
    assert!(message.error_message.is_some());
    Ok(())
}

/// The digest comparison is byte for byte; uppercase hex is rejected.
#[test]
fn an_uppercase_digest_is_rejected() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    seed_client(&store, 1, "X-PROVIDER-A", HANDLER_SIGNED_PROVIDER)?;
    let dispatcher = dispatcher(&store, verification(&store));

    let body = b"{\"event\":\"ping\"}".to_vec();
    let signature = sign("secret-1", &body)?.to_ascii_uppercase();
    let request = WebhookRequest::new(
        [
            ("X-PROVIDER-A".to_owned(), "1".to_owned()),
            (SIGNATURE_HEADER.to_owned(), signature),
        ],
        body,
    );
    let denied = dispatcher.ingest(&request, NOW);
    assert!(matches!(denied, Err(WebhookError::AuthFailed(_))));
    Ok(())
}

/// A signed delivery is persisted with its sender id and processed.
#[test]
fn a_signed_delivery_is_processed_with_its_sender_id() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    seed_client(&store, 1, "X-PROVIDER-A", HANDLER_SIGNED_PROVIDER)?;
    let dispatcher = dispatcher(&store, verification(&store));

    let body = b"{\"event\":\"model-updated\"}".to_vec();
    let signature = sign("secret-1", &body)?;
    let request = WebhookRequest::new(
        [
            // Lowercase on the wire; matching is case-insensitive.
            ("x-provider-a".to_owned(), "1".to_owned()),
            ("x-notification-id".to_owned(), "evt-42".to_owned()),
            (SIGNATURE_HEADER.to_owned(), signature),
        ],
        body,
    );
    let message_id = dispatcher.ingest(&request, NOW)?;

    let message = store.webhook_message(message_id)?.ok_or("message")?;
    assert_eq!(message.status, WebhookStatus::Processed);
    assert_eq!(message.external_id.as_deref(), Some("evt-42"));
    assert_eq!(message.received_at, NOW);
    Ok(())
}

/// Seeds the catalog and a dispatched request for the tpt handler.
fn seed_request(
    store: &Arc<InMemoryTrustStore>,
    verification: &VerificationTasks,
) -> Result<(RequestId, ProviderId), Box<dyn std::error::Error>> {
    let learner_id = nonzero(1, LearnerId::from_raw)?;
    store.upsert_learner(LearnerRecord {
        id: learner_id,
        institution_id: nonzero(1, InstitutionId::from_raw)?,
        subject: SubjectId::from("subject-1"),
        consent: ConsentStatus::Valid,
        active: true,
    })?;
    let instrument_id = nonzero(1, InstrumentId::from_raw)?;
    store.upsert_instrument(InstrumentRecord {
        id: instrument_id,
        name: "keystroke dynamics".to_owned(),
        requires_enrolment: false,
        enabled: true,
    })?;
    let provider_id = nonzero(1, ProviderId::from_raw)?;
    store.upsert_provider(ProviderRecord {
        id: provider_id,
        instrument_id,
        acronym: "ks".to_owned(),
        queue: QueueName::from("provider-ks"),
        enabled: true,
        allow_validation: true,
        validation_active: true,
    })?;
    let request_id = store.insert_request(&NewRequest {
        learner_id,
        activity_id: None,
        session_id: None,
        data_path: "requests/sub-1.bin".to_owned(),
        instruments: [instrument_id].into_iter().collect::<BTreeSet<_>>(),
    })?;
    verification.verify_request(request_id)?;
    Ok((request_id, provider_id))
}

/// A tpt notification lands the provider result on its request row.
#[test]
fn a_tpt_notification_lands_the_provider_result() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    let verification = verification(&store);
    let (request_id, provider_id) = seed_request(&store, &verification)?;
    seed_client(&store, 1, "X-TPT", HANDLER_TPT)?;
    let dispatcher = dispatcher(&store, verification);

    let body = serde_json::to_vec(&json!({
        "action": "UPDATE_RESULT",
        "request": request_id.get(),
        "provider": "ks",
        "status": 1,
        "result": 0.73,
        "code": 2,
    }))?;
    let signature = sign("secret-1", &body)?;
    let request = WebhookRequest::new(
        [
            ("X-TPT".to_owned(), "1".to_owned()),
            (SIGNATURE_HEADER.to_owned(), signature),
        ],
        body,
    );
    let message_id = dispatcher.ingest(&request, NOW)?;

    let message = store.webhook_message(message_id)?.ok_or("message")?;
    assert_eq!(message.status, WebhookStatus::Processed);
    let row = store
        .provider_result(request_id, provider_id)?
        .ok_or("provider row")?;
    assert_eq!(row.status, ResultStatus::Processed);
    assert_eq!(row.result, Some(0.73));
    assert_eq!(row.code, ResultCode::Warning);
    Ok(())
}

/// A processing failure is captured on the message, not propagated.
#[test]
fn a_processing_failure_is_captured_on_the_message() -> TestResult {
    let store = Arc::new(InMemoryTrustStore::new());
    let verification = verification(&store);
    seed_client(&store, 1, "X-TPT", HANDLER_TPT)?;
    let dispatcher = dispatcher(&store, verification);

    let body = serde_json::to_vec(&json!({
        "action": "UPDATE_RESULT",
        "request": 99,
        "provider": "nobody",
        "status": 1,
        "code": 1,
    }))?;
    let signature = sign("secret-1", &body)?;
    let request = WebhookRequest::new(
        [
            ("X-TPT".to_owned(), "1".to_owned()),
            (SIGNATURE_HEADER.to_owned(), signature),
        ],
        body,
    );
    let message_id = dispatcher.ingest(&request, NOW)?;

    let message = store.webhook_message(message_id)?.ok_or("message")?;
    assert_eq!(message.status, WebhookStatus::Error);
    assert!(
        message
            .error_message
            .as_deref()
            .is_some_and(|msg| msg.contains("unknown provider"))
    );
    Ok(())
}
