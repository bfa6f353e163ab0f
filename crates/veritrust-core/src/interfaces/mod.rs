// crates/veritrust-core/src/interfaces/mod.rs
// ============================================================================
// Module: Veritrust Interfaces
// Description: Backend-agnostic interfaces for storage, blobs, and scheduling.
// Purpose: Define the contract surfaces used by the Veritrust pipeline.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Veritrust integrates with its persistence and task
//! transport without embedding backend-specific details. Implementations must
//! be deterministic and fail closed on missing or invalid data: a lookup that
//! cannot be answered is an error, never a silent default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::actors::CourseRecord;
use crate::core::actors::InstrumentRecord;
use crate::core::actors::LearnerRecord;
use crate::core::actors::ProviderRecord;
use crate::core::actors::UserRecord;
use crate::core::actors::VleRecord;
use crate::core::alerts::Alert;
use crate::core::alerts::AlertLevel;
use crate::core::alerts::AlertStatus;
use crate::core::enrolment::EnrolmentModel;
use crate::core::enrolment::EnrolmentSample;
use crate::core::enrolment::SampleStatus;
use crate::core::enrolment::SampleValidation;
use crate::core::enrolment::ValidationStatus;
use crate::core::identifiers::ActivityId;
use crate::core::identifiers::AlertId;
use crate::core::identifiers::CourseId;
use crate::core::identifiers::InstitutionId;
use crate::core::identifiers::InstrumentId;
use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::QueueName;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SampleId;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::UserId;
use crate::core::identifiers::ValidationId;
use crate::core::identifiers::VleId;
use crate::core::identifiers::WebhookClientId;
use crate::core::identifiers::WebhookMessageId;
use crate::core::time::Timestamp;
use crate::core::verification::RequestProviderResult;
use crate::core::verification::RequestResult;
use crate::core::verification::RequestStatus;
use crate::core::verification::VerificationRequest;
use crate::core::webhooks::WebhookClient;
use crate::core::webhooks::WebhookMessage;
use crate::core::webhooks::WebhookStatus;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Store errors shared by every persistence trait.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Conflict` is retryable; the other variants are not.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Referenced row does not exist.
    #[error("store row not found: {0}")]
    NotFound(String),
    /// Another writer holds the contested row.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Draft Records
// ============================================================================

/// Draft enrolment sample prior to key assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSample {
    /// Owning learner.
    pub learner_id: LearnerId,
    /// Blob path of the captured data.
    pub data_path: String,
    /// Instruments the sender attached to the capture.
    pub instruments: BTreeSet<InstrumentId>,
}

/// Draft sample validation row prior to key assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValidation {
    /// Sample under validation.
    pub sample_id: SampleId,
    /// Validator provider owning the row.
    pub provider_id: ProviderId,
}

/// Draft verification request prior to key assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    /// Owning learner.
    pub learner_id: LearnerId,
    /// Activity the submission belongs to, when known.
    pub activity_id: Option<ActivityId>,
    /// Assessment session, when any.
    pub session_id: Option<u64>,
    /// Blob path of the submitted data.
    pub data_path: String,
    /// Instruments requested by the sender.
    pub instruments: BTreeSet<InstrumentId>,
}

/// Draft alert prior to key assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Severity level.
    pub level: AlertLevel,
    /// Institution the alert concerns, when scoped.
    pub institution_id: Option<InstitutionId>,
    /// Learner the alert concerns, when any.
    pub learner_id: Option<LearnerId>,
    /// Activity the alert concerns, when any.
    pub activity_id: Option<ActivityId>,
    /// Assessment session the alert was raised in, when any.
    pub session_id: Option<u64>,
    /// Instruments the sender attached to the alert.
    pub instruments: BTreeSet<InstrumentId>,
    /// Raising module identifier.
    pub raised_by: String,
    /// Structured alert payload.
    pub data: Value,
    /// Creation time supplied by the caller.
    pub raised_at: Timestamp,
}

/// Draft webhook message prior to key assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebhookMessage {
    /// Matched client.
    pub client_id: WebhookClientId,
    /// Sender-supplied message id, when any.
    pub external_id: Option<String>,
    /// Parsed JSON body as received.
    pub body: Value,
    /// Time the message was persisted.
    pub received_at: Timestamp,
}

// ============================================================================
// SECTION: Identity Store
// ============================================================================

/// Lookup surface for actor records referenced by credentials.
pub trait IdentityStore {
    /// Loads a learner by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn learner(&self, id: LearnerId) -> Result<Option<LearnerRecord>, StoreError>;

    /// Loads a learner by stable subject identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn learner_by_subject(&self, subject: &SubjectId) -> Result<Option<LearnerRecord>, StoreError>;

    /// Loads a user by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Loads a user by login identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Loads a VLE by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn vle(&self, id: VleId) -> Result<Option<VleRecord>, StoreError>;
}

// ============================================================================
// SECTION: Catalog Store
// ============================================================================

/// Lookup surface for instruments, providers, and courses.
pub trait CatalogStore {
    /// Loads an instrument by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn instrument(&self, id: InstrumentId) -> Result<Option<InstrumentRecord>, StoreError>;

    /// Loads a provider by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn provider(&self, id: ProviderId) -> Result<Option<ProviderRecord>, StoreError>;

    /// Loads a provider by acronym.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn provider_by_acronym(&self, acronym: &str) -> Result<Option<ProviderRecord>, StoreError>;

    /// Lists enabled providers serving an instrument, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn providers_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError>;

    /// Lists enabled validator providers for an instrument, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn validators_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError>;

    /// Loads a course by numeric key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn course(&self, id: CourseId) -> Result<Option<CourseRecord>, StoreError>;
}

// ============================================================================
// SECTION: Enrolment Store
// ============================================================================

/// Persistence surface for enrolment samples, validations, and models.
pub trait EnrolmentStore {
    /// Persists a new sample in `Stored` status and assigns its key.
    ///
    /// The draft's instruments land on the row unvalidated; attachment
    /// filters them later.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_sample(&self, sample: &NewSample) -> Result<SampleId, StoreError>;

    /// Loads a sample by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn sample(&self, id: SampleId) -> Result<Option<EnrolmentSample>, StoreError>;

    /// Replaces a sample's instruments with the known subset of `instruments`.
    ///
    /// Returns the number of instruments actually attached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sample does not exist or the backend
    /// fails.
    fn attach_sample_instruments(
        &self,
        id: SampleId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError>;

    /// Updates a sample's status and optional error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sample does not exist or the backend
    /// fails.
    fn set_sample_status(
        &self,
        id: SampleId,
        status: SampleStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Persists a new validation row in `Pending` status and assigns its key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_validation(&self, validation: &NewValidation) -> Result<ValidationId, StoreError>;

    /// Loads a validation row by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn validation(&self, id: ValidationId) -> Result<Option<SampleValidation>, StoreError>;

    /// Lists every validation row of a sample, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn validations_for_sample(&self, id: SampleId) -> Result<Vec<SampleValidation>, StoreError>;

    /// Records a validator verdict on a validation row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row does not exist or the backend
    /// fails.
    fn record_validation(
        &self,
        id: ValidationId,
        status: ValidationStatus,
        contribution: Option<f64>,
        info_path: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Loads the enrolment model for a learner and provider.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
    ) -> Result<Option<EnrolmentModel>, StoreError>;

    /// Atomically claims the model lock for a worker task.
    ///
    /// Creates the model row when absent. The claim succeeds when the lock is
    /// free, already held by `task`, or stale per `max_age_seconds`; the
    /// returned model reflects the claimed state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when another live task holds the
    /// lock, or another [`StoreError`] when the backend fails.
    fn claim_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
        now: Timestamp,
        max_age_seconds: i64,
    ) -> Result<EnrolmentModel, StoreError>;

    /// Persists model content fields without touching the lock columns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row does not exist or the backend
    /// fails.
    fn save_model(&self, model: &EnrolmentModel) -> Result<(), StoreError>;

    /// Releases the model lock when held by `task`; otherwise does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn release_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Verification Store
// ============================================================================

/// Persistence surface for verification requests and result rows.
pub trait VerificationStore {
    /// Persists a new request in `Stored` status and assigns its key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_request(&self, request: &NewRequest) -> Result<RequestId, StoreError>;

    /// Loads a request by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn request(&self, id: RequestId) -> Result<Option<VerificationRequest>, StoreError>;

    /// Replaces a request's instruments with the known subset of
    /// `instruments`.
    ///
    /// Returns the number of instruments actually attached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the request does not exist or the backend
    /// fails.
    fn attach_request_instruments(
        &self,
        id: RequestId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError>;

    /// Updates a request's status and optional error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the request does not exist or the backend
    /// fails.
    fn set_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Inserts or replaces the aggregate result of one instrument.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn upsert_request_result(&self, result: &RequestResult) -> Result<(), StoreError>;

    /// Loads the aggregate result of one instrument.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn request_result(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<Option<RequestResult>, StoreError>;

    /// Atomically moves an instrument aggregate from `Pending` to
    /// `Processing`.
    ///
    /// Returns `true` when this call won the transition, `false` when another
    /// caller already did.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row does not exist or the backend
    /// fails.
    fn try_begin_summary(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<bool, StoreError>;

    /// Inserts a provider result row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a row for the pair already exists or the
    /// backend fails.
    fn insert_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError>;

    /// Loads a provider result row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn provider_result(
        &self,
        request_id: RequestId,
        provider_id: ProviderId,
    ) -> Result<Option<RequestProviderResult>, StoreError>;

    /// Lists every provider result row of a request, ordered by provider key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn provider_results(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<RequestProviderResult>, StoreError>;

    /// Replaces a provider result row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the row does not exist or the backend
    /// fails.
    fn update_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Alert Store
// ============================================================================

/// Persistence surface for alerts.
pub trait AlertStore {
    /// Persists an alert in `Stored` status and assigns its key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_alert(&self, alert: &NewAlert) -> Result<AlertId, StoreError>;

    /// Loads an alert by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError>;

    /// Replaces the alert's instrument set with the known subset of the
    /// requested instruments, returning how many attached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the alert does not exist.
    fn attach_alert_instruments(
        &self,
        id: AlertId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError>;

    /// Updates the alert's status and error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the alert does not exist.
    fn set_alert_status(
        &self,
        id: AlertId,
        status: AlertStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Webhook Store
// ============================================================================

/// Persistence surface for webhook clients and messages.
pub trait WebhookStore {
    /// Lists enabled webhook clients, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn enabled_clients(&self) -> Result<Vec<WebhookClient>, StoreError>;

    /// Persists an inbound message in `Created` status and assigns its key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn insert_message(&self, message: &NewWebhookMessage)
    -> Result<WebhookMessageId, StoreError>;

    /// Loads a message by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn webhook_message(
        &self,
        id: WebhookMessageId,
    ) -> Result<Option<WebhookMessage>, StoreError>;

    /// Updates a message's status and optional error message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the message does not exist or the backend
    /// fails.
    fn set_message_status(
        &self,
        id: WebhookMessageId,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Trust Store
// ============================================================================

/// Combined persistence surface consumed by the pipeline services.
pub trait TrustStore:
    IdentityStore + CatalogStore + EnrolmentStore + VerificationStore + AlertStore + WebhookStore
{
}

impl<T> TrustStore for T where
    T: IdentityStore
        + CatalogStore
        + EnrolmentStore
        + VerificationStore
        + AlertStore
        + WebhookStore
{
}

// ============================================================================
// SECTION: Blob Store
// ============================================================================

/// Blob store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Blob path escapes the storage root or is otherwise malformed.
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    /// Blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// Blob backend I/O error.
    #[error("blob io error: {0}")]
    Io(String),
}

/// Content-addressed blob storage for sample data and sidecar artifacts.
///
/// Paths are forward-slash relative paths under an implementation-defined
/// root; implementations must reject traversal outside that root.
pub trait BlobStore {
    /// Writes a blob, replacing any existing content at the path.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the path is invalid or the write fails.
    fn save(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Reads a blob's full content.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the path is invalid, the blob is missing,
    /// or the read fails.
    fn open(&self, path: &str) -> Result<Vec<u8>, BlobError>;

    /// Deletes a blob; deleting a missing blob succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] when the path is invalid or the delete fails.
    fn delete(&self, path: &str) -> Result<(), BlobError>;
}

// ============================================================================
// SECTION: Task Scheduler
// ============================================================================

/// Asynchronous task kinds dispatched through queues.
///
/// # Invariants
/// - Payloads carry row keys; workers re-read state from the store. The
///   intake task is the exception: it carries the submitted draft because
///   no row exists until its gates pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskKind {
    /// Gate a submitted capture, persist it, and chain validation.
    CreateSample {
        /// Draft carrying the learner, blob path, and instrument set.
        draft: NewSample,
    },
    /// Look up validators and create one validation row per validator.
    ValidateRequest {
        /// Sample to fan out.
        sample_id: SampleId,
    },
    /// Ask one validator provider to validate a sample.
    ValidateSample {
        /// Sample under validation.
        sample_id: SampleId,
        /// Validation row owning the verdict.
        validation_id: ValidationId,
        /// Validator provider the task is bound to.
        provider_id: ProviderId,
    },
    /// Fold validation verdicts into the sample status.
    CreateValidationSummary {
        /// Sample to summarize.
        sample_id: SampleId,
        /// Retry attempts already spent waiting for verdicts.
        retry_count: u32,
    },
    /// Fan out provider enrolment for a validated sample.
    EnrolLearner {
        /// Learner to enrol.
        learner_id: LearnerId,
        /// Validated sample feeding the models.
        sample_id: SampleId,
    },
    /// Feed a learner's validated sample into one provider's model.
    ProviderEnrolLearner {
        /// Learner to enrol.
        learner_id: LearnerId,
        /// Validated sample feeding the model.
        sample_id: SampleId,
        /// Provider whose model is updated.
        provider_id: ProviderId,
    },
    /// Fan out provider verification for a stored request.
    VerifyRequest {
        /// Request to process.
        request_id: RequestId,
    },
    /// Ask one provider to verify a request.
    ProviderVerifyRequest {
        /// Request under verification.
        request_id: RequestId,
        /// Provider the task is bound to.
        provider_id: ProviderId,
    },
    /// Aggregate provider results into one instrument summary.
    CreateVerificationSummary {
        /// Request to summarize.
        request_id: RequestId,
        /// Instrument whose providers are aggregated.
        instrument_id: InstrumentId,
    },
    /// Notify downstream consumers about a stored alert.
    NotifyAlert {
        /// Alert to notify about.
        alert_id: AlertId,
    },
    /// Refresh the activity report after a summary lands.
    UpdateActivityReport {
        /// Learner whose report changes.
        learner_id: LearnerId,
        /// Activity whose report changes.
        activity_id: ActivityId,
    },
}

impl TaskKind {
    /// Returns the stable task name used for routing and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateSample { .. } => "create_sample",
            Self::ValidateRequest { .. } => "validate_request",
            Self::ValidateSample { .. } => "validate_sample",
            Self::CreateValidationSummary { .. } => "create_validation_summary",
            Self::EnrolLearner { .. } => "enrol_learner",
            Self::ProviderEnrolLearner { .. } => "provider_enrol_learner",
            Self::VerifyRequest { .. } => "verify_request",
            Self::ProviderVerifyRequest { .. } => "provider_verify_request",
            Self::CreateVerificationSummary { .. } => "create_verification_summary",
            Self::NotifyAlert { .. } => "notify_alert",
            Self::UpdateActivityReport { .. } => "update_activity_report",
        }
    }
}

/// One task scheduled onto a queue.
///
/// # Invariants
/// - `queue` is already resolved; schedulers never re-route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Task kind and payload.
    pub kind: TaskKind,
    /// Destination queue.
    pub queue: QueueName,
    /// Delay before the task becomes runnable, in seconds.
    pub countdown_seconds: u64,
    /// Maximum retry attempts the transport may make.
    pub max_retries: u32,
}

/// Scheduler errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Transport rejected or failed to accept the task.
    #[error("schedule error: {0}")]
    Transport(String),
}

/// Backend-agnostic task scheduler.
pub trait TaskScheduler {
    /// Enqueues a task onto its destination queue.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when the transport rejects the task.
    fn schedule(&self, request: &TaskRequest) -> Result<(), ScheduleError>;
}
