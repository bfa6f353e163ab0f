// crates/veritrust-core/src/runtime/memory.rs
// ============================================================================
// Module: Veritrust In-Memory Runtime
// Description: In-memory store, blob store, and scheduler for tests and demos.
// Purpose: Provide deterministic runtime implementations without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides in-memory implementations of the persistence and
//! scheduling interfaces for tests and local demos. They are not intended for
//! production use. All maps are ordered so listings are reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::actors::CourseRecord;
use crate::core::actors::InstrumentRecord;
use crate::core::actors::LearnerRecord;
use crate::core::actors::ProviderRecord;
use crate::core::actors::UserRecord;
use crate::core::actors::VleRecord;
use crate::core::alerts::Alert;
use crate::core::alerts::AlertStatus;
use crate::core::enrolment::EnrolmentModel;
use crate::core::enrolment::EnrolmentSample;
use crate::core::enrolment::SampleStatus;
use crate::core::enrolment::SampleValidation;
use crate::core::enrolment::ValidationStatus;
use crate::core::identifiers::AlertId;
use crate::core::identifiers::CourseId;
use crate::core::identifiers::InstrumentId;
use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::RequestId;
use crate::core::identifiers::SampleId;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::UserId;
use crate::core::identifiers::ValidationId;
use crate::core::identifiers::VleId;
use crate::core::identifiers::WebhookMessageId;
use crate::core::time::Timestamp;
use crate::core::verification::RequestProviderResult;
use crate::core::verification::RequestResult;
use crate::core::verification::RequestStatus;
use crate::core::verification::ResultStatus;
use crate::core::verification::VerificationRequest;
use crate::core::webhooks::WebhookClient;
use crate::core::webhooks::WebhookMessage;
use crate::core::webhooks::WebhookStatus;
use crate::interfaces::AlertStore;
use crate::interfaces::BlobError;
use crate::interfaces::BlobStore;
use crate::interfaces::CatalogStore;
use crate::interfaces::EnrolmentStore;
use crate::interfaces::IdentityStore;
use crate::interfaces::NewAlert;
use crate::interfaces::NewRequest;
use crate::interfaces::NewSample;
use crate::interfaces::NewValidation;
use crate::interfaces::NewWebhookMessage;
use crate::interfaces::ScheduleError;
use crate::interfaces::StoreError;
use crate::interfaces::TaskRequest;
use crate::interfaces::TaskScheduler;
use crate::interfaces::VerificationStore;
use crate::interfaces::WebhookStore;

// ============================================================================
// SECTION: Inner State
// ============================================================================

/// Mutable interior of the in-memory store.
#[derive(Debug, Default)]
struct Inner {
    /// Learner records keyed by numeric id.
    learners: BTreeMap<u64, LearnerRecord>,
    /// User records keyed by numeric id.
    users: BTreeMap<u64, UserRecord>,
    /// VLE records keyed by numeric id.
    vles: BTreeMap<u64, VleRecord>,
    /// Provider records keyed by numeric id.
    providers: BTreeMap<u64, ProviderRecord>,
    /// Instrument records keyed by numeric id.
    instruments: BTreeMap<u64, InstrumentRecord>,
    /// Course records keyed by numeric id.
    courses: BTreeMap<u64, CourseRecord>,
    /// Enrolment samples keyed by numeric id.
    samples: BTreeMap<u64, EnrolmentSample>,
    /// Validation rows keyed by numeric id.
    validations: BTreeMap<u64, SampleValidation>,
    /// Enrolment models keyed by `(learner, provider)`.
    models: BTreeMap<(u64, u64), EnrolmentModel>,
    /// Verification requests keyed by numeric id.
    requests: BTreeMap<u64, VerificationRequest>,
    /// Instrument aggregates keyed by `(request, instrument)`.
    request_results: BTreeMap<(u64, u64), RequestResult>,
    /// Provider rows keyed by `(request, provider)`.
    provider_results: BTreeMap<(u64, u64), RequestProviderResult>,
    /// Alerts keyed by numeric id.
    alerts: BTreeMap<u64, Alert>,
    /// Webhook clients keyed by numeric id.
    webhook_clients: BTreeMap<u64, WebhookClient>,
    /// Webhook messages keyed by numeric id.
    webhook_messages: BTreeMap<u64, WebhookMessage>,
    /// Next sample key.
    next_sample: u64,
    /// Next validation key.
    next_validation: u64,
    /// Next request key.
    next_request: u64,
    /// Next alert key.
    next_alert: u64,
    /// Next webhook message key.
    next_message: u64,
}

/// Builds an identifier from a monotonically increasing counter.
fn alloc<T>(counter: &mut u64, build: impl Fn(u64) -> Option<T>) -> Result<T, StoreError> {
    *counter += 1;
    build(*counter).ok_or_else(|| StoreError::Store("identifier counter overflow".to_string()))
}

// ============================================================================
// SECTION: In-Memory Trust Store
// ============================================================================

/// In-memory trust store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTrustStore {
    /// Entire state protected by a mutex.
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryTrustStore {
    /// Creates an empty in-memory trust store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the interior state.
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Store("trust store mutex poisoned".to_string()))
    }

    /// Inserts or replaces a learner record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_learner(&self, learner: LearnerRecord) -> Result<(), StoreError> {
        self.lock()?.learners.insert(learner.id.get(), learner);
        Ok(())
    }

    /// Inserts or replaces a user record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.lock()?.users.insert(user.id.get(), user);
        Ok(())
    }

    /// Inserts or replaces a VLE record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_vle(&self, vle: VleRecord) -> Result<(), StoreError> {
        self.lock()?.vles.insert(vle.id.get(), vle);
        Ok(())
    }

    /// Inserts or replaces a provider record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_provider(&self, provider: ProviderRecord) -> Result<(), StoreError> {
        self.lock()?.providers.insert(provider.id.get(), provider);
        Ok(())
    }

    /// Inserts or replaces an instrument record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_instrument(&self, instrument: InstrumentRecord) -> Result<(), StoreError> {
        self.lock()?
            .instruments
            .insert(instrument.id.get(), instrument);
        Ok(())
    }

    /// Inserts or replaces a course record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_course(&self, course: CourseRecord) -> Result<(), StoreError> {
        self.lock()?.courses.insert(course.id.get(), course);
        Ok(())
    }

    /// Inserts or replaces a webhook client.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn upsert_webhook_client(&self, client: WebhookClient) -> Result<(), StoreError> {
        self.lock()?
            .webhook_clients
            .insert(client.id.get(), client);
        Ok(())
    }
}

impl IdentityStore for InMemoryTrustStore {
    fn learner(&self, id: LearnerId) -> Result<Option<LearnerRecord>, StoreError> {
        Ok(self.lock()?.learners.get(&id.get()).cloned())
    }

    fn learner_by_subject(&self, subject: &SubjectId) -> Result<Option<LearnerRecord>, StoreError> {
        Ok(self
            .lock()?
            .learners
            .values()
            .find(|learner| learner.subject == *subject)
            .cloned())
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock()?.users.get(&id.get()).cloned())
    }

    fn user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.uid.as_str() == uid)
            .cloned())
    }

    fn vle(&self, id: VleId) -> Result<Option<VleRecord>, StoreError> {
        Ok(self.lock()?.vles.get(&id.get()).cloned())
    }
}

impl CatalogStore for InMemoryTrustStore {
    fn instrument(&self, id: InstrumentId) -> Result<Option<InstrumentRecord>, StoreError> {
        Ok(self.lock()?.instruments.get(&id.get()).cloned())
    }

    fn provider(&self, id: ProviderId) -> Result<Option<ProviderRecord>, StoreError> {
        Ok(self.lock()?.providers.get(&id.get()).cloned())
    }

    fn provider_by_acronym(&self, acronym: &str) -> Result<Option<ProviderRecord>, StoreError> {
        Ok(self
            .lock()?
            .providers
            .values()
            .find(|provider| provider.acronym == acronym)
            .cloned())
    }

    fn providers_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError> {
        Ok(self
            .lock()?
            .providers
            .values()
            .filter(|provider| provider.instrument_id == id && provider.enabled)
            .cloned()
            .collect())
    }

    fn validators_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError> {
        Ok(self
            .lock()?
            .providers
            .values()
            .filter(|provider| {
                provider.instrument_id == id && provider.enabled && provider.is_validator()
            })
            .cloned()
            .collect())
    }

    fn course(&self, id: CourseId) -> Result<Option<CourseRecord>, StoreError> {
        Ok(self.lock()?.courses.get(&id.get()).cloned())
    }
}

impl EnrolmentStore for InMemoryTrustStore {
    fn insert_sample(&self, sample: &NewSample) -> Result<SampleId, StoreError> {
        let mut inner = self.lock()?;
        let id = alloc(&mut inner.next_sample, SampleId::from_raw)?;
        inner.samples.insert(
            id.get(),
            EnrolmentSample {
                id,
                learner_id: sample.learner_id,
                data_path: sample.data_path.clone(),
                instruments: sample.instruments.clone(),
                status: SampleStatus::Stored,
                error_message: None,
            },
        );
        Ok(id)
    }

    fn sample(&self, id: SampleId) -> Result<Option<EnrolmentSample>, StoreError> {
        Ok(self.lock()?.samples.get(&id.get()).cloned())
    }

    fn attach_sample_instruments(
        &self,
        id: SampleId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let known: BTreeSet<InstrumentId> = instruments
            .iter()
            .copied()
            .filter(|instrument| inner.instruments.contains_key(&instrument.get()))
            .collect();
        let sample = inner
            .samples
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("sample {id}")))?;
        let attached = known.len();
        sample.instruments = known;
        Ok(attached)
    }

    fn set_sample_status(
        &self,
        id: SampleId,
        status: SampleStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let sample = inner
            .samples
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("sample {id}")))?;
        sample.status = status;
        sample.error_message = error_message.map(str::to_string);
        Ok(())
    }

    fn insert_validation(&self, validation: &NewValidation) -> Result<ValidationId, StoreError> {
        let mut inner = self.lock()?;
        let id = alloc(&mut inner.next_validation, ValidationId::from_raw)?;
        inner.validations.insert(
            id.get(),
            SampleValidation {
                id,
                sample_id: validation.sample_id,
                provider_id: validation.provider_id,
                status: ValidationStatus::Pending,
                contribution: None,
                info_path: None,
                error_message: None,
            },
        );
        Ok(id)
    }

    fn validation(&self, id: ValidationId) -> Result<Option<SampleValidation>, StoreError> {
        Ok(self.lock()?.validations.get(&id.get()).cloned())
    }

    fn validations_for_sample(&self, id: SampleId) -> Result<Vec<SampleValidation>, StoreError> {
        Ok(self
            .lock()?
            .validations
            .values()
            .filter(|validation| validation.sample_id == id)
            .cloned()
            .collect())
    }

    fn record_validation(
        &self,
        id: ValidationId,
        status: ValidationStatus,
        contribution: Option<f64>,
        info_path: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let validation = inner
            .validations
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("validation {id}")))?;
        validation.status = status;
        validation.contribution = contribution;
        validation.info_path = info_path.map(str::to_string);
        validation.error_message = error_message.map(str::to_string);
        Ok(())
    }

    fn model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
    ) -> Result<Option<EnrolmentModel>, StoreError> {
        Ok(self
            .lock()?
            .models
            .get(&(learner_id.get(), provider_id.get()))
            .cloned())
    }

    fn claim_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
        now: Timestamp,
        max_age_seconds: i64,
    ) -> Result<EnrolmentModel, StoreError> {
        let mut inner = self.lock()?;
        let model = inner
            .models
            .entry((learner_id.get(), provider_id.get()))
            .or_insert_with(|| EnrolmentModel {
                learner_id,
                provider_id,
                percentage: 0.0,
                can_analyse: false,
                locked_by: None,
                locked_at: None,
                model_path: None,
                used_samples: BTreeSet::new(),
            });
        let claimable = match (&model.locked_by, model.locked_at) {
            (None, _) => true,
            (Some(holder), _) if holder == task => true,
            (Some(_), Some(locked_at)) => locked_at.is_older_than(now, max_age_seconds),
            (Some(_), None) => true,
        };
        if !claimable {
            return Err(StoreError::Conflict(format!(
                "model {learner_id}/{provider_id} is locked"
            )));
        }
        model.locked_by = Some(task.clone());
        model.locked_at = Some(now);
        Ok(model.clone())
    }

    fn save_model(&self, model: &EnrolmentModel) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let stored = inner
            .models
            .get_mut(&(model.learner_id.get(), model.provider_id.get()))
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "model {}/{}",
                    model.learner_id, model.provider_id
                ))
            })?;
        stored.percentage = model.percentage;
        stored.can_analyse = model.can_analyse;
        stored.model_path = model.model_path.clone();
        stored.used_samples = model.used_samples.clone();
        Ok(())
    }

    fn release_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(model) = inner.models.get_mut(&(learner_id.get(), provider_id.get()))
            && model.locked_by.as_ref() == Some(task)
        {
            model.locked_by = None;
            model.locked_at = None;
        }
        Ok(())
    }
}

impl VerificationStore for InMemoryTrustStore {
    fn insert_request(&self, request: &NewRequest) -> Result<RequestId, StoreError> {
        let mut inner = self.lock()?;
        let id = alloc(&mut inner.next_request, RequestId::from_raw)?;
        inner.requests.insert(
            id.get(),
            VerificationRequest {
                id,
                learner_id: request.learner_id,
                activity_id: request.activity_id,
                session_id: request.session_id,
                data_path: request.data_path.clone(),
                instruments: request.instruments.clone(),
                status: RequestStatus::Stored,
                error_message: None,
            },
        );
        Ok(id)
    }

    fn request(&self, id: RequestId) -> Result<Option<VerificationRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id.get()).cloned())
    }

    fn attach_request_instruments(
        &self,
        id: RequestId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let known: BTreeSet<InstrumentId> = instruments
            .iter()
            .copied()
            .filter(|instrument| inner.instruments.contains_key(&instrument.get()))
            .collect();
        let request = inner
            .requests
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
        let attached = known.len();
        request.instruments = known;
        Ok(attached)
    }

    fn set_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let request = inner
            .requests
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
        request.status = status;
        request.error_message = error_message.map(str::to_string);
        Ok(())
    }

    fn upsert_request_result(&self, result: &RequestResult) -> Result<(), StoreError> {
        self.lock()?.request_results.insert(
            (result.request_id.get(), result.instrument_id.get()),
            result.clone(),
        );
        Ok(())
    }

    fn request_result(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<Option<RequestResult>, StoreError> {
        Ok(self
            .lock()?
            .request_results
            .get(&(request_id.get(), instrument_id.get()))
            .cloned())
    }

    fn try_begin_summary(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let result = inner
            .request_results
            .get_mut(&(request_id.get(), instrument_id.get()))
            .ok_or_else(|| {
                StoreError::NotFound(format!("result {request_id}/{instrument_id}"))
            })?;
        if result.status == ResultStatus::Pending {
            result.status = ResultStatus::Processing;
            return Ok(true);
        }
        Ok(false)
    }

    fn insert_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (result.request_id.get(), result.provider_id.get());
        if inner.provider_results.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "provider result {}/{} already exists",
                result.request_id, result.provider_id
            )));
        }
        inner.provider_results.insert(key, result.clone());
        Ok(())
    }

    fn provider_result(
        &self,
        request_id: RequestId,
        provider_id: ProviderId,
    ) -> Result<Option<RequestProviderResult>, StoreError> {
        Ok(self
            .lock()?
            .provider_results
            .get(&(request_id.get(), provider_id.get()))
            .cloned())
    }

    fn provider_results(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<RequestProviderResult>, StoreError> {
        Ok(self
            .lock()?
            .provider_results
            .values()
            .filter(|result| result.request_id == request_id)
            .cloned()
            .collect())
    }

    fn update_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (result.request_id.get(), result.provider_id.get());
        let stored = inner.provider_results.get_mut(&key).ok_or_else(|| {
            StoreError::NotFound(format!(
                "provider result {}/{}",
                result.request_id, result.provider_id
            ))
        })?;
        *stored = result.clone();
        Ok(())
    }
}

impl AlertStore for InMemoryTrustStore {
    fn insert_alert(&self, alert: &NewAlert) -> Result<AlertId, StoreError> {
        let mut inner = self.lock()?;
        let id = alloc(&mut inner.next_alert, AlertId::from_raw)?;
        inner.alerts.insert(
            id.get(),
            Alert {
                id,
                level: alert.level,
                status: AlertStatus::Stored,
                institution_id: alert.institution_id,
                learner_id: alert.learner_id,
                activity_id: alert.activity_id,
                session_id: alert.session_id,
                instruments: BTreeSet::new(),
                raised_by: alert.raised_by.clone(),
                data: alert.data.clone(),
                error_message: None,
                raised_at: alert.raised_at,
            },
        );
        Ok(id)
    }

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError> {
        Ok(self.lock()?.alerts.get(&id.get()).cloned())
    }

    fn attach_alert_instruments(
        &self,
        id: AlertId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let known: BTreeSet<InstrumentId> = instruments
            .iter()
            .copied()
            .filter(|instrument| inner.instruments.contains_key(&instrument.get()))
            .collect();
        let alert = inner
            .alerts
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        let attached = known.len();
        alert.instruments = known;
        Ok(attached)
    }

    fn set_alert_status(
        &self,
        id: AlertId,
        status: AlertStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let alert = inner
            .alerts
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        alert.status = status;
        alert.error_message = error_message.map(str::to_string);
        Ok(())
    }
}

impl WebhookStore for InMemoryTrustStore {
    fn enabled_clients(&self) -> Result<Vec<WebhookClient>, StoreError> {
        Ok(self
            .lock()?
            .webhook_clients
            .values()
            .filter(|client| client.enabled)
            .cloned()
            .collect())
    }

    fn insert_message(
        &self,
        message: &NewWebhookMessage,
    ) -> Result<WebhookMessageId, StoreError> {
        let mut inner = self.lock()?;
        let id = alloc(&mut inner.next_message, WebhookMessageId::from_raw)?;
        inner.webhook_messages.insert(
            id.get(),
            WebhookMessage {
                id,
                client_id: message.client_id,
                external_id: message.external_id.clone(),
                body: message.body.clone(),
                status: WebhookStatus::Created,
                error_message: None,
                received_at: message.received_at,
            },
        );
        Ok(id)
    }

    fn webhook_message(
        &self,
        id: WebhookMessageId,
    ) -> Result<Option<WebhookMessage>, StoreError> {
        Ok(self.lock()?.webhook_messages.get(&id.get()).cloned())
    }

    fn set_message_status(
        &self,
        id: WebhookMessageId,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let message = inner
            .webhook_messages
            .get_mut(&id.get())
            .ok_or_else(|| StoreError::NotFound(format!("webhook message {id}")))?;
        message.status = status;
        message.error_message = error_message.map(str::to_string);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Blob Store
// ============================================================================

/// In-memory blob store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBlobStore {
    /// Blob map protected by a mutex.
    blobs: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    /// Creates an empty in-memory blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the blob map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, BlobError> {
        self.blobs
            .lock()
            .map_err(|_| BlobError::Io("blob store mutex poisoned".to_string()))
    }
}

impl BlobStore for InMemoryBlobStore {
    fn save(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        if path.is_empty() {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        self.lock()?.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        self.lock()?
            .get(path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    fn delete(&self, path: &str) -> Result<(), BlobError> {
        self.lock()?.remove(path);
        Ok(())
    }
}

// ============================================================================
// SECTION: Recording Scheduler
// ============================================================================

/// Scheduler that records every task for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingScheduler {
    /// Recorded tasks in scheduling order, protected by a mutex.
    tasks: Arc<Mutex<Vec<TaskRequest>>>,
}

impl RecordingScheduler {
    /// Creates an empty recording scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every recorded task in scheduling order.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when the scheduler lock is poisoned.
    pub fn scheduled(&self) -> Result<Vec<TaskRequest>, ScheduleError> {
        Ok(self
            .tasks
            .lock()
            .map_err(|_| ScheduleError::Transport("scheduler mutex poisoned".to_string()))?
            .clone())
    }

    /// Removes and returns every recorded task in scheduling order.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] when the scheduler lock is poisoned.
    pub fn drain(&self) -> Result<Vec<TaskRequest>, ScheduleError> {
        let mut guard = self
            .tasks
            .lock()
            .map_err(|_| ScheduleError::Transport("scheduler mutex poisoned".to_string()))?;
        Ok(std::mem::take(&mut *guard))
    }
}

impl TaskScheduler for RecordingScheduler {
    fn schedule(&self, request: &TaskRequest) -> Result<(), ScheduleError> {
        self.tasks
            .lock()
            .map_err(|_| ScheduleError::Transport("scheduler mutex poisoned".to_string()))?
            .push(request.clone());
        Ok(())
    }
}
