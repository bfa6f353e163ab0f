// crates/veritrust-pipeline/src/enrolment.rs
// ============================================================================
// Module: Veritrust Enrolment Pipeline
// Description: Sample intake, validation fan-out, summary, and model feed.
// Purpose: Drive enrolment samples from storage to learner model updates.
// Dependencies: crate::{artifacts, error, routing}, veritrust-core, serde_json
// ============================================================================

//! ## Overview
//! Enrolment moves one sample through four asynchronous stages: `create_sample`
//! gates on consent before persisting anything and attaches instruments,
//! `validate_request` fans out one validation row per validator,
//! `create_validation_summary` polls the rows with linear backoff and folds
//! them into the sample status, and `enrol_learner` feeds the validated
//! sample into every serving provider's model. Intake gate failures reject
//! non-retryably; later domain failures land on the sample row and its
//! sidecar.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use veritrust_core::MODEL_LOCK_MAX_AGE_SECONDS;
use veritrust_core::SampleStatus;
use veritrust_core::Timestamp;
use veritrust_core::ValidationStatus;
use veritrust_core::core::EnrolmentModel;
use veritrust_core::core::EnrolmentSample;
use veritrust_core::core::SampleValidation;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::SampleId;
use veritrust_core::core::identifiers::TaskId;
use veritrust_core::interfaces::BlobStore;
use veritrust_core::interfaces::NewSample;
use veritrust_core::interfaces::NewValidation;
use veritrust_core::interfaces::TaskKind;
use veritrust_core::interfaces::TaskRequest;
use veritrust_core::interfaces::TaskScheduler;
use veritrust_core::interfaces::TrustStore;

use crate::artifacts::SidecarKind;
use crate::artifacts::write_sidecar;
use crate::error::TaskError;
use crate::routing::QueueRouter;
use crate::routing::RetryPolicy;

// ============================================================================
// SECTION: Service
// ============================================================================

/// Enrolment task handlers.
pub struct EnrolmentTasks {
    /// Persistence backend.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Blob backend for sample data and sidecars.
    blobs: Arc<dyn BlobStore + Send + Sync>,
    /// Task transport.
    scheduler: Arc<dyn TaskScheduler + Send + Sync>,
    /// Queue routing table.
    router: QueueRouter,
    /// Summary polling backoff.
    retry: RetryPolicy,
}

impl EnrolmentTasks {
    /// Creates the enrolment service over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn TrustStore + Send + Sync>,
        blobs: Arc<dyn BlobStore + Send + Sync>,
        scheduler: Arc<dyn TaskScheduler + Send + Sync>,
        router: QueueRouter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            blobs,
            scheduler,
            router,
            retry,
        }
    }

    /// Accepts a submitted capture and schedules its intake task.
    ///
    /// Nothing is persisted here; the intake gates decide whether a sample
    /// row exists at all.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] when the transport fails.
    pub fn submit_sample(&self, draft: &NewSample) -> Result<(), TaskError> {
        self.schedule_fixed(
            TaskKind::CreateSample {
                draft: draft.clone(),
            },
            0,
        )
    }

    /// Intake stage: consent gate, persistence, instrument attachment,
    /// validation chain.
    ///
    /// The consent gate runs before anything is written: an invalid consent
    /// deletes the capture blob and rejects without persisting a row.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`TaskError::Reject`] when the learner is
    /// unknown, consent is not valid, or the instrument set does not attach
    /// in full; infrastructure errors otherwise.
    pub fn create_sample(&self, draft: &NewSample) -> Result<SampleId, TaskError> {
        let Some(learner) = self.store.learner(draft.learner_id)? else {
            write_sidecar(
                self.blobs.as_ref(),
                &draft.data_path,
                SidecarKind::Error,
                &json!({ "reason": "invalid learner" }),
            )?;
            return Err(TaskError::reject(format!(
                "unknown learner {}",
                draft.learner_id
            )));
        };

        if !learner.consent.is_valid() {
            self.blobs.delete(&draft.data_path)?;
            return Err(TaskError::reject("missing informed consent"));
        }

        let sample_id = self.store.insert_sample(draft)?;
        let attached = self
            .store
            .attach_sample_instruments(sample_id, &draft.instruments)?;
        if attached != draft.instruments.len() {
            let message = format!(
                "instrument mismatch: requested {}, attached {attached}",
                draft.instruments.len()
            );
            write_sidecar(
                self.blobs.as_ref(),
                &draft.data_path,
                SidecarKind::Error,
                &json!({ "sample": sample_id.get(), "reason": message }),
            )?;
            self.store
                .set_sample_status(sample_id, SampleStatus::Error, Some(&message))?;
            return Err(TaskError::reject(message));
        }

        self.schedule_fixed(TaskKind::ValidateRequest { sample_id }, 0)?;
        Ok(sample_id)
    }

    /// Validation fan-out: one row and one provider task per validator.
    ///
    /// Validator lookup is all-or-nothing: one instrument without a validator
    /// fails the whole sample before anything is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the sample does not exist, and
    /// infrastructure errors otherwise.
    pub fn validate_request(&self, sample_id: SampleId) -> Result<(), TaskError> {
        let sample = self
            .store
            .sample(sample_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown sample {sample_id}")))?;

        let mut dispatch = Vec::new();
        for instrument_id in &sample.instruments {
            let validators = self.store.validators_for_instrument(*instrument_id)?;
            if validators.is_empty() {
                let message = format!("MISSING_PROVIDER: instrument {instrument_id}");
                write_sidecar(
                    self.blobs.as_ref(),
                    &sample.data_path,
                    SidecarKind::Error,
                    &json!({ "sample": sample_id.get(), "reason": message }),
                )?;
                self.store.set_sample_status(
                    sample_id,
                    SampleStatus::MissingValidator,
                    Some(&message),
                )?;
                return Ok(());
            }
            dispatch.extend(validators);
        }

        for validator in dispatch {
            let validation_id = self.store.insert_validation(&NewValidation {
                sample_id,
                provider_id: validator.id,
            })?;
            let kind = TaskKind::ValidateSample {
                sample_id,
                validation_id,
                provider_id: validator.id,
            };
            self.scheduler.schedule(&TaskRequest {
                queue: self.router.queue_for(&kind, &validator.queue),
                kind,
                countdown_seconds: 0,
                max_retries: self.retry.max_retries,
            })?;
        }

        self.schedule_fixed(
            TaskKind::CreateValidationSummary {
                sample_id,
                retry_count: 0,
            },
            self.retry.backoff_seconds(0),
        )
    }

    /// Summary stage: fold validator verdicts into the sample status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the sample does not exist, and
    /// infrastructure errors otherwise.
    pub fn create_validation_summary(
        &self,
        sample_id: SampleId,
        retry_count: u32,
    ) -> Result<(), TaskError> {
        let sample = self
            .store
            .sample(sample_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown sample {sample_id}")))?;
        let validations = self.store.validations_for_sample(sample_id)?;

        let pending: Vec<&SampleValidation> = validations
            .iter()
            .filter(|validation| validation.status == ValidationStatus::Pending)
            .collect();
        if !pending.is_empty() {
            if self.retry.exhausted(retry_count) {
                for validation in &pending {
                    self.store.record_validation(
                        validation.id,
                        ValidationStatus::Timeout,
                        None,
                        None,
                        Some("validator never answered"),
                    )?;
                }
                let refreshed = self.store.validations_for_sample(sample_id)?;
                write_sidecar(
                    self.blobs.as_ref(),
                    &sample.data_path,
                    SidecarKind::Timeout,
                    &summary_payload(&sample, &refreshed),
                )?;
                self.store.set_sample_status(
                    sample_id,
                    SampleStatus::Timeout,
                    Some("validation timed out"),
                )?;
                return Ok(());
            }
            return self.schedule_fixed(
                TaskKind::CreateValidationSummary {
                    sample_id,
                    retry_count: retry_count + 1,
                },
                self.retry.backoff_seconds(retry_count),
            );
        }

        let valid = validations
            .iter()
            .all(|validation| validation.status.is_acceptable());
        let payload = summary_payload(&sample, &validations);
        if valid {
            write_sidecar(
                self.blobs.as_ref(),
                &sample.data_path,
                SidecarKind::Valid,
                &payload,
            )?;
            self.store
                .set_sample_status(sample_id, SampleStatus::Valid, None)?;
            self.schedule_fixed(
                TaskKind::EnrolLearner {
                    learner_id: sample.learner_id,
                    sample_id,
                },
                0,
            )?;
        } else {
            write_sidecar(
                self.blobs.as_ref(),
                &sample.data_path,
                SidecarKind::Error,
                &payload,
            )?;
            self.store.set_sample_status(
                sample_id,
                SampleStatus::Error,
                Some("one or more validators rejected the sample"),
            )?;
        }
        Ok(())
    }

    /// Enrolment fan-out: one provider task per instrument and provider.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the sample does not exist, and
    /// infrastructure errors otherwise.
    pub fn enrol_learner(
        &self,
        learner_id: LearnerId,
        sample_id: SampleId,
    ) -> Result<(), TaskError> {
        let sample = self
            .store
            .sample(sample_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown sample {sample_id}")))?;

        for instrument_id in &sample.instruments {
            for provider in self.store.providers_for_instrument(*instrument_id)? {
                let kind = TaskKind::ProviderEnrolLearner {
                    learner_id,
                    sample_id,
                    provider_id: provider.id,
                };
                self.scheduler.schedule(&TaskRequest {
                    queue: self.router.queue_for(&kind, &provider.queue),
                    kind,
                    countdown_seconds: 0,
                    max_retries: self.retry.max_retries,
                })?;
            }
        }
        Ok(())
    }

    /// Claims the enrolment model lock for a worker task.
    ///
    /// The claim is an atomic compare-and-swap in the store: it succeeds when
    /// the lock is free, already held by `task`, or older than the staleness
    /// window.
    ///
    /// # Errors
    ///
    /// Returns a retryable [`TaskError::Reject`] while another live task
    /// holds the lock.
    pub fn claim_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
        now: Timestamp,
    ) -> Result<EnrolmentModel, TaskError> {
        self.store
            .claim_model(
                learner_id,
                provider_id,
                task,
                now,
                MODEL_LOCK_MAX_AGE_SECONDS,
            )
            .map_err(|err| match err {
                veritrust_core::StoreError::Conflict(reason) => {
                    TaskError::reject_retryable(reason)
                }
                other => TaskError::Store(other),
            })
    }

    /// Stores updated model content and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] when the model row is missing or the backend
    /// fails.
    pub fn update_model(
        &self,
        model: &EnrolmentModel,
        task: &TaskId,
    ) -> Result<(), TaskError> {
        self.store.save_model(model)?;
        self.store
            .release_model(model.learner_id, model.provider_id, task)?;
        Ok(())
    }

    /// Mints a fresh worker task identifier.
    #[must_use]
    pub fn fresh_task_id() -> TaskId {
        TaskId::from(uuid::Uuid::new_v4().to_string())
    }

    /// Schedules a fixed-queue task.
    fn schedule_fixed(&self, kind: TaskKind, countdown_seconds: u64) -> Result<(), TaskError> {
        let queue = self
            .router
            .fixed_queue(&kind)
            .ok_or_else(|| TaskError::reject(format!("{} has no fixed queue", kind.name())))?;
        self.scheduler.schedule(&TaskRequest {
            kind,
            queue,
            countdown_seconds,
            max_retries: self.retry.max_retries,
        })?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Summary Payload
// ============================================================================

/// Builds the per-provider summary JSON written on terminal branches.
fn summary_payload(sample: &EnrolmentSample, validations: &[SampleValidation]) -> Value {
    let rows: Vec<Value> = validations
        .iter()
        .map(|validation| {
            json!({
                "provider": validation.provider_id.get(),
                "status": validation.status.label(),
                "contribution": validation.contribution,
                "info_path": validation.info_path,
                "error": validation.error_message,
            })
        })
        .collect();
    json!({
        "sample": sample.id.get(),
        "learner": sample.learner_id.get(),
        "validations": rows,
    })
}
