// crates/veritrust-pipeline/src/verification.rs
// ============================================================================
// Module: Veritrust Verification Pipeline
// Description: Request intake, provider fan-out, results, and summaries.
// Purpose: Drive verification requests from storage to aggregated results.
// Dependencies: crate::{artifacts, error, routing}, veritrust-core, serde_json
// ============================================================================

//! ## Overview
//! Verification mirrors enrolment intake and then fans out per provider:
//! `create_request` gates on consent and attaches instruments,
//! `verify_request` creates one aggregate row per instrument and one row per
//! provider, `update_provider_result` lands provider answers and runs the
//! completion check, and `create_verification_summary` folds provider rows
//! into the instrument aggregate and the request's global status. The
//! completion check is state-derived and idempotent: it re-reads the rows and
//! wins the summary transition at most once per instrument.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use veritrust_core::RequestProviderResult;
use veritrust_core::RequestResult;
use veritrust_core::RequestStatus;
use veritrust_core::ResultCode;
use veritrust_core::ResultStatus;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::RequestId;
use veritrust_core::interfaces::BlobStore;
use veritrust_core::interfaces::NewRequest;
use veritrust_core::interfaces::TaskKind;
use veritrust_core::interfaces::TaskRequest;
use veritrust_core::interfaces::TaskScheduler;
use veritrust_core::interfaces::TrustStore;

use crate::artifacts::SidecarKind;
use crate::artifacts::audit_path;
use crate::artifacts::write_sidecar;
use crate::error::TaskError;
use crate::routing::QueueRouter;
use crate::routing::RetryPolicy;

// ============================================================================
// SECTION: Provider Outcome
// ============================================================================

/// One provider answer landing on a result row.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    /// Row status reported by the provider.
    pub status: ResultStatus,
    /// Numeric score, when processed.
    pub result: Option<f64>,
    /// Alert severity, when processed.
    pub code: ResultCode,
    /// Audit payload to persist next to the request data.
    pub audit: Option<Value>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Verification task handlers.
pub struct VerificationTasks {
    /// Persistence backend.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Blob backend for request data, audits, and sidecars.
    blobs: Arc<dyn BlobStore + Send + Sync>,
    /// Task transport.
    scheduler: Arc<dyn TaskScheduler + Send + Sync>,
    /// Queue routing table.
    router: QueueRouter,
    /// Transport retry budget.
    retry: RetryPolicy,
}

impl VerificationTasks {
    /// Creates the verification service over its collaborators.
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

    /// Persists a new request and schedules its intake task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] when the store or transport fails.
    pub fn store_request(&self, draft: &NewRequest) -> Result<RequestId, TaskError> {
        let request_id = self.store.insert_request(draft)?;
        self.schedule_fixed(TaskKind::VerifyRequest { request_id }, 0)?;
        Ok(request_id)
    }

    /// Intake and fan-out: consent gate, instrument attachment, then
    /// aggregate rows per instrument and one row per provider.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the request or its learner does
    /// not exist, and infrastructure errors otherwise. Domain failures are
    /// captured on the request row.
    pub fn verify_request(&self, request_id: RequestId) -> Result<(), TaskError> {
        let request = self
            .store
            .request(request_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown request {request_id}")))?;
        let learner = self
            .store
            .learner(request.learner_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown learner {}", request.learner_id)))?;

        if !learner.consent.is_valid() {
            write_sidecar(
                self.blobs.as_ref(),
                &request.data_path,
                SidecarKind::Error,
                &json!({ "request": request_id.get(), "reason": "missing informed consent" }),
            )?;
            self.blobs.delete(&request.data_path)?;
            self.store.set_request_status(
                request_id,
                RequestStatus::Error,
                Some("missing informed consent"),
            )?;
            return Ok(());
        }

        let requested = request.instruments.clone();
        let attached = self
            .store
            .attach_request_instruments(request_id, &requested)?;
        if attached != requested.len() {
            let message = format!(
                "instrument mismatch: requested {}, attached {attached}",
                requested.len()
            );
            write_sidecar(
                self.blobs.as_ref(),
                &request.data_path,
                SidecarKind::Error,
                &json!({ "request": request_id.get(), "reason": message }),
            )?;
            self.store
                .set_request_status(request_id, RequestStatus::Error, Some(&message))?;
            return Ok(());
        }

        write_sidecar(
            self.blobs.as_ref(),
            &request.data_path,
            SidecarKind::Valid,
            &json!({ "request": request_id.get() }),
        )?;

        let mut dispatched = false;
        let mut missing_provider = false;
        let mut missing_enrolment = false;

        for instrument_id in &request.instruments {
            let instrument = self
                .store
                .instrument(*instrument_id)?
                .ok_or_else(|| TaskError::reject(format!("unknown instrument {instrument_id}")))?;
            let providers = self.store.providers_for_instrument(*instrument_id)?;

            if providers.is_empty() {
                missing_provider = true;
                self.store.upsert_request_result(&RequestResult {
                    request_id,
                    instrument_id: *instrument_id,
                    status: ResultStatus::MissingProvider,
                    result: None,
                    code: ResultCode::Pending,
                })?;
                continue;
            }

            let mut instrument_dispatched = false;
            for provider in providers {
                let analysable = if instrument.requires_enrolment {
                    self.store
                        .model(request.learner_id, provider.id)?
                        .is_some_and(|model| model.can_analyse)
                } else {
                    true
                };
                if !analysable {
                    missing_enrolment = true;
                    self.store.insert_provider_result(&RequestProviderResult {
                        request_id,
                        provider_id: provider.id,
                        status: ResultStatus::MissingEnrolment,
                        result: None,
                        code: ResultCode::Pending,
                        audit_path: None,
                        audit_data: None,
                    })?;
                    continue;
                }
                self.store.insert_provider_result(&RequestProviderResult {
                    request_id,
                    provider_id: provider.id,
                    status: ResultStatus::Pending,
                    result: None,
                    code: ResultCode::Pending,
                    audit_path: None,
                    audit_data: None,
                })?;
                let kind = TaskKind::ProviderVerifyRequest {
                    request_id,
                    provider_id: provider.id,
                };
                self.scheduler.schedule(&TaskRequest {
                    queue: self.router.queue_for(&kind, &provider.queue),
                    kind,
                    countdown_seconds: 0,
                    max_retries: self.retry.max_retries,
                })?;
                instrument_dispatched = true;
                dispatched = true;
            }

            let status = if instrument_dispatched {
                ResultStatus::Pending
            } else {
                ResultStatus::MissingEnrolment
            };
            self.store.upsert_request_result(&RequestResult {
                request_id,
                instrument_id: *instrument_id,
                status,
                result: None,
                code: ResultCode::Pending,
            })?;
        }

        if dispatched {
            return self
                .store
                .set_request_status(request_id, RequestStatus::Scheduled, None)
                .map_err(TaskError::from);
        }
        // Nothing went out; the request is terminal right away.
        let (status, message) = if missing_provider {
            (
                RequestStatus::MissingProvider,
                "no enabled provider for a requested instrument",
            )
        } else if missing_enrolment {
            (
                RequestStatus::Error,
                "no analysable enrolment model for a requested instrument",
            )
        } else {
            (RequestStatus::Error, "no instruments to verify")
        };
        self.store
            .set_request_status(request_id, status, Some(message))?;
        Ok(())
    }

    /// Lands one provider answer and runs the completion check.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the row does not exist, and
    /// infrastructure errors otherwise.
    pub fn update_provider_result(
        &self,
        request_id: RequestId,
        provider_id: ProviderId,
        outcome: &ProviderOutcome,
    ) -> Result<(), TaskError> {
        let request = self
            .store
            .request(request_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown request {request_id}")))?;
        let mut row = self
            .store
            .provider_result(request_id, provider_id)?
            .ok_or_else(|| {
                TaskError::reject(format!(
                    "no result row for request {request_id} and provider {provider_id}"
                ))
            })?;
        let provider = self
            .store
            .provider(provider_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown provider {provider_id}")))?;

        row.status = outcome.status;
        row.result = outcome.result;
        row.code = outcome.code;
        if let Some(audit) = &outcome.audit {
            let path = audit_path(&request.data_path);
            let bytes = serde_json::to_vec(audit)
                .map_err(|err| TaskError::reject(format!("audit payload: {err}")))?;
            self.blobs.save(&path, &bytes)?;
            row.audit_path = Some(path);
            row.audit_data = Some(audit.clone());
        }
        self.store.update_provider_result(&row)?;

        self.completion_check(request_id, provider.instrument_id)
    }

    /// Schedules the instrument summary once no provider row remains open.
    ///
    /// Idempotent by construction: the state is re-derived from rows and the
    /// `Pending -> Processing` aggregate transition is won at most once.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError`] when the backend fails.
    pub fn completion_check(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<(), TaskError> {
        let providers = self.store.providers_for_instrument(instrument_id)?;
        let rows = self.store.provider_results(request_id)?;
        let still_open = rows
            .iter()
            .filter(|row| providers.iter().any(|provider| provider.id == row.provider_id))
            .any(|row| row.status.is_open());
        if still_open {
            return Ok(());
        }
        if self.store.try_begin_summary(request_id, instrument_id)? {
            self.schedule_fixed(
                TaskKind::CreateVerificationSummary {
                    request_id,
                    instrument_id,
                },
                0,
            )?;
        }
        Ok(())
    }

    /// Aggregation stage: fold provider rows into the instrument aggregate
    /// and re-derive the request's global status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Reject`] when the request does not exist, and
    /// infrastructure errors otherwise.
    pub fn create_verification_summary(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<(), TaskError> {
        let request = self
            .store
            .request(request_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown request {request_id}")))?;
        let providers = self.store.providers_for_instrument(instrument_id)?;
        let all_rows = self.store.provider_results(request_id)?;
        let rows: Vec<&RequestProviderResult> = all_rows
            .iter()
            .filter(|row| providers.iter().any(|provider| provider.id == row.provider_id))
            .collect();

        if rows.iter().any(|row| row.status.is_open()) {
            // A provider reopened between the check and the summary.
            self.store.upsert_request_result(&RequestResult {
                request_id,
                instrument_id,
                status: ResultStatus::Pending,
                result: None,
                code: ResultCode::Pending,
            })?;
            return Ok(());
        }

        let status = rows
            .iter()
            .map(|row| row.status.code())
            .max()
            .and_then(ResultStatus::from_code)
            .unwrap_or(ResultStatus::MissingProvider);
        let result = rows
            .iter()
            .filter(|row| row.status == ResultStatus::Processed)
            .filter_map(|row| row.result)
            .fold(None, |best: Option<f64>, value| {
                Some(best.map_or(value, |best| best.max(value)))
            });
        let code = rows
            .iter()
            .map(|row| row.code)
            .max()
            .unwrap_or(ResultCode::Pending);
        self.store.upsert_request_result(&RequestResult {
            request_id,
            instrument_id,
            status,
            result,
            code,
        })?;

        let band = all_rows.iter().map(|row| row.status.code());
        let global = match (band.clone().min(), band.max()) {
            (Some(min), Some(max)) => {
                match (ResultStatus::from_code(min), ResultStatus::from_code(max)) {
                    (Some(min), Some(max)) => RequestStatus::from_provider_band(min, max),
                    _ => RequestStatus::Error,
                }
            }
            _ => RequestStatus::Error,
        };
        self.store.set_request_status(request_id, global, None)?;

        let terminal = !matches!(global, RequestStatus::Scheduled | RequestStatus::Processing);
        if terminal && let Some(activity_id) = request.activity_id {
            self.schedule_fixed(
                TaskKind::UpdateActivityReport {
                    learner_id: request.learner_id,
                    activity_id,
                },
                0,
            )?;
        }
        Ok(())
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
