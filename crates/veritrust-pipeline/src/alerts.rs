// crates/veritrust-pipeline/src/alerts.rs
// ============================================================================
// Module: Veritrust Alert Pipeline
// Description: Alert ingestion raised by instruments and platform modules.
// Purpose: Validate, persist, and notify alerts through the alert queue.
// Dependencies: crate::{artifacts, error, routing}, veritrust-core, serde_json
// ============================================================================

//! ## Overview
//! `create_alert` gates on the severity label and the learner, stores the
//! alert, then attaches the claimed instrument set. A short attach count
//! invalidates the alert with an `.error` sidecar and a non-retryable
//! rejection, mirroring the enrolment sample's strict instrument invariant.
//! A stored alert leaves a `.valid` sidecar naming its id and a notification
//! task on the alert queue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;

use veritrust_core::AlertLevel;
use veritrust_core::AlertStatus;
use veritrust_core::Timestamp;
use veritrust_core::core::identifiers::ActivityId;
use veritrust_core::core::identifiers::AlertId;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::interfaces::BlobStore;
use veritrust_core::interfaces::NewAlert;
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
// SECTION: Input
// ============================================================================

/// One alert submission from a raising module.
#[derive(Debug, Clone)]
pub struct AlertInput {
    /// Severity label, parsed case-insensitively.
    pub level_label: String,
    /// Learner the alert concerns.
    pub learner_id: Option<LearnerId>,
    /// Activity the alert concerns, when any.
    pub activity_id: Option<ActivityId>,
    /// Assessment session the alert was raised in, when any.
    pub session_id: Option<u64>,
    /// Acronym of the raising module.
    pub raised_by: String,
    /// Instruments the alert concerns.
    pub instruments: BTreeSet<InstrumentId>,
    /// Structured alert payload.
    pub data: Value,
    /// Blob path of the alert evidence, anchor for sidecars.
    pub data_path: String,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Alert task handlers.
pub struct AlertTasks {
    /// Persistence backend.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Blob backend for sidecars.
    blobs: Arc<dyn BlobStore + Send + Sync>,
    /// Task transport.
    scheduler: Arc<dyn TaskScheduler + Send + Sync>,
    /// Queue routing table.
    router: QueueRouter,
    /// Transport retry budget.
    retry: RetryPolicy,
}

impl AlertTasks {
    /// Creates the alert service over its collaborators.
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

    /// Stores one alert, attaches its instrument set, and schedules its
    /// notification.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`TaskError::Reject`] for unparseable levels,
    /// unresolvable learners, and instrument mismatches; infrastructure
    /// errors otherwise.
    pub fn create_alert(&self, input: &AlertInput, now: Timestamp) -> Result<AlertId, TaskError> {
        let level = AlertLevel::from_label(&input.level_label)
            .ok_or_else(|| TaskError::reject(format!("unknown alert level {}", input.level_label)))?;
        let learner_id = input
            .learner_id
            .ok_or_else(|| TaskError::reject("alert names no learner"))?;
        let learner = self
            .store
            .learner(learner_id)?
            .ok_or_else(|| TaskError::reject(format!("unknown learner {learner_id}")))?;

        let alert_id = self.store.insert_alert(&NewAlert {
            level,
            institution_id: Some(learner.institution_id),
            learner_id: Some(learner_id),
            activity_id: input.activity_id,
            session_id: input.session_id,
            instruments: input.instruments.clone(),
            raised_by: input.raised_by.clone(),
            data: input.data.clone(),
            raised_at: now,
        })?;

        let attached = self
            .store
            .attach_alert_instruments(alert_id, &input.instruments)?;
        if attached != input.instruments.len() {
            let message = format!(
                "instrument mismatch: requested {}, attached {attached}",
                input.instruments.len()
            );
            write_sidecar(
                self.blobs.as_ref(),
                &input.data_path,
                SidecarKind::Error,
                &json!({ "alert": alert_id.get(), "reason": message }),
            )?;
            self.store
                .set_alert_status(alert_id, AlertStatus::Error, Some(&message))?;
            return Err(TaskError::reject(message));
        }

        write_sidecar(
            self.blobs.as_ref(),
            &input.data_path,
            SidecarKind::Valid,
            &json!({ "alert_id": alert_id.get() }),
        )?;

        let kind = TaskKind::NotifyAlert { alert_id };
        let queue = self
            .router
            .fixed_queue(&kind)
            .ok_or_else(|| TaskError::reject("alert notification has no fixed queue"))?;
        self.scheduler.schedule(&TaskRequest {
            kind,
            queue,
            countdown_seconds: 0,
            max_retries: self.retry.max_retries,
        })?;
        Ok(alert_id)
    }
}
