// crates/veritrust-pipeline/src/routing.rs
// ============================================================================
// Module: Veritrust Queue Routing
// Description: Task-to-queue routing table and retry backoff policy.
// Purpose: Keep queue assignment an explicit, testable contract.
// Dependencies: veritrust-core, serde
// ============================================================================

//! ## Overview
//! Every task kind routes either to a fixed platform queue or to the queue
//! owned by the provider the task is bound to. The table is total: adding a
//! task kind without a route is a compile error. Retry backoff for summary
//! polling is linear with a hard attempt cap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use veritrust_core::core::identifiers::QueueName;
use veritrust_core::interfaces::TaskKind;

// ============================================================================
// SECTION: Default Queue Names
// ============================================================================

/// Queue receiving sample storage tasks.
pub const QUEUE_ENROLMENT_STORAGE: &str = "enrolment-storage";

/// Queue receiving validation fan-out and summary tasks.
pub const QUEUE_ENROLMENT_VALIDATION: &str = "enrolment-validation";

/// Queue receiving learner enrolment fan-out tasks.
pub const QUEUE_ENROLMENT: &str = "enrolment";

/// Queue receiving verification tasks.
pub const QUEUE_VERIFICATION: &str = "verification";

/// Queue receiving alert tasks.
pub const QUEUE_ALERTS: &str = "alerts";

/// Queue receiving reporting tasks.
pub const QUEUE_REPORTING: &str = "reporting";

// ============================================================================
// SECTION: Topology
// ============================================================================

/// Named platform queues, overridable per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTopology {
    /// Sample storage queue.
    pub storage: QueueName,
    /// Validation queue.
    pub validation: QueueName,
    /// Enrolment queue.
    pub enrolment: QueueName,
    /// Verification queue.
    pub verification: QueueName,
    /// Alerts queue.
    pub alerts: QueueName,
    /// Reporting queue.
    pub reporting: QueueName,
}

impl Default for QueueTopology {
    fn default() -> Self {
        Self {
            storage: QueueName::from(QUEUE_ENROLMENT_STORAGE),
            validation: QueueName::from(QUEUE_ENROLMENT_VALIDATION),
            enrolment: QueueName::from(QUEUE_ENROLMENT),
            verification: QueueName::from(QUEUE_VERIFICATION),
            alerts: QueueName::from(QUEUE_ALERTS),
            reporting: QueueName::from(QUEUE_REPORTING),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Destination of a routed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A fixed platform queue.
    Fixed(QueueName),
    /// The queue owned by the provider the task is bound to.
    ProviderQueue,
}

/// Routes task kinds onto queues.
#[derive(Debug, Clone, Default)]
pub struct QueueRouter {
    /// Platform queue names.
    topology: QueueTopology,
}

impl QueueRouter {
    /// Creates a router over a queue topology.
    #[must_use]
    pub fn new(topology: QueueTopology) -> Self {
        Self { topology }
    }

    /// Returns the route for a task kind.
    #[must_use]
    pub fn route(&self, kind: &TaskKind) -> Route {
        match kind {
            TaskKind::CreateSample { .. } => Route::Fixed(self.topology.storage.clone()),
            TaskKind::ValidateRequest { .. } | TaskKind::CreateValidationSummary { .. } => {
                Route::Fixed(self.topology.validation.clone())
            }
            TaskKind::EnrolLearner { .. } => Route::Fixed(self.topology.enrolment.clone()),
            TaskKind::VerifyRequest { .. } | TaskKind::CreateVerificationSummary { .. } => {
                Route::Fixed(self.topology.verification.clone())
            }
            TaskKind::NotifyAlert { .. } => Route::Fixed(self.topology.alerts.clone()),
            TaskKind::UpdateActivityReport { .. } => {
                Route::Fixed(self.topology.reporting.clone())
            }
            TaskKind::ValidateSample { .. }
            | TaskKind::ProviderEnrolLearner { .. }
            | TaskKind::ProviderVerifyRequest { .. } => Route::ProviderQueue,
        }
    }

    /// Resolves the destination queue, supplying the provider queue for
    /// provider-bound kinds.
    #[must_use]
    pub fn queue_for(&self, kind: &TaskKind, provider_queue: &QueueName) -> QueueName {
        match self.route(kind) {
            Route::Fixed(queue) => queue,
            Route::ProviderQueue => provider_queue.clone(),
        }
    }

    /// Returns the fixed queue for kinds that never route to a provider.
    #[must_use]
    pub fn fixed_queue(&self, kind: &TaskKind) -> Option<QueueName> {
        match self.route(kind) {
            Route::Fixed(queue) => Some(queue),
            Route::ProviderQueue => None,
        }
    }
}

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Linear backoff with a hard attempt cap for summary polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Base delay in seconds.
    pub base_seconds: u64,
    /// Additional delay per prior attempt, in seconds.
    pub step_seconds: u64,
    /// Maximum number of retries before giving up.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_seconds: 15,
            step_seconds: 90,
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before attempt `retry_count + 1`.
    #[must_use]
    pub const fn backoff_seconds(&self, retry_count: u32) -> u64 {
        self.base_seconds + self.step_seconds * retry_count as u64
    }

    /// Returns true once the retry budget is spent.
    #[must_use]
    pub const fn exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }
}
