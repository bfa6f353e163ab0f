// crates/veritrust-auth/src/audit.rs
// ============================================================================
// Module: Access Audit
// Description: Serializable access decisions and a pluggable audit sink.
// Purpose: Surface deterministic allow/deny outcomes to host audit logs.
// Dependencies: veritrust-core, serde
// ============================================================================

//! ## Overview
//! Every authorization check can emit one [`AccessEvent`] describing the
//! caller, the scoped resource, and the outcome. Sinks are pluggable and
//! must avoid side effects beyond recording; the decision itself never
//! depends on the sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use veritrust_core::ActorKind;
use veritrust_core::TrustStore;

use crate::permissions::AccessMethod;
use crate::permissions::AccessPolicy;
use crate::permissions::AccessRequest;
use crate::permissions::RouteScope;

// ============================================================================
// SECTION: Event
// ============================================================================

/// One recorded authorization outcome.
///
/// # Invariants
/// - `allowed` is the authoritative decision for the request.
/// - `reason` is a stable label, not free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Whether access was allowed.
    pub allowed: bool,
    /// Stable outcome label.
    pub reason: AccessReason,
    /// Kind of the acting caller.
    pub actor_kind: ActorKind,
    /// Access method of the operation.
    pub method: AccessMethod,
    /// Scope the operation was bound to.
    pub scope: RouteScope,
}

/// Stable outcome labels for audit logs.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// The policy allowed the request.
    PolicyAllowed,
    /// The policy denied the request.
    PolicyDenied,
    /// A backing lookup failed; failures deny.
    LookupFailed,
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Destination for recorded access events.
pub trait AccessAuditSink: Send + Sync {
    /// Records one event. Implementations must not influence decisions.
    fn record(&self, event: &AccessEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AccessAuditSink for NoopAuditSink {
    fn record(&self, _event: &AccessEvent) {}
}

/// Sink that keeps events in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AccessEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AccessEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AccessAuditSink for RecordingAuditSink {
    fn record(&self, event: &AccessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Audited Evaluation
// ============================================================================

/// Evaluates a policy and records the outcome on the sink.
///
/// Lookup failures deny and are labeled as such; the returned decision is
/// identical to [`crate::permissions::evaluate`].
#[must_use]
pub fn evaluate_audited(
    policy: &dyn AccessPolicy,
    request: &AccessRequest<'_>,
    store: &dyn TrustStore,
    sink: &dyn AccessAuditSink,
) -> bool {
    let (allowed, reason) = match policy.allows(request, store) {
        Ok(true) => (true, AccessReason::PolicyAllowed),
        Ok(false) => (false, AccessReason::PolicyDenied),
        Err(_) => (false, AccessReason::LookupFailed),
    };
    sink.record(&AccessEvent {
        allowed,
        reason,
        actor_kind: request.identity.actor.kind(),
        method: request.method,
        scope: request.scope,
    });
    allowed
}
