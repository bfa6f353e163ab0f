// crates/veritrust-pipeline/src/lib.rs
// ============================================================================
// Module: Veritrust Pipeline Library
// Description: Asynchronous enrolment, verification, and alert task services.
// Purpose: Drive domain state machines through queued background tasks.
// Dependencies: veritrust-core, serde_json, uuid
// ============================================================================

//! ## Overview
//! Veritrust Pipeline owns the background work of the platform: enrolment
//! samples moving through validation into learner models, verification
//! requests fanning out to providers and folding back into summaries, and
//! alert intake. Services hold their collaborators behind traits, route
//! tasks through a small queue topology, and retry transient work with a
//! linear backoff. Domain failures land on the owning row and its sidecar
//! artefact; only unresolvable references reject a task outright.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod alerts;
pub mod artifacts;
pub mod enrolment;
pub mod error;
pub mod routing;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use alerts::AlertInput;
pub use alerts::AlertTasks;
pub use artifacts::SidecarKind;
pub use artifacts::audit_path;
pub use artifacts::sidecar_path;
pub use artifacts::write_sidecar;
pub use enrolment::EnrolmentTasks;
pub use error::TaskError;
pub use routing::QueueRouter;
pub use routing::QueueTopology;
pub use routing::RetryPolicy;
pub use routing::Route;
pub use verification::ProviderOutcome;
pub use verification::VerificationTasks;
