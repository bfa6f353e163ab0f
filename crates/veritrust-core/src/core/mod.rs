// crates/veritrust-core/src/core/mod.rs
// ============================================================================
// Module: Veritrust Core Domain
// Description: Domain entities, identifiers, and status tables for Veritrust.
// Purpose: Provide the deterministic domain model shared by all components.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The core domain model is deterministic and side-effect free. Entities carry
//! stable numeric status codes, all times are caller-supplied, and every
//! collection is ordered so serialized output is reproducible.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actors;
pub mod alerts;
pub mod enrolment;
pub mod identifiers;
pub mod time;
pub mod verification;
pub mod webhooks;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actors::Actor;
pub use actors::ActorKind;
pub use actors::ConsentStatus;
pub use actors::CourseRecord;
pub use actors::InstrumentRecord;
pub use actors::LearnerRecord;
pub use actors::ProviderRecord;
pub use actors::RoleFlags;
pub use actors::UserRecord;
pub use actors::VleRecord;
pub use alerts::Alert;
pub use alerts::AlertLevel;
pub use alerts::AlertStatus;
pub use enrolment::EnrolmentModel;
pub use enrolment::EnrolmentSample;
pub use enrolment::MODEL_LOCK_MAX_AGE_SECONDS;
pub use enrolment::SampleStatus;
pub use enrolment::SampleValidation;
pub use enrolment::ValidationStatus;
pub use identifiers::ActivityId;
pub use identifiers::AlertId;
pub use identifiers::CourseId;
pub use identifiers::InstitutionId;
pub use identifiers::InstrumentId;
pub use identifiers::LearnerId;
pub use identifiers::ProviderId;
pub use identifiers::QueueName;
pub use identifiers::RequestId;
pub use identifiers::SampleId;
pub use identifiers::SubjectId;
pub use identifiers::TaskId;
pub use identifiers::UserId;
pub use identifiers::ValidationId;
pub use identifiers::VleId;
pub use identifiers::WebhookClientId;
pub use identifiers::WebhookMessageId;
pub use time::Timestamp;
pub use verification::RequestProviderResult;
pub use verification::RequestResult;
pub use verification::RequestStatus;
pub use verification::ResultCode;
pub use verification::ResultStatus;
pub use verification::VerificationRequest;
pub use webhooks::WebhookClient;
pub use webhooks::WebhookMessage;
pub use webhooks::WebhookStatus;
