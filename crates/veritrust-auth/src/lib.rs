// crates/veritrust-auth/src/lib.rs
// ============================================================================
// Module: Veritrust Auth Library
// Description: Token codec, identity resolution, and permission predicates.
// Purpose: Provide the fail-closed authentication surface of Veritrust.
// Dependencies: veritrust-core, base64, hmac, serde, sha2, subtle
// ============================================================================

//! ## Overview
//! Veritrust Auth turns signed credential tokens into typed actors and
//! evaluates composable, fail-closed permission predicates against routes.
//! Invariants:
//! - No claim is trusted before the token signature verifies.
//! - Unknown payload groups are rejected, never defaulted.
//! - Permission errors deny; nothing falls open.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod identity;
pub mod permissions;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditSink;
pub use audit::AccessEvent;
pub use audit::AccessReason;
pub use audit::NoopAuditSink;
pub use audit::RecordingAuditSink;
pub use audit::evaluate_audited;
pub use identity::AuthError;
pub use identity::DebugActorRef;
pub use identity::DebugIdentityResolver;
pub use identity::Identity;
pub use identity::IdentityResolver;
pub use permissions::AccessMethod;
pub use permissions::AccessPolicy;
pub use permissions::AccessRequest;
pub use permissions::AnyOf;
pub use permissions::CourseInstructor;
pub use permissions::CourseLearner;
pub use permissions::GlobalAdmin;
pub use permissions::InstitutionAdmin;
pub use permissions::InstitutionMember;
pub use permissions::InstitutionRole;
pub use permissions::LearnerSelf;
pub use permissions::ModuleKind;
pub use permissions::ModuleRef;
pub use permissions::ModuleSelf;
pub use permissions::ReadOnly;
pub use permissions::RoleKind;
pub use permissions::RouteScope;
pub use permissions::evaluate;
pub use token::TokenCodec;
pub use token::TokenError;
pub use token::TokenIdentity;
pub use token::TokenPair;
pub use token::TokenPayload;
pub use token::TokenUse;
