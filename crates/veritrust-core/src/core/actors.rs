// crates/veritrust-core/src/core/actors.rs
// ============================================================================
// Module: Veritrust Actors
// Description: Actor variants and the durable records backing them.
// Purpose: Model the four authenticated actor kinds plus the inert default.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Every authenticated request resolves to exactly one [`Actor`] variant:
//! learner, institution user, VLE module, or provider module. Requests without
//! credentials carry [`Actor::Unauthenticated`], which exposes no scope and is
//! never active. Actors are constructed per request from durable records and
//! are never persisted themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CourseId;
use crate::core::identifiers::InstitutionId;
use crate::core::identifiers::InstrumentId;
use crate::core::identifiers::LearnerId;
use crate::core::identifiers::ProviderId;
use crate::core::identifiers::QueueName;
use crate::core::identifiers::SubjectId;
use crate::core::identifiers::UserId;
use crate::core::identifiers::VleId;

// ============================================================================
// SECTION: Consent
// ============================================================================

/// Informed-consent status for a learner.
///
/// # Invariants
/// - Only the `Valid*` variants permit sample or request processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// Consent accepted against the institution's current document.
    Valid,
    /// Consent is managed by an external system trusted by the institution.
    ValidExternal,
    /// Learner rejected the informed consent.
    NotValidRejected,
    /// Learner has never answered the informed consent.
    NotValidMissing,
    /// Consent refers to an expired document version.
    Expired,
}

impl ConsentStatus {
    /// Returns true when samples from this learner may be processed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid | Self::ValidExternal)
    }
}

// ============================================================================
// SECTION: Role Flags
// ============================================================================

/// Institution role flags gating administrative write access.
///
/// # Invariants
/// - Flags are independent; a user may hold any combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    /// Institution administrator.
    pub inst_admin: bool,
    /// Data administrator (exports, retention).
    pub data_admin: bool,
    /// Legal administrator (informed-consent documents).
    pub legal_admin: bool,
    /// SEND administrator (special educational needs categories).
    pub send_admin: bool,
}

// ============================================================================
// SECTION: Durable Records
// ============================================================================

/// Durable learner record.
///
/// # Invariants
/// - `subject` is the anonymized external identifier carried in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerRecord {
    /// Learner numeric key.
    pub id: LearnerId,
    /// Institution owning the learner.
    pub institution_id: InstitutionId,
    /// Anonymized external subject identifier.
    pub subject: SubjectId,
    /// Current informed-consent status.
    pub consent: ConsentStatus,
    /// Whether the learner account is active.
    pub active: bool,
}

/// Durable institution user (or global admin) record.
///
/// # Invariants
/// - `global_admin` users may lack an institution membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User numeric key.
    pub id: UserId,
    /// Institution membership, when present.
    pub institution_id: Option<InstitutionId>,
    /// Directory uid carried in token payloads.
    pub uid: SubjectId,
    /// Institution role flags.
    pub roles: RoleFlags,
    /// Whether the user is a platform-wide administrator.
    pub global_admin: bool,
    /// Whether the user account is active.
    pub active: bool,
}

/// Durable VLE module record.
///
/// # Invariants
/// - A VLE belongs to exactly one institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VleRecord {
    /// VLE numeric key.
    pub id: VleId,
    /// Institution owning the VLE.
    pub institution_id: InstitutionId,
    /// Human-readable VLE name.
    pub name: String,
    /// Whether the VLE module is active.
    pub active: bool,
}

/// Durable verification provider record.
///
/// # Invariants
/// - `queue` is the provider's private task queue; provider-bound work is
///   always routed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider numeric key.
    pub id: ProviderId,
    /// Instrument implemented by the provider.
    pub instrument_id: InstrumentId,
    /// Short unique acronym (for example `tpt`).
    pub acronym: String,
    /// Provider's private task queue.
    pub queue: QueueName,
    /// Whether the provider is enabled.
    pub enabled: bool,
    /// Whether the provider may validate enrolment samples.
    pub allow_validation: bool,
    /// Whether sample validation is currently active for the provider.
    pub validation_active: bool,
}

impl ProviderRecord {
    /// Returns true when this provider can validate enrolment samples.
    #[must_use]
    pub const fn is_validator(&self) -> bool {
        self.enabled && self.allow_validation && self.validation_active
    }
}

/// Durable instrument record (verification modality).
///
/// # Invariants
/// - `requires_enrolment` gates verification on an analysable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Instrument numeric key.
    pub id: InstrumentId,
    /// Human-readable instrument name.
    pub name: String,
    /// Whether verification requires a completed enrolment model.
    pub requires_enrolment: bool,
    /// Whether the instrument is enabled platform-wide.
    pub enabled: bool,
}

/// Durable course record with membership sets.
///
/// # Invariants
/// - Membership sets contain keys scoped to `institution_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course numeric key.
    pub id: CourseId,
    /// Institution owning the course.
    pub institution_id: InstitutionId,
    /// Instructors teaching the course.
    pub instructors: BTreeSet<UserId>,
    /// Learners enrolled in the course.
    pub learners: BTreeSet<LearnerId>,
}

// ============================================================================
// SECTION: Actor Union
// ============================================================================

/// Actor kind label for audit events and dispatch.
///
/// # Invariants
/// - Variants are stable for serialization and audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Learner actor.
    Learner,
    /// Institution user or global admin actor.
    User,
    /// VLE module actor.
    Vle,
    /// Provider module actor.
    Provider,
    /// Inert unauthenticated actor.
    Unauthenticated,
}

impl ActorKind {
    /// Returns a stable label for the actor kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::User => "user",
            Self::Vle => "vle",
            Self::Provider => "provider",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Authenticated actor resolved from a verified token payload.
///
/// # Invariants
/// - Exactly one concrete variant per authenticated request.
/// - `Unauthenticated` exposes no institution and is never active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// Learner actor backed by a learner record.
    Learner(LearnerRecord),
    /// Institution user or global admin actor.
    User(UserRecord),
    /// VLE module actor.
    Vle(VleRecord),
    /// Provider module actor.
    Provider(ProviderRecord),
    /// Inert actor for requests without credentials.
    Unauthenticated,
}

impl Actor {
    /// Returns the actor kind label.
    #[must_use]
    pub const fn kind(&self) -> ActorKind {
        match self {
            Self::Learner(_) => ActorKind::Learner,
            Self::User(_) => ActorKind::User,
            Self::Vle(_) => ActorKind::Vle,
            Self::Provider(_) => ActorKind::Provider,
            Self::Unauthenticated => ActorKind::Unauthenticated,
        }
    }

    /// Returns true when the underlying account or module is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        match self {
            Self::Learner(learner) => learner.active,
            Self::User(user) => user.active,
            Self::Vle(vle) => vle.active,
            Self::Provider(provider) => provider.enabled,
            Self::Unauthenticated => false,
        }
    }

    /// Returns the institution the actor belongs to, when any.
    ///
    /// Provider modules are platform-wide and have no institution; global
    /// admins may lack one.
    #[must_use]
    pub const fn institution_id(&self) -> Option<InstitutionId> {
        match self {
            Self::Learner(learner) => Some(learner.institution_id),
            Self::User(user) => user.institution_id,
            Self::Vle(vle) => Some(vle.institution_id),
            Self::Provider(_) | Self::Unauthenticated => None,
        }
    }

    /// Returns true when the actor is a platform-wide administrator.
    #[must_use]
    pub const fn is_global_admin(&self) -> bool {
        matches!(self, Self::User(user) if user.global_admin)
    }
}
