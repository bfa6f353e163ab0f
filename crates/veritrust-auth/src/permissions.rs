// crates/veritrust-auth/src/permissions.rs
// ============================================================================
// Module: Veritrust Permission Evaluator
// Description: Fail-closed access predicates over typed route scopes.
// Purpose: Decide whether a resolved actor may perform a scoped operation.
// Dependencies: veritrust-core, serde
// ============================================================================

//! ## Overview
//! Permissions are small composable predicates evaluated against a typed
//! [`RouteScope`] bound by the routing layer, never re-parsed from strings.
//! Every predicate fails closed: a missing scope element, an unresolvable
//! course, or a store failure is a denial. Institution isolation is absolute:
//! no predicate grants access across institutions except the global
//! administrator bypass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use veritrust_core::Actor;
use veritrust_core::StoreError;
use veritrust_core::core::identifiers::CourseId;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::interfaces::TrustStore;

use crate::identity::Identity;

// ============================================================================
// SECTION: Access Method
// ============================================================================

/// HTTP-style access method attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMethod {
    /// Read a resource.
    Get,
    /// Read headers only.
    Head,
    /// Inspect allowed methods.
    Options,
    /// Create a resource.
    Post,
    /// Replace a resource.
    Put,
    /// Modify a resource.
    Patch,
    /// Remove a resource.
    Delete,
}

impl AccessMethod {
    /// Returns true for non-mutating methods.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

// ============================================================================
// SECTION: Route Scope
// ============================================================================

/// Module discriminator inside a route scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Virtual learning environment.
    Vle,
    /// Instrument provider.
    Provider,
}

/// Module reference bound from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    /// Module kind.
    pub kind: ModuleKind,
    /// Module numeric key.
    pub id: u64,
}

/// Typed scope extracted from a route by the routing layer.
///
/// # Invariants
/// - Fields are bound from typed route segments, never parsed from strings
///   at evaluation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteScope {
    /// Institution segment, when the route is institution-scoped.
    pub institution_id: Option<InstitutionId>,
    /// Learner segment, when the route addresses a learner.
    pub learner_id: Option<LearnerId>,
    /// Course segment, when the route addresses a course.
    pub course_id: Option<CourseId>,
    /// Module segment, when the route addresses a VLE or provider.
    pub module: Option<ModuleRef>,
}

/// One access decision input.
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    /// Resolved caller identity.
    pub identity: &'a Identity,
    /// Access method of the operation.
    pub method: AccessMethod,
    /// Typed route scope.
    pub scope: RouteScope,
}

// ============================================================================
// SECTION: Policy Trait
// ============================================================================

/// A composable, fail-closed access predicate.
pub trait AccessPolicy {
    /// Decides whether the request is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a backing lookup fails; callers must
    /// treat errors as denials.
    fn allows(&self, request: &AccessRequest<'_>, store: &dyn TrustStore)
    -> Result<bool, StoreError>;
}

/// Evaluates a policy, mapping failures to denial.
#[must_use]
pub fn evaluate(
    policy: &dyn AccessPolicy,
    request: &AccessRequest<'_>,
    store: &dyn TrustStore,
) -> bool {
    policy.allows(request, store).unwrap_or(false)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the actor's institution when it matches the scoped institution.
fn scoped_institution(request: &AccessRequest<'_>) -> Option<InstitutionId> {
    let actor_institution = request.identity.actor.institution_id()?;
    let scope_institution = request.scope.institution_id?;
    (actor_institution == scope_institution).then_some(scope_institution)
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Allows global administrators only.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalAdmin;

impl AccessPolicy for GlobalAdmin {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        Ok(request.identity.actor.is_global_admin())
    }
}

/// Allows actors belonging to the scoped institution.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstitutionMember;

impl AccessPolicy for InstitutionMember {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        Ok(scoped_institution(request).is_some())
    }
}

/// Allows institution administrators of the scoped institution.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstitutionAdmin;

impl AccessPolicy for InstitutionAdmin {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        if request.identity.actor.is_global_admin() {
            return Ok(true);
        }
        let Actor::User(user) = &request.identity.actor else {
            return Ok(false);
        };
        Ok(scoped_institution(request).is_some() && user.roles.inst_admin)
    }
}

/// Institution role gates beyond plain administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// May manage learner data.
    Data,
    /// May manage informed consent and legal texts.
    Legal,
    /// May manage SEND categories.
    Send,
}

/// Allows users holding a specific institution role.
///
/// Institution administrators implicitly hold every role.
#[derive(Debug, Clone, Copy)]
pub struct InstitutionRole(
    /// Required role.
    pub RoleKind,
);

impl AccessPolicy for InstitutionRole {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        if request.identity.actor.is_global_admin() {
            return Ok(true);
        }
        let Actor::User(user) = &request.identity.actor else {
            return Ok(false);
        };
        if scoped_institution(request).is_none() {
            return Ok(false);
        }
        let granted = match self.0 {
            RoleKind::Data => user.roles.data_admin,
            RoleKind::Legal => user.roles.legal_admin,
            RoleKind::Send => user.roles.send_admin,
        };
        Ok(granted || user.roles.inst_admin)
    }
}

/// Allows a learner acting on their own scoped resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct LearnerSelf;

impl AccessPolicy for LearnerSelf {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        let Actor::Learner(learner) = &request.identity.actor else {
            return Ok(false);
        };
        if request.scope.institution_id.is_some() && scoped_institution(request).is_none() {
            return Ok(false);
        }
        Ok(request.scope.learner_id == Some(learner.id))
    }
}

/// Allows instructors of the scoped course.
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseInstructor;

impl AccessPolicy for CourseInstructor {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        let Actor::User(user) = &request.identity.actor else {
            return Ok(false);
        };
        let Some(course_id) = request.scope.course_id else {
            return Ok(false);
        };
        let Some(course) = store.course(course_id)? else {
            return Ok(false);
        };
        if Some(course.institution_id) != user.institution_id {
            return Ok(false);
        }
        Ok(course.instructors.contains(&user.id))
    }
}

/// Allows learners enrolled in the scoped course.
#[derive(Debug, Clone, Copy, Default)]
pub struct CourseLearner;

impl AccessPolicy for CourseLearner {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        let Actor::Learner(learner) = &request.identity.actor else {
            return Ok(false);
        };
        let Some(course_id) = request.scope.course_id else {
            return Ok(false);
        };
        let Some(course) = store.course(course_id)? else {
            return Ok(false);
        };
        if course.institution_id != learner.institution_id {
            return Ok(false);
        }
        Ok(course.learners.contains(&learner.id))
    }
}

/// Allows a module actor addressing itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleSelf;

impl AccessPolicy for ModuleSelf {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        _store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        let Some(module) = request.scope.module else {
            return Ok(false);
        };
        match (&request.identity.actor, module.kind) {
            (Actor::Vle(vle), ModuleKind::Vle) => {
                if request.scope.institution_id.is_some() && scoped_institution(request).is_none() {
                    return Ok(false);
                }
                Ok(vle.id.get() == module.id)
            }
            (Actor::Provider(provider), ModuleKind::Provider) => {
                Ok(provider.id.get() == module.id)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// SECTION: Combinators
// ============================================================================

/// Restricts an inner predicate to safe methods.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly<P>(
    /// Wrapped predicate.
    pub P,
);

impl<P: AccessPolicy> AccessPolicy for ReadOnly<P> {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        if !request.method.is_safe() {
            return Ok(false);
        }
        self.0.allows(request, store)
    }
}

/// Short-circuit disjunction of predicates.
///
/// A disjunct whose lookup fails counts as a denial for that disjunct only;
/// the remaining disjuncts are still tried.
pub struct AnyOf(
    /// Predicates tried in order.
    pub Vec<Box<dyn AccessPolicy + Send + Sync>>,
);

impl AccessPolicy for AnyOf {
    fn allows(
        &self,
        request: &AccessRequest<'_>,
        store: &dyn TrustStore,
    ) -> Result<bool, StoreError> {
        for policy in &self.0 {
            if policy.allows(request, store).unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
