// crates/veritrust-auth/tests/permissions.rs
// ============================================================================
// Module: Permission Predicate Tests
// Description: Validate fail-closed predicates and institution isolation.
// Purpose: Ensure scoped access never crosses institutions or identities.
// Dependencies: veritrust-auth, veritrust-core
// ============================================================================

//! Permission evaluation tests over typed route scopes.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use veritrust_auth::AccessMethod;
use veritrust_auth::AccessReason;
use veritrust_auth::AccessRequest;
use veritrust_auth::AnyOf;
use veritrust_auth::CourseInstructor;
use veritrust_auth::GlobalAdmin;
use veritrust_auth::Identity;
use veritrust_auth::InstitutionAdmin;
use veritrust_auth::InstitutionMember;
use veritrust_auth::LearnerSelf;
use veritrust_auth::ReadOnly;
use veritrust_auth::RecordingAuditSink;
use veritrust_auth::RouteScope;
use veritrust_auth::evaluate;
use veritrust_auth::evaluate_audited;
use veritrust_core::Actor;
use veritrust_core::ConsentStatus;
use veritrust_core::core::CourseRecord;
use veritrust_core::core::LearnerRecord;
use veritrust_core::core::RoleFlags;
use veritrust_core::core::UserRecord;
use veritrust_core::core::identifiers::CourseId;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::UserId;
use veritrust_core::runtime::InMemoryTrustStore;

/// Builds a learner record for seeding.
fn learner(id: u64, institution: u64, active: bool) -> LearnerRecord {
    LearnerRecord {
        id: LearnerId::from_raw(id).unwrap(),
        institution_id: InstitutionId::from_raw(institution).unwrap(),
        subject: SubjectId::from(format!("subject-{id}")),
        consent: ConsentStatus::Valid,
        active,
    }
}

/// Builds a user record for seeding.
fn user(id: u64, institution: Option<u64>, roles: RoleFlags, global_admin: bool) -> UserRecord {
    UserRecord {
        id: UserId::from_raw(id).unwrap(),
        institution_id: institution.map(|raw| InstitutionId::from_raw(raw).unwrap()),
        uid: SubjectId::from(format!("user-{id}")),
        roles,
        global_admin,
        active: true,
    }
}

/// Wraps an actor into an unfiltered identity.
fn identity(actor: Actor) -> Identity {
    Identity {
        actor,
        scope: Vec::new(),
        filters: Vec::new(),
    }
}

/// Builds an access request from its parts.
fn request<'a>(identity: &'a Identity, method: AccessMethod, scope: RouteScope) -> AccessRequest<'a> {
    AccessRequest {
        identity,
        method,
        scope,
    }
}

/// Builds a route scope naming only an institution.
fn institution_scope(raw: u64) -> RouteScope {
    RouteScope {
        institution_id: Some(InstitutionId::from_raw(raw).unwrap()),
        ..RouteScope::default()
    }
}

/// A learner passes `LearnerSelf` only on their own resources.
#[test]
fn learners_reach_their_own_enrolment_and_nobody_elses() {
    let store = InMemoryTrustStore::new();
    let caller = identity(Actor::Learner(learner(42, 1, true)));

    let own_scope = RouteScope {
        institution_id: Some(InstitutionId::from_raw(1).unwrap()),
        learner_id: Some(LearnerId::from_raw(42).unwrap()),
        ..RouteScope::default()
    };
    let other_scope = RouteScope {
        institution_id: Some(InstitutionId::from_raw(1).unwrap()),
        learner_id: Some(LearnerId::from_raw(43).unwrap()),
        ..RouteScope::default()
    };

    assert!(evaluate(
        &LearnerSelf,
        &request(&caller, AccessMethod::Get, own_scope),
        &store
    ));
    assert!(!evaluate(
        &LearnerSelf,
        &request(&caller, AccessMethod::Get, other_scope),
        &store
    ));
}

/// Membership predicates deny across institution boundaries.
#[test]
fn institution_isolation_holds_across_predicates() {
    let store = InMemoryTrustStore::new();
    let admin_roles = RoleFlags {
        inst_admin: true,
        data_admin: false,
        legal_admin: false,
        send_admin: false,
    };

    let foreign_admin = identity(Actor::User(user(7, Some(2), admin_roles, false)));
    let scope = institution_scope(1);

    assert!(!evaluate(
        &InstitutionMember,
        &request(&foreign_admin, AccessMethod::Get, scope),
        &store
    ));
    assert!(!evaluate(
        &InstitutionAdmin,
        &request(&foreign_admin, AccessMethod::Get, scope),
        &store
    ));

    let foreign_learner = identity(Actor::Learner(learner(42, 2, true)));
    let scoped_learner = RouteScope {
        learner_id: Some(LearnerId::from_raw(42).unwrap()),
        ..institution_scope(1)
    };
    assert!(!evaluate(
        &LearnerSelf,
        &request(&foreign_learner, AccessMethod::Get, scoped_learner),
        &store
    ));
}

/// Global administrators pass institution-scoped predicates everywhere.
#[test]
fn global_admin_bypasses_institution_scoping() {
    let store = InMemoryTrustStore::new();
    let admin = identity(Actor::User(user(1, None, RoleFlags::default(), true)));

    assert!(evaluate(
        &GlobalAdmin,
        &request(&admin, AccessMethod::Delete, institution_scope(9)),
        &store
    ));
    assert!(evaluate(
        &InstitutionAdmin,
        &request(&admin, AccessMethod::Post, institution_scope(9)),
        &store
    ));
}

/// The unauthenticated identity fails every predicate.
#[test]
fn unauthenticated_actors_are_denied_everywhere() {
    let store = InMemoryTrustStore::new();
    let caller = identity(Actor::Unauthenticated);
    let scope = institution_scope(1);

    for predicate in [
        Box::new(GlobalAdmin) as Box<dyn veritrust_auth::AccessPolicy + Send + Sync>,
        Box::new(InstitutionMember),
        Box::new(InstitutionAdmin),
        Box::new(LearnerSelf),
    ] {
        assert!(!evaluate(
            predicate.as_ref(),
            &request(&caller, AccessMethod::Get, scope),
            &store
        ));
    }
}

/// `ReadOnly` grants safe methods only.
#[test]
fn read_only_wrapper_blocks_mutating_methods() {
    let store = InMemoryTrustStore::new();
    let member = identity(Actor::Learner(learner(42, 1, true)));
    let scope = institution_scope(1);
    let policy = ReadOnly(InstitutionMember);

    assert!(evaluate(&policy, &request(&member, AccessMethod::Get, scope), &store));
    assert!(!evaluate(&policy, &request(&member, AccessMethod::Post, scope), &store));
}

/// `CourseInstructor` requires a same-institution course listing the user.
#[test]
fn course_instructor_requires_membership_in_a_same_institution_course()
-> Result<(), Box<dyn std::error::Error>> {
    let store = InMemoryTrustStore::new();
    let instructor = user(7, Some(1), RoleFlags::default(), false);
    store.upsert_course(CourseRecord {
        id: CourseId::from_raw(10).unwrap(),
        institution_id: InstitutionId::from_raw(1).unwrap(),
        instructors: [instructor.id].into_iter().collect(),
        learners: BTreeSet::new(),
    })?;
    store.upsert_course(CourseRecord {
        id: CourseId::from_raw(11).unwrap(),
        institution_id: InstitutionId::from_raw(2).unwrap(),
        instructors: [instructor.id].into_iter().collect(),
        learners: BTreeSet::new(),
    })?;

    let caller = identity(Actor::User(instructor));
    let own_course = RouteScope {
        course_id: Some(CourseId::from_raw(10).unwrap()),
        ..institution_scope(1)
    };
    // Same listing, but the course belongs to another institution.
    let foreign_course = RouteScope {
        course_id: Some(CourseId::from_raw(11).unwrap()),
        ..institution_scope(2)
    };
    let missing_course = RouteScope {
        course_id: Some(CourseId::from_raw(99).unwrap()),
        ..institution_scope(1)
    };

    assert!(evaluate(
        &CourseInstructor,
        &request(&caller, AccessMethod::Get, own_course),
        &store
    ));
    assert!(!evaluate(
        &CourseInstructor,
        &request(&caller, AccessMethod::Get, foreign_course),
        &store
    ));
    assert!(!evaluate(
        &CourseInstructor,
        &request(&caller, AccessMethod::Get, missing_course),
        &store
    ));
    Ok(())
}

/// Predicate whose backing lookup always fails.
struct FailingLookup;

impl veritrust_auth::AccessPolicy for FailingLookup {
    fn allows(
        &self,
        _request: &AccessRequest<'_>,
        _store: &dyn veritrust_core::interfaces::TrustStore,
    ) -> Result<bool, veritrust_core::StoreError> {
        Err(veritrust_core::StoreError::Io(
            "backend unavailable".to_string(),
        ))
    }
}

/// A failed disjunct denies only itself; later disjuncts still grant.
#[test]
fn any_of_survives_a_failing_disjunct() {
    let store = InMemoryTrustStore::new();
    let member = identity(Actor::Learner(learner(42, 1, true)));
    let scope = institution_scope(1);

    let policy = AnyOf(vec![Box::new(FailingLookup), Box::new(InstitutionMember)]);
    assert!(evaluate(&policy, &request(&member, AccessMethod::Get, scope), &store));

    // With nothing granting behind it the failure stays a denial.
    let only = AnyOf(vec![Box::new(FailingLookup)]);
    assert!(!evaluate(&only, &request(&member, AccessMethod::Get, scope), &store));
}

/// `AnyOf` grants as soon as one branch grants.
#[test]
fn any_of_short_circuits_on_the_first_grant() {
    let store = InMemoryTrustStore::new();
    let member = identity(Actor::Learner(learner(42, 1, true)));
    let scope = institution_scope(1);
    let policy = AnyOf(vec![Box::new(GlobalAdmin), Box::new(InstitutionMember)]);

    assert!(evaluate(&policy, &request(&member, AccessMethod::Get, scope), &store));
    assert!(!evaluate(
        &policy,
        &request(&member, AccessMethod::Get, institution_scope(2)),
        &store
    ));
}

/// Audited evaluation records the outcome without changing the decision.
#[test]
fn audited_evaluation_records_the_outcome() {
    let store = InMemoryTrustStore::new();
    let member = identity(Actor::Learner(learner(42, 1, true)));
    let sink = RecordingAuditSink::new();

    assert!(evaluate_audited(
        &InstitutionMember,
        &request(&member, AccessMethod::Get, institution_scope(1)),
        &store,
        &sink
    ));
    assert!(!evaluate_audited(
        &InstitutionMember,
        &request(&member, AccessMethod::Get, institution_scope(2)),
        &store,
        &sink
    ));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events[0].allowed);
    assert_eq!(events[0].reason, AccessReason::PolicyAllowed);
    assert!(!events[1].allowed);
    assert_eq!(events[1].reason, AccessReason::PolicyDenied);
}
