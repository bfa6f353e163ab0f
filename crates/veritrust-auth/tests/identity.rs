// crates/veritrust-auth/tests/identity.rs
// ============================================================================
// Module: Identity Resolver Tests
// Description: Validate group dispatch, header parsing, and activity gates.
// Purpose: Ensure credentials resolve to exactly one actor or fail closed.
// Dependencies: veritrust-auth, veritrust-core, proptest
// ============================================================================

//! Identity resolution tests across the closed group dispatch.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use proptest::prelude::*;

use veritrust_auth::AuthError;
use veritrust_auth::IdentityResolver;
use veritrust_auth::TokenCodec;
use veritrust_auth::TokenIdentity;
use veritrust_core::Actor;
use veritrust_core::ConsentStatus;
use veritrust_core::Timestamp;
use veritrust_core::core::LearnerRecord;
use veritrust_core::core::ProviderRecord;
use veritrust_core::core::RoleFlags;
use veritrust_core::core::UserRecord;
use veritrust_core::core::VleRecord;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::QueueName;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::UserId;
use veritrust_core::core::identifiers::VleId;
use veritrust_core::runtime::InMemoryTrustStore;

const NOW: Timestamp = Timestamp::from_unix_seconds(1_700_000_000);

/// Builds the codec used by every resolver test.
fn codec() -> TokenCodec {
    TokenCodec::new(b"identity-test-secret".to_vec(), 900, 86_400)
}

/// Seeds the reference store with one actor of each kind.
fn seeded_store() -> InMemoryTrustStore {
    let store = InMemoryTrustStore::new();
    let institution = InstitutionId::from_raw(1).unwrap();
    store
        .upsert_learner(LearnerRecord {
            id: LearnerId::from_raw(42).unwrap(),
            institution_id: institution,
            subject: SubjectId::from("subject-42"),
            consent: ConsentStatus::Valid,
            active: true,
        })
        .unwrap();
    store
        .upsert_learner(LearnerRecord {
            id: LearnerId::from_raw(43).unwrap(),
            institution_id: institution,
            subject: SubjectId::from("subject-43"),
            consent: ConsentStatus::Valid,
            active: false,
        })
        .unwrap();
    store
        .upsert_user(UserRecord {
            id: UserId::from_raw(7).unwrap(),
            institution_id: Some(institution),
            uid: SubjectId::from("inst-admin"),
            roles: RoleFlags {
                inst_admin: true,
                data_admin: false,
                legal_admin: false,
                send_admin: false,
            },
            global_admin: false,
            active: true,
        })
        .unwrap();
    store
        .upsert_user(UserRecord {
            id: UserId::from_raw(8).unwrap(),
            institution_id: Some(institution),
            uid: SubjectId::from("course-lead"),
            roles: RoleFlags {
                inst_admin: false,
                data_admin: false,
                legal_admin: false,
                send_admin: false,
            },
            global_admin: false,
            active: true,
        })
        .unwrap();
    store
        .upsert_vle(VleRecord {
            id: VleId::from_raw(3).unwrap(),
            institution_id: institution,
            name: "campus-moodle".to_string(),
            active: true,
        })
        .unwrap();
    store
        .upsert_provider(ProviderRecord {
            id: ProviderId::from_raw(5).unwrap(),
            instrument_id: InstrumentId::from_raw(1).unwrap(),
            acronym: "ks".to_string(),
            queue: QueueName::from("provider-ks"),
            enabled: true,
            allow_validation: true,
            validation_active: true,
        })
        .unwrap();
    store
}

/// Builds a resolver over the seeded store.
fn resolver() -> IdentityResolver {
    IdentityResolver::new(codec(), Arc::new(seeded_store()))
}

/// Issues an access token for the given identity.
fn access_token(identity: &TokenIdentity) -> String {
    codec().issue_pair(identity, NOW).unwrap().access
}

/// Builds a token identity from its dispatch fields.
fn identity_for(group: &str, kind: Option<&str>, sub: Option<&str>, pk: Option<u64>) -> TokenIdentity {
    TokenIdentity {
        group: group.to_string(),
        kind: kind.map(str::to_string),
        sub: sub.map(str::to_string),
        pk,
        scope: Vec::new(),
        filters: Vec::new(),
    }
}

/// Learner tokens resolve through the pseudonymous subject.
#[test]
fn learner_group_resolves_by_subject() -> Result<(), Box<dyn std::error::Error>> {
    let token = access_token(&identity_for("learners", None, Some("subject-42"), None));
    let identity = resolver().resolve_token(&token, NOW)?;
    match identity.actor {
        Actor::Learner(learner) => assert_eq!(learner.id.get(), 42),
        other => panic!("unexpected actor: {other:?}"),
    }
    Ok(())
}

/// User tokens resolve uid-first; the pk claim never shadows a live uid.
#[test]
fn users_group_prefers_the_uid_claim_over_pk() -> Result<(), Box<dyn std::error::Error>> {
    // Both claims resolve, to different users. The uid must win.
    let token = access_token(&identity_for("users", None, Some("course-lead"), Some(7)));
    let identity = resolver().resolve_token(&token, NOW)?;
    match identity.actor {
        Actor::User(user) => assert_eq!(user.id.get(), 8),
        other => panic!("unexpected actor: {other:?}"),
    }
    Ok(())
}

/// User tokens fall back to the numeric key when the uid does not resolve.
#[test]
fn users_group_falls_back_from_uid_to_pk() -> Result<(), Box<dyn std::error::Error>> {
    let token = access_token(&identity_for("users", None, Some("ghost"), Some(7)));
    let identity = resolver().resolve_token(&token, NOW)?;
    match identity.actor {
        Actor::User(user) => assert_eq!(user.uid.as_str(), "inst-admin"),
        other => panic!("unexpected actor: {other:?}"),
    }
    Ok(())
}

/// Admin tokens dispatch by primary key and ignore the uid claim.
#[test]
fn admin_tokens_resolve_by_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let token = access_token(&identity_for("users", Some("admin"), Some("course-lead"), Some(7)));
    let identity = resolver().resolve_token(&token, NOW)?;
    match identity.actor {
        Actor::User(user) => assert_eq!(user.id.get(), 7),
        other => panic!("unexpected actor: {other:?}"),
    }

    // An admin token without a resolvable pk fails, uid notwithstanding.
    let bad = access_token(&identity_for("users", Some("admin"), Some("course-lead"), Some(999)));
    assert!(matches!(
        resolver().resolve_token(&bad, NOW),
        Err(AuthError::InvalidUser)
    ));
    Ok(())
}

/// Module tokens dispatch on their declared module type.
#[test]
fn module_groups_dispatch_on_declared_type() -> Result<(), Box<dyn std::error::Error>> {
    let resolver = resolver();

    let vle = access_token(&identity_for("module_vle", Some("vle"), None, Some(3)));
    assert!(matches!(
        resolver.resolve_token(&vle, NOW)?.actor,
        Actor::Vle(_)
    ));

    let provider = access_token(&identity_for("module_ks", Some("provider"), None, Some(5)));
    assert!(matches!(
        resolver.resolve_token(&provider, NOW)?.actor,
        Actor::Provider(_)
    ));

    let unknown = access_token(&identity_for("module_ks", Some("reporter"), None, Some(5)));
    assert!(matches!(
        resolver.resolve_token(&unknown, NOW),
        Err(AuthError::InvalidModuleType(kind)) if kind == "reporter"
    ));
    Ok(())
}

/// Deactivated actors are rejected even with a valid token.
#[test]
fn inactive_actors_fail_authentication() {
    let token = access_token(&identity_for("learners", None, Some("subject-43"), None));
    let outcome = resolver().resolve_token(&token, NOW);
    assert!(matches!(outcome, Err(AuthError::InactiveActor)));
}

/// Each malformed header shape maps to its own defect message.
#[test]
fn header_parsing_distinguishes_each_defect() -> Result<(), Box<dyn std::error::Error>> {
    let resolver = resolver();

    // Absent header is anonymous, not an error.
    let identity = resolver.resolve_header(None, NOW)?;
    assert!(matches!(identity.actor, Actor::Unauthenticated));

    // Foreign scheme is left for other authenticators.
    let identity = resolver.resolve_header(Some(b"Bearer abc"), NOW)?;
    assert!(matches!(identity.actor, Actor::Unauthenticated));

    assert!(matches!(
        resolver.resolve_header(Some(b"JWT"), NOW),
        Err(AuthError::InvalidHeader(_))
    ));
    assert!(matches!(
        resolver.resolve_header(Some(b"JWT two parts"), NOW),
        Err(AuthError::InvalidHeader(_))
    ));
    assert!(matches!(
        resolver.resolve_header(Some(&[0x4a, 0x57, 0x54, 0x20, 0xff, 0xfe]), NOW),
        Err(AuthError::InvalidHeader(_))
    ));
    Ok(())
}

/// Refresh tokens are rejected at the access boundary.
#[test]
fn refresh_tokens_never_grant_access() {
    let pair = codec()
        .issue_pair(&identity_for("learners", None, Some("subject-42"), None), NOW)
        .unwrap();
    let outcome = resolver().resolve_token(&pair.refresh, NOW);
    assert!(outcome.is_err());
}

proptest! {
    /// Arbitrary payload groups outside the dispatch set are rejected.
    #[test]
    fn groups_outside_the_dispatch_set_are_rejected(group in "[a-z][a-z0-9_-]{0,24}") {
        prop_assume!(group != "learners" && group != "users" && !group.starts_with("module_"));
        let token = access_token(&identity_for(&group, None, Some("subject-42"), Some(1)));
        let outcome = resolver().resolve_token(&token, NOW);
        prop_assert!(matches!(
            outcome,
            Err(AuthError::InvalidPayloadGroup(rejected)) if rejected == group
        ));
    }
}
