// crates/veritrust-auth/tests/token.rs
// ============================================================================
// Module: Token Codec Tests
// Description: Validate issue, verify, tamper, expiry, and refresh behavior.
// Purpose: Ensure the credential envelope fails closed on every defect.
// Dependencies: veritrust-auth, veritrust-core
// ============================================================================

//! Token envelope verification tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use veritrust_auth::TokenCodec;
use veritrust_auth::TokenError;
use veritrust_auth::TokenIdentity;
use veritrust_auth::TokenUse;
use veritrust_core::Timestamp;

/// Builds the codec under test.
fn codec() -> TokenCodec {
    TokenCodec::new(b"integration-test-secret".to_vec(), 15 * 60, 24 * 3600)
}

/// Builds a learner token identity.
fn learner_identity() -> TokenIdentity {
    TokenIdentity {
        group: "learners".to_string(),
        kind: None,
        sub: Some("a1b2c3".to_string()),
        pk: None,
        scope: vec!["enrolment".to_string()],
        filters: Vec::new(),
    }
}

/// A fresh pair verifies and round-trips its claims.
#[test]
fn issued_pairs_verify_and_carry_their_claims() -> Result<(), Box<dyn std::error::Error>> {
    let codec = codec();
    let now = Timestamp::from_unix_seconds(1_700_000_000);
    let pair = codec.issue_pair(&learner_identity(), now)?;

    let access = codec.verify(&pair.access, now.plus_seconds(60))?;
    assert_eq!(access.token_use, TokenUse::Access);
    assert_eq!(access.identity.group, "learners");
    assert_eq!(access.identity.sub.as_deref(), Some("a1b2c3"));
    assert_eq!(access.identity.scope, vec!["enrolment".to_string()]);

    let refresh = codec.verify(&pair.refresh, now.plus_seconds(60))?;
    assert_eq!(refresh.token_use, TokenUse::Refresh);
    assert!(refresh.exp > access.exp);
    Ok(())
}

/// Editing the claims segment invalidates the signature.
#[test]
fn tampered_claims_fail_the_signature_check() -> Result<(), Box<dyn std::error::Error>> {
    let codec = codec();
    let now = Timestamp::from_unix_seconds(1_700_000_000);
    let pair = codec.issue_pair(&learner_identity(), now)?;

    let mut segments: Vec<&str> = pair.access.split('.').collect();
    assert_eq!(segments.len(), 3);
    // Substitute claims signed by nobody.
    let forged = base64_url(br#"{"group":"users","pk":1,"token_use":"access","exp":9999999999,"iat":0}"#);
    segments[1] = &forged;
    let tampered = segments.join(".");

    let outcome = codec.verify(&tampered, now);
    assert!(matches!(outcome, Err(TokenError::InvalidSignature)));
    Ok(())
}

/// Tokens without exactly three segments are malformed.
#[test]
fn wrong_segment_counts_are_malformed() {
    let codec = codec();
    let now = Timestamp::from_unix_seconds(1_700_000_000);
    for token in ["", "one-segment", "two.segments", "a.b.c.d"] {
        let outcome = codec.verify(token, now);
        assert!(
            matches!(outcome, Err(TokenError::Malformed(_))),
            "token {token:?} was not rejected as malformed"
        );
    }
}

/// Verification fails once the expiry instant passes.
#[test]
fn expired_tokens_are_rejected_after_their_ttl() -> Result<(), Box<dyn std::error::Error>> {
    let codec = codec();
    let issued = Timestamp::from_unix_seconds(1_700_000_000);
    let pair = codec.issue_pair(&learner_identity(), issued)?;

    let after_access_ttl = issued.plus_seconds(15 * 60 + 1);
    assert!(matches!(
        codec.verify(&pair.access, after_access_ttl),
        Err(TokenError::Expired)
    ));
    // The refresh token outlives the access token.
    codec.verify(&pair.refresh, after_access_ttl)?;
    Ok(())
}

/// Refresh accepts refresh tokens only and mints a new pair.
#[test]
fn refresh_requires_a_refresh_token_and_reissues_the_pair()
-> Result<(), Box<dyn std::error::Error>> {
    let codec = codec();
    let now = Timestamp::from_unix_seconds(1_700_000_000);
    let pair = codec.issue_pair(&learner_identity(), now)?;

    let denied = codec.refresh(&pair.access, now.plus_seconds(60));
    assert!(matches!(denied, Err(TokenError::NotRefresh)));

    let later = now.plus_seconds(3600);
    let renewed = codec.refresh(&pair.refresh, later)?;
    let access = codec.verify(&renewed.access, later.plus_seconds(1))?;
    assert_eq!(access.identity.sub.as_deref(), Some("a1b2c3"));
    assert_eq!(access.exp, later.plus_seconds(15 * 60).unix_seconds());
    Ok(())
}

/// Encodes bytes with the token alphabet.
fn base64_url(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
