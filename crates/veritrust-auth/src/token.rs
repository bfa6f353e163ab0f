// crates/veritrust-auth/src/token.rs
// ============================================================================
// Module: Veritrust Token Codec
// Description: HS256 token envelope with access and refresh pairs.
// Purpose: Issue and verify credential tokens without trusting the payload.
// Dependencies: base64, hmac, serde, serde_json, sha2, subtle
// ============================================================================

//! ## Overview
//! Tokens are standard three-segment HS256 envelopes:
//! `base64url(header).base64url(claims).base64url(signature)` with the
//! signature computed over the first two segments. Verification is strict:
//! wrong segment counts, undecodable segments, bad signatures, and expired
//! claims each map to a distinct [`TokenError`], and every one of them is an
//! authentication failure for the caller. Signature comparison is
//! constant-time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use veritrust_core::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed JOSE header for every issued token.
const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// HMAC-SHA256 keyed by the signing secret.
type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token verification errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Every variant is an authentication failure; none is recoverable.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token structure, encoding, or claims JSON is invalid.
    #[error("malformed token: {0}")]
    Malformed(String),
    /// Signature does not match the signed segments.
    #[error("token signature mismatch")]
    InvalidSignature,
    /// Claims expired before the supplied verification time.
    #[error("token expired")]
    Expired,
    /// A refresh operation was attempted with a non-refresh token.
    #[error("token is not a refresh token")]
    NotRefresh,
    /// Signing key setup failed.
    #[error("token key error: {0}")]
    Key(String),
}

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Whether a token grants access or only renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    /// Grants access to the platform.
    Access,
    /// Grants only reissuance of a fresh pair.
    Refresh,
}

/// Identity claims carried by a token, opaque to the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIdentity {
    /// Principal group, such as `learners`, `users`, or `module_ks`.
    pub group: String,
    /// Module type discriminator for `module_*` groups.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Stable subject identifier, when the group uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Numeric primary key, when the group uses one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<u64>,
    /// Granted scope strings, carried opaquely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    /// Path filter strings, carried opaquely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
}

/// Full claim set of a decoded token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Identity claims.
    #[serde(flatten)]
    pub identity: TokenIdentity,
    /// Access or refresh discriminator.
    pub token_use: TokenUse,
    /// Expiry as unix seconds.
    pub exp: i64,
    /// Issue time as unix seconds.
    pub iat: i64,
}

/// Access and refresh tokens issued together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived access token.
    pub access: String,
    /// Longer-lived refresh token.
    pub refresh: String,
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Issues and verifies HS256 token envelopes.
///
/// # Invariants
/// - The signing secret never appears in errors or serialized output.
/// - Verification never trusts any claim before the signature matches.
#[derive(Clone)]
pub struct TokenCodec {
    /// Shared signing secret.
    secret: Vec<u8>,
    /// Access token lifetime in seconds.
    access_ttl_seconds: i64,
    /// Refresh token lifetime in seconds.
    refresh_ttl_seconds: i64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Creates a codec from a signing secret and pair lifetimes.
    #[must_use]
    pub fn new(
        secret: impl Into<Vec<u8>>,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    /// Issues an access/refresh pair for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when signing fails.
    pub fn issue_pair(
        &self,
        identity: &TokenIdentity,
        now: Timestamp,
    ) -> Result<TokenPair, TokenError> {
        let access = self.encode(&TokenPayload {
            identity: identity.clone(),
            token_use: TokenUse::Access,
            exp: now.plus_seconds(self.access_ttl_seconds).unix_seconds(),
            iat: now.unix_seconds(),
        })?;
        let refresh = self.encode(&TokenPayload {
            identity: identity.clone(),
            token_use: TokenUse::Refresh,
            exp: now.plus_seconds(self.refresh_ttl_seconds).unix_seconds(),
            iat: now.unix_seconds(),
        })?;
        Ok(TokenPair { access, refresh })
    }

    /// Verifies a refresh token and reissues a fresh pair.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotRefresh`] for access tokens and the usual
    /// verification errors otherwise.
    pub fn refresh(&self, refresh_token: &str, now: Timestamp) -> Result<TokenPair, TokenError> {
        let payload = self.verify(refresh_token, now)?;
        if payload.token_use != TokenUse::Refresh {
            return Err(TokenError::NotRefresh);
        }
        self.issue_pair(&payload.identity, now)
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] for structural problems,
    /// [`TokenError::InvalidSignature`] for signature mismatches, and
    /// [`TokenError::Expired`] once `exp` has passed.
    pub fn verify(&self, token: &str, now: Timestamp) -> Result<TokenPayload, TokenError> {
        let mut segments = token.split('.');
        let (header, claims, signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(header), Some(claims), Some(signature), None) => (header, claims, signature),
                _ => {
                    return Err(TokenError::Malformed(
                        "token must have exactly three segments".to_string(),
                    ));
                }
            };

        let signed = format!("{header}.{claims}");
        let expected = self.sign(signed.as_bytes())?;
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|err| TokenError::Malformed(format!("signature segment: {err}")))?;
        let signature_ok: bool = presented.ct_eq(&expected).into();
        if !signature_ok {
            return Err(TokenError::InvalidSignature);
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|err| TokenError::Malformed(format!("header segment: {err}")))?;
        let header_json: Value = serde_json::from_slice(&header_bytes)
            .map_err(|err| TokenError::Malformed(format!("header json: {err}")))?;
        if header_json.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Err(TokenError::Malformed("unsupported algorithm".to_string()));
        }

        let claim_bytes = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|err| TokenError::Malformed(format!("claims segment: {err}")))?;
        let payload: TokenPayload = serde_json::from_slice(&claim_bytes)
            .map_err(|err| TokenError::Malformed(format!("claims json: {err}")))?;
        if payload.exp <= now.unix_seconds() {
            return Err(TokenError::Expired);
        }
        Ok(payload)
    }

    /// Encodes and signs a payload into the three-segment wire form.
    fn encode(&self, payload: &TokenPayload) -> Result<String, TokenError> {
        let claims = serde_json::to_vec(payload)
            .map_err(|err| TokenError::Malformed(format!("claims json: {err}")))?;
        let signed = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(TOKEN_HEADER.as_bytes()),
            URL_SAFE_NO_PAD.encode(&claims)
        );
        let signature = self.sign(signed.as_bytes())?;
        Ok(format!("{signed}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Computes the HMAC-SHA256 signature over signed bytes.
    fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| TokenError::Key(err.to_string()))?;
        mac.update(bytes);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
