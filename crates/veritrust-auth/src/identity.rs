// crates/veritrust-auth/src/identity.rs
// ============================================================================
// Module: Veritrust Identity Resolver
// Description: Map verified token claims onto stored actor records.
// Purpose: Provide strict, fail-closed credential-to-actor resolution.
// Dependencies: crate::token, veritrust-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The resolver turns an `Authorization` header into an [`Identity`]. Group
//! dispatch is ordered and closed: `learners` resolves by subject, `users`
//! resolves admins by primary key and everyone else by uid with a primary-key
//! fallback, `module_*` resolves by the declared module type, and every other
//! group is rejected. An absent header
//! yields the inert unauthenticated actor rather than an error; everything
//! else that goes wrong is an authentication failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use veritrust_core::Actor;
use veritrust_core::StoreError;
use veritrust_core::Timestamp;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::UserId;
use veritrust_core::core::identifiers::VleId;
use veritrust_core::interfaces::TrustStore;

use crate::token::TokenCodec;
use crate::token::TokenError;
use crate::token::TokenIdentity;
use crate::token::TokenPayload;
use crate::token::TokenUse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Authorization scheme accepted by the resolver.
const AUTH_SCHEME: &str = "JWT";

/// Group carrying learner principals.
const GROUP_LEARNERS: &str = "learners";

/// Group carrying institution users and global administrators.
const GROUP_USERS: &str = "users";

/// Prefix of groups carrying platform modules.
const GROUP_MODULE_PREFIX: &str = "module_";

/// Token type marking a global administrator within the users group.
const KIND_ADMIN: &str = "admin";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors raised during identity resolution.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Every variant denies access; none falls back to a weaker identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Authorization header is present but structurally unusable.
    #[error("invalid authorization header: {0}")]
    InvalidHeader(String),
    /// Token failed verification.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Payload group is outside the closed dispatch set.
    #[error("invalid payload group: {0}")]
    InvalidPayloadGroup(String),
    /// Learner claims do not resolve to a learner record.
    #[error("learner credentials do not resolve")]
    InvalidLearner,
    /// User claims do not resolve to a user record.
    #[error("user credentials do not resolve")]
    InvalidUser,
    /// Module claims do not resolve to a module record.
    #[error("module credentials do not resolve")]
    InvalidModule,
    /// Module group declares an unknown module type.
    #[error("invalid module type: {0}")]
    InvalidModuleType(String),
    /// Resolved actor is deactivated or disabled.
    #[error("actor is not active")]
    InactiveActor,
    /// Debug resolution attempted while disabled.
    #[error("debug authentication is disabled")]
    DebugDisabled,
    /// Store lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// A resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Resolved actor.
    pub actor: Actor,
    /// Scope strings carried from the token, opaque to the resolver.
    pub scope: Vec<String>,
    /// Filter strings carried from the token, opaque to the resolver.
    pub filters: Vec<String>,
}

impl Identity {
    /// Returns the inert unauthenticated identity.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            actor: Actor::Unauthenticated,
            scope: Vec::new(),
            filters: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves authorization headers into identities.
#[derive(Clone)]
pub struct IdentityResolver {
    /// Token codec verifying credential envelopes.
    codec: TokenCodec,
    /// Store backing actor lookups.
    store: Arc<dyn TrustStore + Send + Sync>,
}

impl IdentityResolver {
    /// Creates a resolver over a codec and store.
    #[must_use]
    pub fn new(codec: TokenCodec, store: Arc<dyn TrustStore + Send + Sync>) -> Self {
        Self { codec, store }
    }

    /// Resolves a raw `Authorization` header value.
    ///
    /// An absent header resolves to the unauthenticated identity. A header
    /// using a different scheme also resolves unauthenticated so other
    /// authenticators may claim it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the header is malformed or the credentials
    /// fail verification or resolution.
    pub fn resolve_header(
        &self,
        header: Option<&[u8]>,
        now: Timestamp,
    ) -> Result<Identity, AuthError> {
        let Some(raw) = header else {
            return Ok(Identity::unauthenticated());
        };
        let text = std::str::from_utf8(raw).map_err(|_| {
            AuthError::InvalidHeader("header contains invalid characters".to_string())
        })?;
        let mut parts = text.split_whitespace();
        let scheme = parts.next().unwrap_or_default();
        if !scheme.eq_ignore_ascii_case(AUTH_SCHEME) {
            return Ok(Identity::unauthenticated());
        }
        let Some(token) = parts.next() else {
            return Err(AuthError::InvalidHeader(
                "no credentials provided".to_string(),
            ));
        };
        if parts.next().is_some() {
            return Err(AuthError::InvalidHeader(
                "credentials must not contain spaces".to_string(),
            ));
        }
        self.resolve_token(token, now)
    }

    /// Verifies an access token and resolves its claims to an actor.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on verification failure, unknown groups,
    /// unresolvable claims, or inactive actors.
    pub fn resolve_token(&self, token: &str, now: Timestamp) -> Result<Identity, AuthError> {
        let payload = self.codec.verify(token, now)?;
        if payload.token_use != TokenUse::Access {
            return Err(AuthError::Token(TokenError::Malformed(
                "refresh token used for access".to_string(),
            )));
        }
        self.resolve_payload(&payload)
    }

    /// Dispatches verified claims by group.
    fn resolve_payload(&self, payload: &TokenPayload) -> Result<Identity, AuthError> {
        let identity = &payload.identity;
        let actor = if identity.group == GROUP_LEARNERS {
            self.resolve_learner(identity)?
        } else if identity.group == GROUP_USERS {
            self.resolve_user(identity)?
        } else if identity.group.starts_with(GROUP_MODULE_PREFIX) {
            self.resolve_module(identity)?
        } else {
            return Err(AuthError::InvalidPayloadGroup(identity.group.clone()));
        };
        if !actor.is_active() {
            return Err(AuthError::InactiveActor);
        }
        Ok(Identity {
            actor,
            scope: identity.scope.clone(),
            filters: identity.filters.clone(),
        })
    }

    /// Resolves a learner by stable subject identifier.
    fn resolve_learner(&self, identity: &TokenIdentity) -> Result<Actor, AuthError> {
        let subject = identity
            .sub
            .as_deref()
            .ok_or(AuthError::InvalidLearner)?;
        let learner = self
            .store
            .learner_by_subject(&SubjectId::from(subject))?
            .ok_or(AuthError::InvalidLearner)?;
        Ok(Actor::Learner(learner))
    }

    /// Resolves a user: admins by primary key, others uid-first with a
    /// primary-key fallback.
    fn resolve_user(&self, identity: &TokenIdentity) -> Result<Actor, AuthError> {
        if identity.kind.as_deref() == Some(KIND_ADMIN) {
            return self.user_by_pk(identity.pk);
        }
        if let Some(uid) = identity.sub.as_deref()
            && let Some(user) = self.store.user_by_uid(uid)?
        {
            return Ok(Actor::User(user));
        }
        self.user_by_pk(identity.pk)
    }

    /// Looks up a user record by its primary-key claim.
    fn user_by_pk(&self, pk: Option<u64>) -> Result<Actor, AuthError> {
        let raw = pk.ok_or(AuthError::InvalidUser)?;
        let id = UserId::from_raw(raw).ok_or(AuthError::InvalidUser)?;
        let user = self.store.user(id)?.ok_or(AuthError::InvalidUser)?;
        Ok(Actor::User(user))
    }

    /// Resolves a module actor by declared type and primary key.
    fn resolve_module(&self, identity: &TokenIdentity) -> Result<Actor, AuthError> {
        let kind = identity
            .kind
            .as_deref()
            .ok_or_else(|| AuthError::InvalidModuleType("absent".to_string()))?;
        let pk = identity.pk.ok_or(AuthError::InvalidModule)?;
        match kind {
            "vle" => {
                let id = VleId::from_raw(pk).ok_or(AuthError::InvalidModule)?;
                let vle = self.store.vle(id)?.ok_or(AuthError::InvalidModule)?;
                Ok(Actor::Vle(vle))
            }
            "provider" => {
                let id = ProviderId::from_raw(pk).ok_or(AuthError::InvalidModule)?;
                let provider = self
                    .store
                    .provider(id)?
                    .ok_or(AuthError::InvalidModule)?;
                Ok(Actor::Provider(provider))
            }
            other => Err(AuthError::InvalidModuleType(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Debug Resolver
// ============================================================================

/// Actor reference used by the explicit debug override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DebugActorRef {
    /// Learner by numeric key.
    Learner(u64),
    /// User by numeric key.
    User(u64),
    /// VLE by numeric key.
    Vle(u64),
    /// Provider by numeric key.
    Provider(u64),
}

/// Resolver that materializes an identity from an explicit override.
///
/// This is a deliberately separate type: it is constructed only when the
/// deployment enables debug authentication, and it never participates in the
/// credential path.
#[derive(Clone)]
pub struct DebugIdentityResolver {
    /// Store backing actor lookups.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Whether debug resolution is enabled at all.
    enabled: bool,
}

impl DebugIdentityResolver {
    /// Creates a debug resolver; `enabled` comes from validated config.
    #[must_use]
    pub fn new(store: Arc<dyn TrustStore + Send + Sync>, enabled: bool) -> Self {
        Self { store, enabled }
    }

    /// Resolves an explicit actor reference.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DebugDisabled`] when disabled, and the usual
    /// resolution failures otherwise.
    pub fn resolve(&self, actor_ref: DebugActorRef) -> Result<Identity, AuthError> {
        if !self.enabled {
            return Err(AuthError::DebugDisabled);
        }
        let actor = match actor_ref {
            DebugActorRef::Learner(raw) => {
                let id = LearnerId::from_raw(raw).ok_or(AuthError::InvalidLearner)?;
                Actor::Learner(self.store.learner(id)?.ok_or(AuthError::InvalidLearner)?)
            }
            DebugActorRef::User(raw) => {
                let id = UserId::from_raw(raw).ok_or(AuthError::InvalidUser)?;
                Actor::User(self.store.user(id)?.ok_or(AuthError::InvalidUser)?)
            }
            DebugActorRef::Vle(raw) => {
                let id = VleId::from_raw(raw).ok_or(AuthError::InvalidModule)?;
                Actor::Vle(self.store.vle(id)?.ok_or(AuthError::InvalidModule)?)
            }
            DebugActorRef::Provider(raw) => {
                let id = ProviderId::from_raw(raw).ok_or(AuthError::InvalidModule)?;
                Actor::Provider(self.store.provider(id)?.ok_or(AuthError::InvalidModule)?)
            }
        };
        if !actor.is_active() {
            return Err(AuthError::InactiveActor);
        }
        Ok(Identity {
            actor,
            scope: Vec::new(),
            filters: Vec::new(),
        })
    }
}
