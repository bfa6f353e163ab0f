// crates/veritrust-webhooks/src/handlers.rs
// ============================================================================
// Module: Veritrust Webhook Handlers
// Description: Signature verification and per-client message handlers.
// Purpose: Authenticate inbound traffic and act on provider notifications.
// Dependencies: veritrust-core, veritrust-pipeline, hmac, sha2, subtle, hex
// ============================================================================

//! ## Overview
//! Each webhook client names a handler by registry key. Every shipped
//! handler authenticates with the same scheme: the `TESLA-SIGN` header
//! carries the lowercase hex HMAC-SHA512 of the raw body under the client
//! secret, compared in constant time. The `signed-provider` handler only
//! persists; the `tpt` handler additionally lands provider verification
//! results on their request rows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use thiserror::Error;

use veritrust_core::ResultCode;
use veritrust_core::ResultStatus;
use veritrust_core::WebhookClient;
use veritrust_core::WebhookMessage;
use veritrust_core::core::identifiers::RequestId;
use veritrust_core::interfaces::TrustStore;
use veritrust_pipeline::ProviderOutcome;
use veritrust_pipeline::VerificationTasks;

use crate::error::WebhookError;
use crate::request::WebhookRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "TESLA-SIGN";

/// Registry key of the persist-only signed handler.
pub const HANDLER_SIGNED_PROVIDER: &str = "signed-provider";

/// Registry key of the third-party tool handler.
pub const HANDLER_TPT: &str = "tpt";

type HmacSha512 = Hmac<Sha512>;

// ============================================================================
// SECTION: Handler Contract
// ============================================================================

/// Handler-side processing failure, captured on the stored message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Per-client message handler.
pub trait WebhookHandler: Send + Sync {
    /// Authenticates the raw request for the matched client.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::AuthFailed`] when the request cannot be
    /// attributed to the client.
    fn authenticate(
        &self,
        client: &WebhookClient,
        request: &WebhookRequest,
    ) -> Result<(), WebhookError>;

    /// Processes a persisted, authenticated message.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the message cannot be acted on; the
    /// dispatcher captures it on the message row.
    fn process(&self, client: &WebhookClient, message: &WebhookMessage)
    -> Result<(), HandlerError>;
}

/// Verifies the signature header against the raw body.
///
/// # Errors
///
/// Returns [`WebhookError::AuthFailed`] when the header is absent, the key
/// is unusable, or the digests differ. The presented digest must be the
/// lowercase hex encoding, compared byte for byte.
pub fn verify_signature(
    client: &WebhookClient,
    request: &WebhookRequest,
) -> Result<(), WebhookError> {
    let presented = request
        .header(SIGNATURE_HEADER)
        .ok_or_else(|| WebhookError::AuthFailed("missing signature header".to_owned()))?;
    let mut mac = HmacSha512::new_from_slice(client.secret.as_bytes())
        .map_err(|_| WebhookError::AuthFailed("unusable client secret".to_owned()))?;
    mac.update(request.body());
    let expected = hex::encode(mac.finalize().into_bytes());
    let matches: bool = presented.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        return Err(WebhookError::AuthFailed("signature mismatch".to_owned()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Signed Provider Handler
// ============================================================================

/// Persist-only handler for signed provider notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedProviderHandler;

impl WebhookHandler for SignedProviderHandler {
    fn authenticate(
        &self,
        client: &WebhookClient,
        request: &WebhookRequest,
    ) -> Result<(), WebhookError> {
        verify_signature(client, request)
    }

    fn process(
        &self,
        _client: &WebhookClient,
        _message: &WebhookMessage,
    ) -> Result<(), HandlerError> {
        // Persistence is the whole contract; consumers poll the store.
        Ok(())
    }
}

// ============================================================================
// SECTION: Third-Party Tool Handler
// ============================================================================

/// Wire shape of a third-party tool notification.
#[derive(Debug, Deserialize)]
struct TptNotification {
    /// Action discriminator; only `UPDATE_RESULT` is supported.
    action: String,
    /// Request the result belongs to.
    request: u64,
    /// Acronym of the answering provider.
    provider: String,
    /// Row status code.
    status: u8,
    /// Numeric score, when processed.
    #[serde(default)]
    result: Option<f64>,
    /// Alert severity code.
    code: u8,
    /// Audit payload to persist next to the request data.
    #[serde(default)]
    audit: Option<Value>,
}

/// Handler landing third-party tool results on verification rows.
pub struct TptHandler {
    /// Catalog lookup for provider acronyms.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Verification service receiving the results.
    verification: Arc<VerificationTasks>,
}

impl TptHandler {
    /// Creates the handler over its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn TrustStore + Send + Sync>,
        verification: Arc<VerificationTasks>,
    ) -> Self {
        Self {
            store,
            verification,
        }
    }
}

impl WebhookHandler for TptHandler {
    fn authenticate(
        &self,
        client: &WebhookClient,
        request: &WebhookRequest,
    ) -> Result<(), WebhookError> {
        verify_signature(client, request)
    }

    fn process(
        &self,
        _client: &WebhookClient,
        message: &WebhookMessage,
    ) -> Result<(), HandlerError> {
        let notification: TptNotification = serde_json::from_value(message.body.clone())
            .map_err(|err| HandlerError(format!("notification shape: {err}")))?;
        if notification.action != "UPDATE_RESULT" {
            return Err(HandlerError(format!(
                "unsupported action {}",
                notification.action
            )));
        }

        let request_id = RequestId::from_raw(notification.request)
            .ok_or_else(|| HandlerError("request id must be non-zero".to_owned()))?;
        let provider = self
            .store
            .provider_by_acronym(&notification.provider)
            .map_err(|err| HandlerError(err.to_string()))?
            .ok_or_else(|| {
                HandlerError(format!("unknown provider {}", notification.provider))
            })?;
        let status = ResultStatus::from_code(notification.status)
            .ok_or_else(|| HandlerError(format!("unknown status code {}", notification.status)))?;
        let code = ResultCode::from_code(notification.code)
            .ok_or_else(|| HandlerError(format!("unknown result code {}", notification.code)))?;

        self.verification
            .update_provider_result(
                request_id,
                provider.id,
                &ProviderOutcome {
                    status,
                    result: notification.result,
                    code,
                    audit: notification.audit,
                },
            )
            .map_err(|err| HandlerError(err.to_string()))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// String-keyed handler registry referenced by client records.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Registry key to handler.
    handlers: BTreeMap<String, Arc<dyn WebhookHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers a handler under a key, replacing any previous one.
    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn WebhookHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    /// Returns the handler registered under a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<dyn WebhookHandler>> {
        self.handlers.get(key)
    }
}
