// crates/veritrust-webhooks/src/dispatch.rs
// ============================================================================
// Module: Veritrust Webhook Dispatch
// Description: Client matching, persistence, and handler execution.
// Purpose: Turn raw inbound deliveries into processed webhook messages.
// Dependencies: crate::{error, handlers, request}, veritrust-core
// ============================================================================

//! ## Overview
//! Ingestion matches enabled clients by header presence: exactly one client
//! must declare a header the request carries. The body is parsed and
//! persisted before authentication so failed deliveries stay auditable;
//! authentication failures mark the message and propagate, while handler
//! processing failures are captured on the message and answered as accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use veritrust_core::Timestamp;
use veritrust_core::WebhookClient;
use veritrust_core::WebhookStatus;
use veritrust_core::core::identifiers::WebhookMessageId;
use veritrust_core::interfaces::NewWebhookMessage;
use veritrust_core::interfaces::TrustStore;

use crate::error::WebhookError;
use crate::handlers::HandlerRegistry;
use crate::request::WebhookRequest;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Webhook ingestion entry point.
pub struct WebhookDispatcher {
    /// Persistence backend.
    store: Arc<dyn TrustStore + Send + Sync>,
    /// Handlers keyed as client records reference them.
    registry: HandlerRegistry,
}

impl WebhookDispatcher {
    /// Creates the dispatcher over a store and a handler registry.
    #[must_use]
    pub fn new(store: Arc<dyn TrustStore + Send + Sync>, registry: HandlerRegistry) -> Self {
        Self { store, registry }
    }

    /// Ingests one inbound delivery and returns the stored message key.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] when no client or more than one client
    /// matches, the body is not JSON, authentication fails, or the backend
    /// fails. Handler processing failures are captured on the message and
    /// do not error.
    pub fn ingest(
        &self,
        request: &WebhookRequest,
        now: Timestamp,
    ) -> Result<WebhookMessageId, WebhookError> {
        let client = self.match_client(request)?;
        let handler = self
            .registry
            .get(&client.handler)
            .ok_or_else(|| WebhookError::UnknownHandler(client.handler.clone()))?
            .clone();

        let body: serde_json::Value = serde_json::from_slice(request.body())
            .map_err(|err| WebhookError::MalformedBody(err.to_string()))?;
        let external_id = client
            .id_header
            .as_deref()
            .and_then(|name| request.header(name))
            .map(str::to_owned);
        let message_id = self.store.insert_message(&NewWebhookMessage {
            client_id: client.id,
            external_id,
            body,
            received_at: now,
        })?;

        if let Err(err) = handler.authenticate(&client, request) {
            self.store.set_message_status(
                message_id,
                WebhookStatus::Error,
                Some(&err.to_string()),
            )?;
            return Err(err);
        }

        self.store
            .set_message_status(message_id, WebhookStatus::Processing, None)?;
        let message = self
            .store
            .webhook_message(message_id)?
            .ok_or_else(|| {
                WebhookError::Store(veritrust_core::StoreError::NotFound(format!(
                    "webhook message {message_id}"
                )))
            })?;
        match handler.process(&client, &message) {
            Ok(()) => {
                self.store
                    .set_message_status(message_id, WebhookStatus::Processed, None)?;
            }
            Err(err) => {
                self.store.set_message_status(
                    message_id,
                    WebhookStatus::Error,
                    Some(&err.to_string()),
                )?;
            }
        }
        Ok(message_id)
    }

    /// Matches exactly one enabled client by declared header presence.
    fn match_client(&self, request: &WebhookRequest) -> Result<WebhookClient, WebhookError> {
        let mut matched: Vec<WebhookClient> = self
            .store
            .enabled_clients()?
            .into_iter()
            .filter(|client| request.has_header(&client.header))
            .collect();
        match matched.len() {
            0 => Err(WebhookError::ClientNotFound),
            1 => matched.pop().ok_or(WebhookError::ClientNotFound),
            _ => Err(WebhookError::MultipleClients),
        }
    }
}
