// crates/veritrust-core/src/core/webhooks.rs
// ============================================================================
// Module: Veritrust Webhook Entities
// Description: Webhook client registrations and persisted inbound messages.
// Purpose: Model webhook ingestion state independent of any HTTP surface.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A webhook client declares the uppercase header that identifies its traffic
//! and the shared secret used to authenticate it. Every inbound message is
//! persisted before processing so that handler failures are captured on the
//! message row instead of being lost with the request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::WebhookClientId;
use crate::core::identifiers::WebhookMessageId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Webhook Status
// ============================================================================

/// Lifecycle status of a persisted webhook message.
///
/// # Invariants
/// - Numeric codes are stable; `Timeout` is reserved and never set today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    /// Message persisted, not yet picked up.
    Created,
    /// A handler is processing the message.
    Processing,
    /// Handler finished successfully.
    Processed,
    /// Handler failed; the error is recorded on the message.
    Error,
    /// Reserved for future watchdog timeouts.
    Timeout,
}

impl WebhookStatus {
    /// Returns the stable numeric code for the status.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Processing => 1,
            Self::Processed => 2,
            Self::Error => 3,
            Self::Timeout => 4,
        }
    }

    /// Parses a status from its numeric code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Created),
            1 => Some(Self::Processing),
            2 => Some(Self::Processed),
            3 => Some(Self::Error),
            4 => Some(Self::Timeout),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Webhook Client
// ============================================================================

/// A registered webhook sender.
///
/// # Invariants
/// - `header` is stored uppercase; matching is by header presence.
/// - Disabled clients never match inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookClient {
    /// Client numeric key.
    pub id: WebhookClientId,
    /// Human-readable client name.
    pub name: String,
    /// Uppercase header name identifying this client's traffic.
    pub header: String,
    /// Optional uppercase header carrying the sender's own message id.
    pub id_header: Option<String>,
    /// Shared secret used by the client's handler for authentication.
    pub secret: String,
    /// Handler registry key, such as `signed-provider` or `tpt`.
    pub handler: String,
    /// Whether the client is accepted at ingestion.
    pub enabled: bool,
}

// ============================================================================
// SECTION: Webhook Message
// ============================================================================

/// A persisted inbound webhook message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookMessage {
    /// Message numeric key.
    pub id: WebhookMessageId,
    /// Matched client.
    pub client_id: WebhookClientId,
    /// Sender-supplied message id, when the client declares an id header.
    pub external_id: Option<String>,
    /// Parsed JSON body as received.
    pub body: Value,
    /// Lifecycle status.
    pub status: WebhookStatus,
    /// Handler error captured when status is `Error`.
    pub error_message: Option<String>,
    /// Time the message was persisted.
    pub received_at: Timestamp,
}
