// crates/veritrust-webhooks/src/error.rs
// ============================================================================
// Module: Veritrust Webhook Errors
// Description: Ingestion failure taxonomy with HTTP status classes.
// Purpose: Distinguish sender mistakes from authentication failures and
//          platform faults at the ingestion boundary.
// Dependencies: veritrust-core, thiserror
// ============================================================================

//! ## Overview
//! Ingestion failures carry the HTTP status class the boundary should
//! answer with: unmatched traffic is not-found, ambiguous or malformed
//! traffic is a sender error, failed signatures are forbidden, and store
//! faults are server errors. Handler processing failures are not in this
//! taxonomy at all: they are captured on the stored message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use veritrust_core::interfaces::StoreError;

// ============================================================================
// SECTION: Webhook Errors
// ============================================================================

/// Ingestion boundary failure.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No enabled client declares a header present on the request.
    #[error("no webhook client matches the request")]
    ClientNotFound,
    /// More than one enabled client matches the request.
    #[error("multiple webhook clients match the request")]
    MultipleClients,
    /// The body is not valid JSON.
    #[error("malformed body: {0}")]
    MalformedBody(String),
    /// The client's handler is not registered.
    #[error("no handler registered under {0}")]
    UnknownHandler(String),
    /// The signature check failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// Returns the HTTP status class the boundary should answer with.
    #[must_use]
    pub const fn status_class(&self) -> u16 {
        match self {
            Self::ClientNotFound => 404,
            Self::MultipleClients | Self::MalformedBody(_) => 400,
            Self::AuthFailed(_) => 403,
            Self::UnknownHandler(_) | Self::Store(_) => 500,
        }
    }
}
