// crates/veritrust-webhooks/src/request.rs
// ============================================================================
// Module: Veritrust Webhook Request
// Description: Framework-neutral inbound HTTP request snapshot.
// Purpose: Carry raw headers and body bytes into client matching and
//          signature checks.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Ingestion never sees the web framework: callers snapshot the inbound
//! request into a [`WebhookRequest`] holding the raw body bytes and an
//! uppercase header map. The raw bytes matter because signatures are
//! computed over the body exactly as it arrived on the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Request Snapshot
// ============================================================================

/// One inbound webhook delivery.
///
/// # Invariants
/// - Header names are stored uppercase; lookups are case-insensitive.
/// - `body` is the wire payload, untouched.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Uppercase header name to value.
    headers: BTreeMap<String, String>,
    /// Raw body bytes as received.
    body: Vec<u8>,
}

impl WebhookRequest {
    /// Builds a request snapshot, normalizing header names to uppercase.
    #[must_use]
    pub fn new(
        headers: impl IntoIterator<Item = (String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_uppercase(), value))
                .collect(),
            body,
        }
    }

    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Returns true when the header is present, regardless of value.
    #[must_use]
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_uppercase())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
