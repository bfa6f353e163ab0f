// crates/veritrust-webhooks/src/lib.rs
// ============================================================================
// Module: Veritrust Webhooks Library
// Description: Inbound webhook ingestion with signed-client authentication.
// Purpose: Accept, authenticate, persist, and process external notifications.
// Dependencies: veritrust-core, veritrust-pipeline, hmac, sha2, subtle, hex
// ============================================================================

//! ## Overview
//! Veritrust Webhooks owns the inbound notification boundary. Traffic is
//! attributed to registered clients by header presence, authenticated with
//! a constant-time HMAC-SHA512 body signature, persisted for audit, and
//! routed to the handler the client record names. Invariants:
//! - Ambiguous traffic is rejected; a delivery matches exactly one client.
//! - Authentication failures propagate; processing failures are captured
//!   on the stored message.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod request;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatch::WebhookDispatcher;
pub use error::WebhookError;
pub use handlers::HANDLER_SIGNED_PROVIDER;
pub use handlers::HANDLER_TPT;
pub use handlers::HandlerError;
pub use handlers::HandlerRegistry;
pub use handlers::SIGNATURE_HEADER;
pub use handlers::SignedProviderHandler;
pub use handlers::TptHandler;
pub use handlers::WebhookHandler;
pub use handlers::verify_signature;
pub use request::WebhookRequest;
