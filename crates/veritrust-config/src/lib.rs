// crates/veritrust-config/src/lib.rs
// ============================================================================
// Module: Veritrust Config Library
// Description: TOML platform configuration with fail-closed validation.
// Purpose: Turn deployment files into validated, ready-to-use settings.
// Dependencies: veritrust-core, veritrust-auth, veritrust-pipeline,
//               veritrust-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Veritrust Config loads the platform's TOML configuration under strict
//! limits and validates every section before anything starts. Invariants:
//! - The signing secret has no default; an unconfigured deployment refuses
//!   to issue tokens rather than signing with a guessable value.
//! - The debug identity override is refused unless explicitly allowed.
//! - Webhook client seeds must be unambiguous: one enabled client per
//!   attribution header.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::ConfigError;
pub use config::QueueConfig;
pub use config::RetryConfig;
pub use config::StorageConfig;
pub use config::VeritrustConfig;
pub use config::WebhookClientSeed;
pub use config::WebhooksConfig;
