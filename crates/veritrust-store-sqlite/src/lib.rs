// crates/veritrust-store-sqlite/src/lib.rs
// ============================================================================
// Module: Veritrust SQLite Store Library
// Description: Durable TrustStore over SQLite with WAL support.
// Purpose: Persist the full trust-platform state on a single database file.
// Dependencies: veritrust-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Veritrust SQLite Store implements every persistence trait of the platform
//! over one `SQLite` database file. Invariants:
//! - Contested transitions (model claims, summary gates) are transactional.
//! - Stored codes and JSON columns are decoded fail-closed; bad data is
//!   corruption, never a silent default.
//! - The schema carries a version row; unknown versions refuse to open.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
pub use store::SqliteTrustStore;
