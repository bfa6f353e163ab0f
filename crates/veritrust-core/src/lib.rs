// crates/veritrust-core/src/lib.rs
// ============================================================================
// Module: Veritrust Core Library
// Description: Domain model, interfaces, and reference runtimes for Veritrust.
// Purpose: Provide the deterministic core shared by every Veritrust component.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Veritrust Core holds the deterministic heart of the trust platform: the
//! domain entities with their stable status-code tables, the backend-agnostic
//! persistence and scheduling interfaces, and reference runtimes for tests.
//! Invariants:
//! - Core logic never reads the wall clock; all times are caller-supplied.
//! - Status codes are stable wire values shared with external providers.
//! - Missing or invalid data fails closed, never defaults open.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BlobError;
pub use interfaces::BlobStore;
pub use interfaces::ScheduleError;
pub use interfaces::StoreError;
pub use interfaces::TaskKind;
pub use interfaces::TaskRequest;
pub use interfaces::TaskScheduler;
pub use interfaces::TrustStore;
pub use runtime::FsBlobStore;
pub use runtime::InMemoryBlobStore;
pub use runtime::InMemoryTrustStore;
pub use runtime::RecordingScheduler;
