// crates/veritrust-core/src/runtime/mod.rs
// ============================================================================
// Module: Veritrust Runtime
// Description: Reference implementations of the Veritrust interfaces.
// Purpose: Provide in-memory and filesystem runtimes for tests and demos.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime implementations back the interface traits without external
//! services: an in-memory store and scheduler for tests, and a filesystem
//! blob store for local deployments.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fs_blob;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fs_blob::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use memory::InMemoryTrustStore;
pub use memory::RecordingScheduler;
