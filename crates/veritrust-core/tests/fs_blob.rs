// crates/veritrust-core/tests/fs_blob.rs
// ============================================================================
// Module: Filesystem Blob Store Tests
// Description: Validate blob persistence and path containment.
// Purpose: Ensure blobs stay under the root and deletes are idempotent.
// Dependencies: veritrust-core, tempfile
// ============================================================================

//! Filesystem blob store behavior including traversal rejection.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use veritrust_core::interfaces::BlobError;
use veritrust_core::interfaces::BlobStore;
use veritrust_core::runtime::FsBlobStore;

/// Nested blob paths save and reload byte-identically.
#[test]
fn blobs_round_trip_under_nested_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = FsBlobStore::new(dir.path().to_path_buf());
    store.save("samples/12/capture.json", b"{\"frames\":3}")?;
    let bytes = store.open("samples/12/capture.json")?;
    assert_eq!(bytes, b"{\"frames\":3}");
    Ok(())
}

/// Paths escaping the root are rejected as invalid.
#[test]
fn traversal_components_are_rejected_before_any_io() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = FsBlobStore::new(dir.path().to_path_buf());
    for path in ["../escape.json", "samples/../../escape.json", "/etc/passwd", ""] {
        let outcome = store.save(path, b"x");
        assert!(matches!(outcome, Err(BlobError::InvalidPath(_))), "path {path:?} accepted");
    }
    Ok(())
}

/// Deleting an absent blob is a no-op.
#[test]
fn deleting_a_missing_blob_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = FsBlobStore::new(dir.path().to_path_buf());
    store.delete("samples/never-written.json")?;
    let outcome = store.open("samples/never-written.json");
    assert!(matches!(outcome, Err(BlobError::NotFound(_))));
    Ok(())
}
