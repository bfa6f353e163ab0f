// crates/veritrust-pipeline/src/artifacts.rs
// ============================================================================
// Module: Veritrust Sidecar Artifacts
// Description: Terminal-outcome sidecar files written next to data blobs.
// Purpose: Make every terminal pipeline branch observable in blob storage.
// Dependencies: veritrust-core, serde_json
// ============================================================================

//! ## Overview
//! Every terminal branch of a pipeline operation leaves a JSON sidecar next
//! to the data blob it processed: `.valid` on success, `.error` on failure,
//! `.timeout` when the retry budget runs out. External consumers poll these
//! files instead of the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use veritrust_core::interfaces::BlobError;
use veritrust_core::interfaces::BlobStore;

// ============================================================================
// SECTION: Sidecars
// ============================================================================

/// Terminal outcome a sidecar records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarKind {
    /// The operation finished successfully.
    Valid,
    /// The operation failed.
    Error,
    /// The operation exceeded its retry budget.
    Timeout,
}

impl SidecarKind {
    /// Returns the path suffix for the sidecar.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Valid => ".valid",
            Self::Error => ".error",
            Self::Timeout => ".timeout",
        }
    }
}

/// Returns the sidecar path for a data blob and outcome.
#[must_use]
pub fn sidecar_path(data_path: &str, kind: SidecarKind) -> String {
    format!("{data_path}{}", kind.suffix())
}

/// Returns the audit artifact path for a data blob.
#[must_use]
pub fn audit_path(data_path: &str) -> String {
    format!("{data_path}__audit.json")
}

/// Writes a sidecar and returns its path.
///
/// # Errors
///
/// Returns [`BlobError`] when serialization or the write fails.
pub fn write_sidecar(
    blobs: &dyn BlobStore,
    data_path: &str,
    kind: SidecarKind,
    payload: &Value,
) -> Result<String, BlobError> {
    let path = sidecar_path(data_path, kind);
    let bytes =
        serde_json::to_vec(payload).map_err(|err| BlobError::Io(err.to_string()))?;
    blobs.save(&path, &bytes)?;
    Ok(path)
}
