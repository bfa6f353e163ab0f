// crates/veritrust-core/src/runtime/fs_blob.rs
// ============================================================================
// Module: Veritrust Filesystem Blob Store
// Description: Blob storage rooted at a local directory.
// Purpose: Persist sample data and sidecar artifacts on the local filesystem.
// Dependencies: crate::interfaces, std::fs
// ============================================================================

//! ## Overview
//! [`FsBlobStore`] maps blob paths onto files under a fixed root directory.
//! Paths are validated component by component before any filesystem access;
//! traversal outside the root is rejected, never canonicalized away.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::interfaces::BlobError;
use crate::interfaces::BlobStore;

// ============================================================================
// SECTION: Filesystem Blob Store
// ============================================================================

/// Blob store backed by a local directory.
///
/// # Invariants
/// - Every access stays under the configured root.
/// - Parent directories are created on write as needed.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    /// Root directory every blob path is resolved against.
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a blob store rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves a blob path against the root, rejecting traversal.
    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        if path.is_empty() {
            return Err(BlobError::InvalidPath("empty blob path".to_string()));
        }
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(BlobError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

impl BlobStore for FsBlobStore {
    fn save(&self, path: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|err| BlobError::Io(err.to_string()))?;
        }
        fs::write(&resolved, bytes).map_err(|err| BlobError::Io(err.to_string()))
    }

    fn open(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let resolved = self.resolve(path)?;
        fs::read(&resolved).map_err(|err| match err.kind() {
            ErrorKind::NotFound => BlobError::NotFound(path.to_string()),
            _ => BlobError::Io(err.to_string()),
        })
    }

    fn delete(&self, path: &str) -> Result<(), BlobError> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobError::Io(err.to_string())),
        }
    }
}
