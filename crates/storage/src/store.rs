//! Remote store trait definition
//!
//! Defines the async interface that all remote object stores implement.

use std::path::Path;

use async_trait::async_trait;
use trainer_core::{Error, Result};
use uuid::Uuid;

/// Async trait for remote object stores
///
/// One namespace maps to one bucket/prefix on the provider side. All keys
/// are write-once: nothing in this subsystem overwrites or deletes a
/// remote object. Implementations are injected as `Arc<dyn RemoteStore>`
/// so tests can substitute an in-memory fake.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create the backing bucket for a namespace if it does not exist
    ///
    /// Succeeds silently (no-op) when the bucket already exists. Fails with
    /// a storage error only on a genuine provider-side denial distinct
    /// from "already exists".
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    /// List all storage keys currently present in a namespace
    ///
    /// Returns an empty listing both for an empty bucket and for a
    /// namespace whose bucket was never created; a never-trained card set
    /// must read as "no checkpoints", not as a provider 404. The listing
    /// is read fresh on every call since multiple training runs can share
    /// a namespace.
    async fn list(&self, namespace: &str) -> Result<Vec<String>>;

    /// Stream a local file's bytes to the given key
    ///
    /// No atomicity is assumed: on I/O or network failure the remote
    /// object is either absent or in a provider-defined partial state.
    async fn upload(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()>;

    /// Download the full object content for a key to a local path
    ///
    /// Fails with `Error::KeyNotFound` if the key does not exist;
    /// otherwise writes the object to `local_path`, creating parent
    /// directories as needed.
    async fn download(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()>;
}

/// Write bytes to a local path via a unique temp file plus rename, so a
/// failed download never leaves a truncated checkpoint behind.
pub(crate) async fn persist_to(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Storage {
                message: format!("failed to create directory {:?}: {}", parent, e),
            })?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, data)
        .await
        .map_err(|e| Error::Storage {
            message: format!("failed to write {:?}: {}", temp_path, e),
        })?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::Storage {
            message: format!("failed to rename {:?} to {:?}: {}", temp_path, path, e),
        })?;

    Ok(())
}
