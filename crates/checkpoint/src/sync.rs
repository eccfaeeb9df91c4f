//! Per-epoch mirroring of local checkpoint files to the remote store

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use storage::RemoteStore;
use tracing::{debug, info, warn};
use trainer_core::{Epoch, EpochHook, Error, ModelNamespace, Result};

/// Epoch-end callback that uploads newly written checkpoint files
///
/// Registered into the trainer's hook mechanism and invoked once after
/// every completed epoch, whether or not the epoch produced a new best
/// checkpoint (the save-best-only policy belongs to the checkpoint
/// writer, not to this callback). Uploads are idempotent: a filename
/// already present remotely is never uploaded again. Identity is by exact
/// name, not content — a local file whose bytes changed under an existing
/// name is deliberately left alone, since uploaded keys are write-once.
pub struct CheckpointSync {
    store: Arc<dyn RemoteStore>,
    namespace: ModelNamespace,
}

impl CheckpointSync {
    pub fn new(store: Arc<dyn RemoteStore>, namespace: impl Into<ModelNamespace>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Mirror the checkpoint directory, returning how many files uploaded
    ///
    /// Fails fast with a config error when the directory does not exist
    /// (the checkpoint writer creates it before the first epoch). Remote
    /// pre-flight failures abort this invocation only; the next epoch's
    /// callback retries from scratch. A failed upload of one file is
    /// logged at warn level and does not stop the remaining files.
    pub async fn sync_epoch(&self, epoch: Epoch, checkpoint_dir: &Path) -> Result<usize> {
        if !checkpoint_dir.is_dir() {
            return Err(Error::Config {
                message: format!(
                    "checkpoint directory {:?} does not exist",
                    checkpoint_dir
                ),
            });
        }

        self.store.ensure_namespace(&self.namespace).await?;

        let remote: HashSet<String> = self.store.list(&self.namespace).await?.into_iter().collect();
        let local = local_filenames(checkpoint_dir)?;

        let mut uploaded = 0;
        for name in &local {
            if remote.contains(name) {
                debug!(epoch, key = %name, "Already remote, skipping");
                continue;
            }

            let path = checkpoint_dir.join(name);
            match self.store.upload(&self.namespace, name, &path).await {
                Ok(()) => {
                    info!(epoch, key = %name, "Uploaded checkpoint");
                    uploaded += 1;
                }
                Err(e) => {
                    // Training continues; the local file stays the durable
                    // source of truth and the next epoch retries.
                    warn!(epoch, key = %name, error = %e, "Checkpoint upload failed");
                }
            }
        }

        Ok(uploaded)
    }
}

#[async_trait]
impl EpochHook for CheckpointSync {
    async fn on_epoch_end(&mut self, epoch: Epoch, checkpoint_dir: &Path) -> Result<()> {
        self.sync_epoch(epoch, checkpoint_dir).await.map(|_| ())
    }
}

/// Enumerate plain filenames in the checkpoint directory, sorted
///
/// Non-recursive; subdirectories and names that are not valid UTF-8 are
/// ignored.
fn local_filenames(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}
