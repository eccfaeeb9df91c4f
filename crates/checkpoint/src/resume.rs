//! Startup orchestration: resume from the best remote checkpoint or start fresh

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storage::RemoteStore;
use tracing::{info, instrument, warn};
use trainer_core::{ModelNamespace, Result};

use crate::naming::Checkpoint;
use crate::select::best_checkpoint;

/// Outcome of the pre-training resume check
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeDecision {
    /// No prior checkpoint exists; the caller builds a new model from its
    /// architecture definition
    Fresh,

    /// A prior checkpoint was found and downloaded; the caller loads the
    /// model (architecture plus weights) from `local_path`
    Resume {
        checkpoint: Checkpoint,
        local_path: PathBuf,
    },
}

/// Runs once at process start, before the trainer's epoch loop
pub struct ResumeController {
    store: Arc<dyn RemoteStore>,
    namespace: ModelNamespace,
}

impl ResumeController {
    pub fn new(store: Arc<dyn RemoteStore>, namespace: impl Into<ModelNamespace>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Decide whether training resumes from a downloaded checkpoint
    ///
    /// Storage failures here are fatal: once a best checkpoint has been
    /// identified, silently training from scratch would discard progress.
    /// The one exception is the key vanishing between selection and
    /// download, which reads as "no checkpoint after all" and falls back
    /// to a fresh start — fatal unless not-found.
    #[instrument(skip(self, local_dir), fields(namespace = %self.namespace))]
    pub async fn prepare(&self, local_dir: &Path) -> Result<ResumeDecision> {
        let best = match best_checkpoint(self.store.as_ref(), &self.namespace).await? {
            Some(best) => best,
            None => {
                info!("No remote checkpoint found, starting fresh");
                return Ok(ResumeDecision::Fresh);
            }
        };

        let key = best.storage_key();
        let local_path = local_dir.join(&key);

        match self.store.download(&self.namespace, &key, &local_path).await {
            Ok(()) => {
                info!(
                    %key,
                    epoch = best.epoch,
                    val_accuracy = best.val_accuracy,
                    "Resuming from remote checkpoint"
                );
                Ok(ResumeDecision::Resume {
                    checkpoint: best,
                    local_path,
                })
            }
            Err(e) if e.is_not_found() => {
                warn!(%key, "Selected checkpoint vanished before download, starting fresh");
                Ok(ResumeDecision::Fresh)
            }
            Err(e) => Err(e),
        }
    }
}
