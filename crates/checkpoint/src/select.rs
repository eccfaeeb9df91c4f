//! Best-checkpoint selection over a remote namespace

use std::cmp::Ordering;

use storage::RemoteStore;
use tracing::debug;
use trainer_core::Result;

use crate::naming::Checkpoint;

/// Pick the single best checkpoint currently stored for a namespace
///
/// Lists the namespace fresh (no local cache is authoritative, since
/// multiple training runs can share it), decodes every key, skips the ones
/// that do not parse (unrelated objects are expected in the bucket), and
/// returns the maximum by validation accuracy with ties broken by highest
/// epoch. A linear scan is the whole algorithm: listings stay small
/// because checkpoints are written at most once per epoch and only on
/// improvement.
pub async fn best_checkpoint(
    store: &dyn RemoteStore,
    namespace: &str,
) -> Result<Option<Checkpoint>> {
    let keys = store.list(namespace).await?;

    let mut best: Option<Checkpoint> = None;
    for key in &keys {
        let candidate = match Checkpoint::parse(key) {
            Ok(candidate) => candidate,
            Err(_) => {
                debug!(%key, "Skipping unparseable remote key");
                continue;
            }
        };

        let better = match &best {
            None => true,
            Some(current) => {
                match candidate
                    .val_accuracy
                    .partial_cmp(&current.val_accuracy)
                    .unwrap_or(Ordering::Equal)
                {
                    Ordering::Greater => true,
                    Ordering::Equal => candidate.epoch > current.epoch,
                    Ordering::Less => false,
                }
            }
        };

        if better {
            best = Some(candidate);
        }
    }

    Ok(best)
}
