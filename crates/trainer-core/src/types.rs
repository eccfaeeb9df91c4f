//! Core type definitions shared across the training runtime

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Namespace scoping a family of checkpoints, e.g. a card-set name
pub type ModelNamespace = String;

/// Training epoch counter
pub type Epoch = u32;

/// Validation metrics produced by the trainer at the end of an epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Mean validation loss
    pub val_loss: f64,

    /// Validation accuracy in [0, 1]
    pub val_accuracy: f64,
}

/// Hook invoked by the trainer's epoch loop, strictly between epochs
///
/// The trainer is the sole writer of the checkpoint directory and hooks are
/// its sole readers; both run on the same single driver in alternation, so
/// no locking is needed. A hook must never be invoked re-entrantly.
#[async_trait]
pub trait EpochHook: Send {
    /// Called once after each completed epoch with the epoch index and the
    /// local checkpoint directory the trainer writes into.
    async fn on_epoch_end(&mut self, epoch: Epoch, checkpoint_dir: &Path) -> Result<()>;
}
