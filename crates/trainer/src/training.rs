//! Epoch loop, save-best-only checkpoint writing, and final exports
//!
//! The loop owns the only thread that touches the checkpoint directory:
//! the writer appends new best checkpoints, then every registered epoch
//! hook runs to completion before the next epoch starts. Remote calls made
//! by hooks block the loop; epochs are long-running, so the latency is an
//! accepted cost rather than a correctness concern.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use tracing::{info, warn};
use trainer_core::{Epoch, EpochHook, EpochMetrics, Error, ModelNamespace, Result};

use checkpoint::Checkpoint;

use crate::data::ClassifiedImages;
use crate::model::{weights_bytes, CardNet, CardNetConfig};

/// Training hyperparameters
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: Epoch,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub val_fraction: f64,
    pub seed: u64,
    pub checkpoint_dir: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 200,
            batch_size: 32,
            learning_rate: 3e-4,
            val_fraction: 0.2,
            seed: 42,
            checkpoint_dir: PathBuf::from("checkpoints"),
        }
    }
}

/// Save-best-only local checkpoint writer
///
/// Writes `{namespace}-{epoch:03}-{loss:.3}-{acc:.3}.hdf5` into the
/// checkpoint directory only when validation accuracy improves on the
/// best seen so far. When a run resumes from a remote checkpoint, the
/// watermark is seeded with that checkpoint's accuracy so an early weak
/// epoch cannot shadow already-uploaded progress.
pub struct BestCheckpointWriter {
    namespace: ModelNamespace,
    dir: PathBuf,
    best_accuracy: Option<f64>,
}

impl BestCheckpointWriter {
    pub fn new(namespace: impl Into<ModelNamespace>, dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            namespace: namespace.into(),
            dir: dir.to_path_buf(),
            best_accuracy: None,
        })
    }

    /// Seed the improvement watermark from a resumed checkpoint
    pub fn seed_best(&mut self, accuracy: f64) {
        self.best_accuracy = Some(accuracy);
    }

    pub fn best_accuracy(&self) -> Option<f64> {
        self.best_accuracy
    }

    /// Write a checkpoint if this epoch is the best so far
    ///
    /// Returns the path written, or `None` when the epoch was not an
    /// improvement. The file lands under its final name via a temp-file
    /// rename, so the sync callback never sees a half-written checkpoint.
    pub fn write_if_best(
        &mut self,
        epoch: Epoch,
        metrics: EpochMetrics,
        weights: &[u8],
    ) -> Result<Option<PathBuf>> {
        if let Some(best) = self.best_accuracy {
            if metrics.val_accuracy <= best {
                return Ok(None);
            }
        }

        let key = Checkpoint::new(
            self.namespace.clone(),
            epoch,
            metrics.val_loss,
            metrics.val_accuracy,
        )
        .storage_key();

        let path = self.dir.join(&key);
        let tmp = self.dir.join(format!(".{}.tmp", key));
        std::fs::write(&tmp, weights)?;
        std::fs::rename(&tmp, &path)?;

        info!(
            epoch,
            val_accuracy = metrics.val_accuracy,
            key = %key,
            "New best checkpoint"
        );
        self.best_accuracy = Some(metrics.val_accuracy);
        Ok(Some(path))
    }
}

/// Single-driver trainer for the card-set classifier
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Run the epoch loop and return the trained model
    ///
    /// After every epoch: evaluate on the held-out split, offer the
    /// weights to the best-checkpoint writer, then invoke each hook in
    /// registration order. Hook failures are warnings; training state
    /// lives in the local checkpoint files, not in the hooks.
    pub async fn fit(
        &self,
        mut model: CardNet<B>,
        dataset: ClassifiedImages,
        writer: &mut BestCheckpointWriter,
        hooks: &mut [Box<dyn EpochHook>],
    ) -> Result<CardNet<B>> {
        if dataset.is_empty() {
            return Err(Error::Config {
                message: "dataset has no samples".to_string(),
            });
        }

        let (train, val) = dataset.split(self.config.val_fraction, self.config.seed);
        info!(
            train = train.len(),
            val = val.len(),
            epochs = self.config.epochs,
            "Starting training"
        );

        let train_loss_fn = CrossEntropyLossConfig::new().init(&self.device);
        let val_loss_fn = CrossEntropyLossConfig::new().init(&self.device);
        let mut optim: OptimizerAdaptor<Adam, CardNet<B>, B> = AdamConfig::new().init();

        for epoch in 1..=self.config.epochs {
            let mut train_loss = 0.0;
            let mut train_batches = 0usize;

            for batch in train.batches(self.config.batch_size) {
                let (inputs, targets) = train.load_batch::<B>(batch, &self.device)?;
                let logits = model.forward(inputs);
                let loss = train_loss_fn.forward(logits, targets);

                train_loss += loss.clone().into_scalar().elem::<f64>();
                train_batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            let metrics = self.evaluate(&model.valid(), &val, &val_loss_fn)?;
            info!(
                epoch,
                train_loss = train_loss / train_batches.max(1) as f64,
                val_loss = metrics.val_loss,
                val_accuracy = metrics.val_accuracy,
                "Epoch complete"
            );

            writer.write_if_best(epoch, metrics, &weights_bytes(&model)?)?;

            for hook in hooks.iter_mut() {
                if let Err(e) = hook.on_epoch_end(epoch, &self.config.checkpoint_dir).await {
                    warn!(epoch, error = %e, "Epoch hook failed");
                }
            }
        }

        Ok(model)
    }

    /// Compute validation loss and accuracy without autodiff
    fn evaluate(
        &self,
        model: &CardNet<B::InnerBackend>,
        val: &ClassifiedImages,
        loss_fn: &burn::nn::loss::CrossEntropyLoss<B::InnerBackend>,
    ) -> Result<EpochMetrics> {
        let mut loss_sum = 0.0;
        let mut batches = 0usize;
        let mut correct = 0i64;

        for batch in val.batches(self.config.batch_size) {
            let (inputs, targets) = val.load_batch::<B::InnerBackend>(batch, &self.device)?;
            let logits = model.forward(inputs);

            loss_sum += loss_fn
                .forward(logits.clone(), targets.clone())
                .into_scalar()
                .elem::<f64>();
            batches += 1;

            // argmax(1) keeps the reduced dim: [batch, 1] -> [batch]
            let predictions = logits.argmax(1).flatten::<1>(0, 1);
            correct += predictions
                .equal(targets)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();
        }

        Ok(EpochMetrics {
            val_loss: loss_sum / batches.max(1) as f64,
            val_accuracy: correct as f64 / val.len().max(1) as f64,
        })
    }
}

/// Write the final artifacts after the last epoch
///
/// `{namespace}_weights.bin` holds the weight record and
/// `{namespace}_model.json` the architecture config. Both land in the
/// checkpoint directory so the closing sync pass mirrors them remotely.
pub fn export_final<B: Backend>(
    model: &CardNet<B>,
    config: &CardNetConfig,
    namespace: &str,
    dir: &Path,
) -> Result<()> {
    std::fs::write(
        dir.join(format!("{}_weights.bin", namespace)),
        weights_bytes(model)?,
    )?;

    config
        .save(dir.join(format!("{}_model.json", namespace)))
        .map_err(|e| Error::Model {
            message: format!("failed to save model config: {}", e),
        })?;

    info!(namespace, "Exported final weights and model config");
    Ok(())
}
