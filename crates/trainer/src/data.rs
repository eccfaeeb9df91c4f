//! Directory-organized image dataset
//!
//! The dataset root holds one subdirectory per card class
//! (`{namespace}_sorted/<class>/*.jpg`); the class label is the directory
//! name. Images are decoded lazily per batch, resized to the configured
//! edge length, and rescaled to [0, 1]. No further augmentation is
//! applied.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use image::imageops::FilterType;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;
use trainer_core::{Error, Result};

/// A labeled image dataset scanned from a class-per-directory tree
#[derive(Debug, Clone)]
pub struct ClassifiedImages {
    classes: Vec<String>,
    samples: Vec<(PathBuf, usize)>,
    image_size: usize,
}

impl ClassifiedImages {
    /// Scan the dataset root
    ///
    /// Class names are the sorted subdirectory names, so label indices are
    /// stable across runs. A missing root or a root without class
    /// directories is a fatal pre-flight error.
    pub fn scan(root: &Path, image_size: usize) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Config {
                message: format!("dataset directory {:?} does not exist", root),
            });
        }

        let mut classes = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    classes.push(name);
                }
            }
        }
        classes.sort();

        if classes.is_empty() {
            return Err(Error::Config {
                message: format!("dataset directory {:?} has no class directories", root),
            });
        }

        let mut samples = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            for entry in std::fs::read_dir(root.join(class))? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    samples.push((entry.path(), label));
                }
            }
        }
        samples.sort();

        info!(
            root = %root.display(),
            classes = classes.len(),
            samples = samples.len(),
            "Scanned dataset"
        );

        Ok(Self {
            classes,
            samples,
            image_size,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Deterministically shuffle and split into train and validation sets
    ///
    /// The same seed always yields the same split, so a resumed run sees
    /// the same held-out images as the run that wrote the checkpoint.
    pub fn split(mut self, val_fraction: f64, seed: u64) -> (Self, Self) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);

        let val_len = ((self.samples.len() as f64) * val_fraction).round() as usize;
        let val_len = val_len.min(self.samples.len());
        let val_samples = self.samples.split_off(self.samples.len() - val_len);

        let val = Self {
            classes: self.classes.clone(),
            samples: val_samples,
            image_size: self.image_size,
        };
        (self, val)
    }

    /// Iterate the samples in fixed-size batches
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = &[(PathBuf, usize)]> {
        self.samples.chunks(batch_size.max(1))
    }

    /// Decode one batch into input and target tensors
    ///
    /// Inputs are `[batch, 3, size, size]` channel-first floats in [0, 1];
    /// targets are the class indices.
    pub fn load_batch<B: Backend>(
        &self,
        batch: &[(PathBuf, usize)],
        device: &B::Device,
    ) -> Result<(Tensor<B, 4>, Tensor<B, 1, Int>)> {
        let size = self.image_size;
        let mut pixels = Vec::with_capacity(batch.len() * 3 * size * size);
        let mut labels = Vec::with_capacity(batch.len());

        for (path, label) in batch {
            let img = image::open(path)
                .map_err(|e| Error::Model {
                    message: format!("failed to decode image {:?}: {}", path, e),
                })?
                .resize_exact(size as u32, size as u32, FilterType::Triangle)
                .to_rgb8();

            let raw = img.as_raw();
            for channel in 0..3 {
                for i in 0..size * size {
                    pixels.push(f32::from(raw[i * 3 + channel]) / 255.0);
                }
            }
            labels.push(*label as i64);
        }

        let inputs = Tensor::from_data(
            TensorData::new(pixels, [batch.len(), 3, size, size]),
            device,
        );
        let targets = Tensor::from_data(TensorData::new(labels, [batch.len()]), device);

        Ok((inputs, targets))
    }
}
