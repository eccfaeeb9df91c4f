//! Convolutional network for card-set image classification
//!
//! Three conv/pool blocks feeding a small dense head, matching the
//! architecture the uploaded checkpoints were trained with. Softmax is
//! folded into the cross-entropy loss, so `forward` returns raw logits.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use trainer_core::Error;

/// Network hyperparameters
#[derive(Config, Debug)]
pub struct CardNetConfig {
    /// Number of card classes in the dataset
    #[config(default = 4)]
    pub num_classes: usize,

    /// Input image edge length in pixels (square inputs)
    #[config(default = 400)]
    pub image_size: usize,

    /// Filters per convolution block
    #[config(default = 64)]
    pub filters: usize,

    /// Width of the dense layer before the classifier head
    #[config(default = 256)]
    pub hidden: usize,

    /// Dropout probability after the dense layer
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl CardNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CardNet<B> {
        // Each 2x2 pool halves the spatial extent (floor division)
        let edge = self.image_size / 2 / 2 / 2;
        let flat = self.filters * edge * edge;

        CardNet {
            conv1: Conv2dConfig::new([3, self.filters], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            conv2: Conv2dConfig::new([self.filters, self.filters], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            conv3: Conv2dConfig::new([self.filters, self.filters], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(flat, self.hidden).init(device),
            fc2: LinearConfig::new(self.hidden, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            relu: Relu::new(),
        }
    }
}

/// Card-set classifier
#[derive(Module, Debug)]
pub struct CardNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    dropout: Dropout,
    relu: Relu,
}

impl<B: Backend> CardNet<B> {
    /// Forward pass: `[batch, 3, size, size]` -> `[batch, num_classes]` logits
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.relu.forward(self.conv1.forward(input)));
        let x = self.pool.forward(self.relu.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.relu.forward(self.conv3.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = self.dropout.forward(self.relu.forward(self.fc1.forward(x)));
        self.fc2.forward(x)
    }
}

/// Serialize a model's weights to bytes
///
/// The byte format is backend-portable, so a checkpoint written by the
/// training backend loads into the inference backend and vice versa.
pub fn weights_bytes<B: Backend>(model: &CardNet<B>) -> trainer_core::Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    recorder
        .record(model.clone().into_record(), ())
        .map_err(|e| Error::Model {
            message: format!("failed to serialize model weights: {}", e),
        })
}

/// Build a model from its config and recorded weight bytes
pub fn load_weights<B: Backend>(
    config: &CardNetConfig,
    bytes: Vec<u8>,
    device: &B::Device,
) -> trainer_core::Result<CardNet<B>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = recorder.load(bytes, device).map_err(|e| Error::Model {
        message: format!("failed to deserialize model weights: {}", e),
    })?;
    Ok(config.init(device).load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> CardNetConfig {
        CardNetConfig::new()
            .with_num_classes(3)
            .with_image_size(32)
            .with_filters(4)
            .with_hidden(8)
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);

        let input = Tensor::zeros([2, 3, 32, 32], &device);
        let output = model.forward(input);
        assert_eq!(output.shape().dims, [2, 3]);
    }

    #[test]
    fn test_forward_single_image() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);

        let input = Tensor::zeros([1, 3, 32, 32], &device);
        let output = model.forward(input);
        assert_eq!(output.shape().dims, [1, 3]);
    }

    #[test]
    fn test_weights_roundtrip() {
        let device = Default::default();
        let config = small_config();
        let model = config.init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        let before: Vec<f32> = model
            .forward(input.clone())
            .into_data()
            .to_vec()
            .unwrap();

        let bytes = weights_bytes(&model).unwrap();
        let restored = load_weights::<TestBackend>(&config, bytes, &device).unwrap();
        let after: Vec<f32> = restored.forward(input).into_data().to_vec().unwrap();

        assert_eq!(before, after);
    }
}
