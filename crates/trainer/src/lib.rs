//! Card-set image classifier training
//!
//! Wires the dataset, model, and epoch loop together with the resume and
//! sync machinery from the `checkpoint` crate. The `train` binary is the
//! entry point; this library exists mainly so the pieces are testable.

pub mod data;
pub mod model;
pub mod training;

pub use data::ClassifiedImages;
pub use model::{load_weights, weights_bytes, CardNet, CardNetConfig};
pub use training::{export_final, BestCheckpointWriter, Trainer, TrainingConfig};
