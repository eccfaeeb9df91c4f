//! Checkpoint identity encoding and decoding
//!
//! A checkpoint's storage key embeds everything needed to rank it:
//! `{namespace}-{epoch:03}-{val_loss:.3}-{val_acc:.3}.hdf5`. The template
//! is inherited from the original checkpoint-writer's filename pattern and
//! must stay bit-exact for compatibility with already-uploaded models.
//! Zero-padded epochs make lexicographic order match epoch order for
//! equal-width epoch counts.

use serde::{Deserialize, Serialize};
use trainer_core::{Epoch, Error, ModelNamespace, Result};

/// File extension shared by local and remote checkpoint artifacts
pub const CHECKPOINT_EXTENSION: &str = ".hdf5";

/// An immutable checkpoint identity
///
/// A new training epoch produces a new value, never mutates an old one.
/// The storage key is derived deterministically from the fields and parses
/// back into them (round-trip invariant, within the fixed precision).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Namespace (card set) this checkpoint belongs to
    pub model_namespace: ModelNamespace,

    /// Training epoch that produced the checkpoint
    pub epoch: Epoch,

    /// Validation loss at that epoch
    pub val_loss: f64,

    /// Validation accuracy in [0, 1] at that epoch
    pub val_accuracy: f64,
}

impl Checkpoint {
    pub fn new(
        model_namespace: impl Into<ModelNamespace>,
        epoch: Epoch,
        val_loss: f64,
        val_accuracy: f64,
    ) -> Self {
        Self {
            model_namespace: model_namespace.into(),
            epoch,
            val_loss,
            val_accuracy,
        }
    }

    /// Encode the checkpoint identity as its storage key
    pub fn storage_key(&self) -> String {
        format!(
            "{}-{:03}-{:.3}-{:.3}{}",
            self.model_namespace, self.epoch, self.val_loss, self.val_accuracy,
            CHECKPOINT_EXTENSION
        )
    }

    /// Decode a storage key back into a checkpoint identity
    ///
    /// The namespace may itself contain dashes, so the key is parsed from
    /// the right: the last three dash-delimited fields are epoch, loss, and
    /// accuracy, and everything before them is the namespace. Returns
    /// `Error::MalformedKey` for anything that does not match; callers
    /// scanning a listing skip such keys rather than aborting.
    pub fn parse(key: &str) -> Result<Self> {
        let malformed = || Error::MalformedKey {
            key: key.to_string(),
        };

        let stem = key.strip_suffix(CHECKPOINT_EXTENSION).ok_or_else(malformed)?;

        let mut fields = stem.rsplitn(4, '-');
        let val_accuracy = fields
            .next()
            .and_then(|s| parse_fixed(s))
            .ok_or_else(malformed)?;
        let val_loss = fields
            .next()
            .and_then(|s| parse_fixed(s))
            .ok_or_else(malformed)?;
        let epoch = fields
            .next()
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<Epoch>().ok())
            .ok_or_else(malformed)?;
        let model_namespace = fields.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;

        Ok(Self {
            model_namespace: model_namespace.to_string(),
            epoch,
            val_loss,
            val_accuracy,
        })
    }
}

/// Parse a fixed-precision metric field like `0.215`
///
/// Requires the decimal form the encoder emits, so a stray numeric token
/// in an unrelated key does not masquerade as a metric.
fn parse_fixed(field: &str) -> Option<f64> {
    if !field.contains('.') {
        return None;
    }
    field.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}
