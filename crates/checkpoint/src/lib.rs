//! Checkpoint identity, selection, resume, and remote sync
//!
//! The state-machine heart of the training system: deciding whether a
//! prior model exists remotely, resuming from the best one, and mirroring
//! newly written local checkpoints to the object store without duplicating
//! or destroying anything already uploaded.

pub mod naming;
pub mod resume;
pub mod select;
pub mod sync;

pub use naming::{Checkpoint, CHECKPOINT_EXTENSION};
pub use resume::{ResumeController, ResumeDecision};
pub use select::best_checkpoint;
pub use sync::CheckpointSync;
