//! End-to-end checkpoint lifecycle simulation
//!
//! Simulates a full training run against an in-memory object store:
//! - First run starts fresh, writes improving checkpoints, syncs each epoch
//! - The process "crashes" and a second run resumes from the best upload
//! - The resumed run improves further and re-sync stays idempotent

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use checkpoint::{best_checkpoint, Checkpoint, CheckpointSync, ResumeController, ResumeDecision};
use storage::MemoryStore;
use trainer::BestCheckpointWriter;
use trainer_core::EpochMetrics;

fn metrics(val_loss: f64, val_accuracy: f64) -> EpochMetrics {
    EpochMetrics {
        val_loss,
        val_accuracy,
    }
}

/// One simulated epoch: offer weights to the writer, then sync the directory
async fn epoch(
    writer: &mut BestCheckpointWriter,
    sync: &CheckpointSync,
    dir: &Path,
    n: u32,
    m: EpochMetrics,
    weights: &[u8],
) -> Result<usize> {
    writer.write_if_best(n, m, weights)?;
    Ok(sync.sync_epoch(n, dir).await?)
}

#[tokio::test]
async fn test_fresh_run_then_crash_then_resume() -> Result<()> {
    let store = MemoryStore::new();

    // --- First run: fresh start ---
    let run1_dir = tempfile::tempdir()?;
    {
        let resume = ResumeController::new(Arc::new(store.clone()), "3ed");
        assert_eq!(resume.prepare(run1_dir.path()).await?, ResumeDecision::Fresh);

        let mut writer = BestCheckpointWriter::new("3ed", run1_dir.path())?;
        let sync = CheckpointSync::new(Arc::new(store.clone()), "3ed");

        // Epochs 1..4: two improvements, one plateau, one regression.
        assert_eq!(
            epoch(&mut writer, &sync, run1_dir.path(), 1, metrics(0.9, 0.50), b"e1").await?,
            1
        );
        assert_eq!(
            epoch(&mut writer, &sync, run1_dir.path(), 2, metrics(0.6, 0.72), b"e2").await?,
            1
        );
        assert_eq!(
            epoch(&mut writer, &sync, run1_dir.path(), 3, metrics(0.5, 0.72), b"e3").await?,
            0
        );
        assert_eq!(
            epoch(&mut writer, &sync, run1_dir.path(), 4, metrics(0.7, 0.60), b"e4").await?,
            0
        );
    }
    assert_eq!(store.object_count("3ed"), 2);

    // --- Second run: resume after the simulated crash ---
    let run2_dir = tempfile::tempdir()?;
    let resume = ResumeController::new(Arc::new(store.clone()), "3ed");
    let decision = resume.prepare(run2_dir.path()).await?;

    let resumed = match decision {
        ResumeDecision::Resume {
            checkpoint,
            local_path,
        } => {
            assert_eq!(std::fs::read(&local_path)?, b"e2");
            checkpoint
        }
        ResumeDecision::Fresh => panic!("expected a resumable checkpoint"),
    };
    assert_eq!(resumed, Checkpoint::new("3ed", 2, 0.6, 0.72));

    let mut writer = BestCheckpointWriter::new("3ed", run2_dir.path())?;
    writer.seed_best(resumed.val_accuracy);
    let sync = CheckpointSync::new(Arc::new(store.clone()), "3ed");

    // The downloaded checkpoint sits in the directory; the first sync must
    // not re-upload it under its existing name.
    assert_eq!(sync.sync_epoch(0, run2_dir.path()).await?, 0);

    // A weaker epoch is rejected by the seeded watermark, a stronger one
    // lands locally and remotely.
    assert_eq!(
        epoch(&mut writer, &sync, run2_dir.path(), 1, metrics(0.5, 0.65), b"r1").await?,
        0
    );
    assert_eq!(
        epoch(&mut writer, &sync, run2_dir.path(), 2, metrics(0.4, 0.81), b"r2").await?,
        1
    );
    assert_eq!(store.object_count("3ed"), 3);

    // Selection now prefers the resumed run's improvement.
    let best = best_checkpoint(&store, "3ed").await?.unwrap();
    assert_eq!(best, Checkpoint::new("3ed", 2, 0.4, 0.81));

    // Re-running the sync is a no-op.
    assert_eq!(sync.sync_epoch(3, run2_dir.path()).await?, 0);
    assert_eq!(store.object_count("3ed"), 3);
    Ok(())
}

#[tokio::test]
async fn test_namespaces_are_isolated() -> Result<()> {
    let store = MemoryStore::new();

    let dir_a = tempfile::tempdir()?;
    let dir_b = tempfile::tempdir()?;

    let mut writer_a = BestCheckpointWriter::new("3ed", dir_a.path())?;
    let mut writer_b = BestCheckpointWriter::new("m21", dir_b.path())?;
    let sync_a = CheckpointSync::new(Arc::new(store.clone()), "3ed");
    let sync_b = CheckpointSync::new(Arc::new(store.clone()), "m21");

    epoch(&mut writer_a, &sync_a, dir_a.path(), 1, metrics(0.5, 0.70), b"a1").await?;
    epoch(&mut writer_b, &sync_b, dir_b.path(), 1, metrics(0.3, 0.90), b"b1").await?;

    assert_eq!(store.object_count("3ed"), 1);
    assert_eq!(store.object_count("m21"), 1);

    // Each namespace resumes from its own best.
    let best_a = best_checkpoint(&store, "3ed").await?.unwrap();
    let best_b = best_checkpoint(&store, "m21").await?.unwrap();
    assert_eq!(best_a.model_namespace, "3ed");
    assert_eq!(best_b.model_namespace, "m21");
    assert_eq!(best_b.val_accuracy, 0.90);
    Ok(())
}

#[tokio::test]
async fn test_foreign_objects_do_not_break_the_lifecycle() -> Result<()> {
    let store = MemoryStore::new();
    store.insert("3ed", "README.txt", "hand-uploaded notes");
    store.insert("3ed", "3ed-xyz-0.1-0.2.hdf5", "malformed name");

    let dir = tempfile::tempdir()?;
    let resume = ResumeController::new(Arc::new(store.clone()), "3ed");
    assert_eq!(resume.prepare(dir.path()).await?, ResumeDecision::Fresh);

    let mut writer = BestCheckpointWriter::new("3ed", dir.path())?;
    let sync = CheckpointSync::new(Arc::new(store.clone()), "3ed");
    epoch(&mut writer, &sync, dir.path(), 1, metrics(0.5, 0.70), b"e1").await?;

    // The valid checkpoint is now selectable despite the junk around it.
    let best = best_checkpoint(&store, "3ed").await?.unwrap();
    assert_eq!(best.epoch, 1);
    Ok(())
}
