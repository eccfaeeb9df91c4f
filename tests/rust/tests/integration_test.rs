//! Cross-crate integration tests
//!
//! Exercises the real trainer (small model, tiny dataset) against the
//! in-memory store, plus the credential and naming surfaces the binary
//! relies on.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use burn::backend::{Autodiff, NdArray};
use checkpoint::{Checkpoint, CheckpointSync};
use storage::{bucket_for, MemoryStore};
use trainer::{
    load_weights, BestCheckpointWriter, CardNetConfig, ClassifiedImages, Trainer, TrainingConfig,
};
use trainer_core::{Credentials, EpochHook};

type TestBackend = Autodiff<NdArray>;

fn build_dataset(root: &Path) -> Result<()> {
    for (class, color) in [("lands", [0u8, 255, 0]), ("spells", [255, 0, 0])] {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir)?;
        for i in 0..4 {
            image::RgbImage::from_pixel(8, 8, image::Rgb(color))
                .save(dir.join(format!("card_{}.png", i)))?;
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_training_uploads_parseable_checkpoints() -> Result<()> {
    let data_dir = tempfile::tempdir()?;
    let ckpt_dir = tempfile::tempdir()?;
    build_dataset(data_dir.path())?;

    let store = MemoryStore::new();
    let dataset = ClassifiedImages::scan(data_dir.path(), 8)?;

    let net_config = CardNetConfig::new()
        .with_num_classes(dataset.num_classes())
        .with_image_size(8)
        .with_filters(2)
        .with_hidden(4);

    let device = Default::default();
    let model = net_config.init::<TestBackend>(&device);

    let config = TrainingConfig {
        epochs: 2,
        batch_size: 4,
        checkpoint_dir: ckpt_dir.path().to_path_buf(),
        ..Default::default()
    };

    let mut writer = BestCheckpointWriter::new("3ed", ckpt_dir.path())?;
    let mut hooks: Vec<Box<dyn EpochHook>> = vec![Box::new(CheckpointSync::new(
        Arc::new(store.clone()),
        "3ed",
    ))];

    let trainer = Trainer::<TestBackend>::new(config, device);
    let trained = trainer.fit(model, dataset, &mut writer, &mut hooks).await?;

    // At least the first epoch produced a best checkpoint, and the sync
    // hook mirrored it under a well-formed key.
    assert!(store.object_count("3ed") >= 1);
    for (key, bytes) in store.objects("3ed") {
        let parsed = Checkpoint::parse(&key)?;
        assert_eq!(parsed.model_namespace, "3ed");

        // Uploaded weights load back into a working model.
        let restored = load_weights::<TestBackend>(&net_config, bytes.to_vec(), &device)?;
        drop(restored);
    }

    drop(trained);
    Ok(())
}

#[test]
fn test_credentials_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"accessKeyId": "AKIAINTEGRATION", "secretAccessKey": "s3cr3t"}"#,
    )?;

    let creds = Credentials::load(&path)?;
    assert_eq!(creds.access_key_id, "AKIAINTEGRATION");
    assert_eq!(creds.secret_access_key, "s3cr3t");
    Ok(())
}

#[test]
fn test_bucket_naming_matches_checkpoint_namespace() {
    let checkpoint = Checkpoint::new("3ed", 12, 0.184, 0.912);
    assert_eq!(bucket_for(&checkpoint.model_namespace), "model-3ed");
    assert_eq!(checkpoint.storage_key(), "3ed-012-0.184-0.912.hdf5");
}
