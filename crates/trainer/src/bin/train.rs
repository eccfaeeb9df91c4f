//! Training binary entry point
//!
//! Resumes from the best remote checkpoint when one exists, trains the
//! card-set classifier, and mirrors every new best checkpoint to the
//! object store after each epoch.

use std::path::Path;
use std::sync::Arc;

use burn::backend::{Autodiff, NdArray};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkpoint::{CheckpointSync, ResumeController, ResumeDecision};
use storage::{S3Config, S3Store};
use trainer_core::{Credentials, EpochHook, DEFAULT_CREDENTIALS_PATH};

use trainer::{
    export_final, load_weights, BestCheckpointWriter, CardNetConfig, ClassifiedImages, Trainer,
    TrainingConfig,
};

type TrainBackend = Autodiff<NdArray>;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trainer=info,checkpoint=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Training run failed");
        std::process::exit(1);
    }
}

async fn run() -> trainer_core::Result<()> {
    // Model namespace from args or the default set
    let namespace = std::env::args().nth(1).unwrap_or_else(|| "3ed".to_string());
    tracing::info!(%namespace, "Starting training run");

    let credentials = Credentials::load(Path::new(DEFAULT_CREDENTIALS_PATH))?;
    let store = Arc::new(S3Store::connect(&credentials, S3Config::default()).await);

    let config = TrainingConfig {
        checkpoint_dir: format!("{}_checkpoints", namespace).into(),
        ..Default::default()
    };
    std::fs::create_dir_all(&config.checkpoint_dir)?;

    let data_dir = format!("{}_sorted", namespace);
    let dataset = ClassifiedImages::scan(Path::new(&data_dir), CardNetConfig::new().image_size)?;
    let net_config = CardNetConfig::new().with_num_classes(dataset.num_classes());

    let device = Default::default();
    let mut writer = BestCheckpointWriter::new(namespace.clone(), &config.checkpoint_dir)?;

    // Resume from the best remote checkpoint, or start fresh
    let resume = ResumeController::new(store.clone(), namespace.clone());
    let model = match resume.prepare(&config.checkpoint_dir).await? {
        ResumeDecision::Fresh => net_config.init::<TrainBackend>(&device),
        ResumeDecision::Resume {
            checkpoint,
            local_path,
        } => {
            writer.seed_best(checkpoint.val_accuracy);
            load_weights::<TrainBackend>(&net_config, std::fs::read(&local_path)?, &device)?
        }
    };

    let mut hooks: Vec<Box<dyn EpochHook>> =
        vec![Box::new(CheckpointSync::new(store.clone(), namespace.clone()))];

    let trainer = Trainer::<TrainBackend>::new(config.clone(), device);
    let trained = trainer.fit(model, dataset, &mut writer, &mut hooks).await?;

    export_final(&trained, &net_config, &namespace, &config.checkpoint_dir)?;

    // One closing pass so the final exports land remotely too
    let sync = CheckpointSync::new(store, namespace);
    if let Err(e) = sync.sync_epoch(config.epochs, &config.checkpoint_dir).await {
        tracing::warn!(error = %e, "Final checkpoint sync failed");
    }

    tracing::info!("Training run complete");
    Ok(())
}
