pub mod augmentations;
pub mod config;
pub mod dataset;
pub mod trainer;

use std::path::PathBuf;
use tch::TchError;

use crate::recognizer::{InferenceError, TorchScript};
pub use config::TrainingConfig;
pub use trainer::{Trainer, TrainingReport, fit};

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse training config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid training config: {0}")]
    Config(String),
    #[error("Dataset split not found: {}", .0.display())]
    MissingSplit(PathBuf),
    #[error("No training images found in {}", .0.display())]
    EmptyDataset(PathBuf),
    #[error("Failed to read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Torch error: {0}")]
    Torch(#[from] TchError),
    #[error(transparent)]
    Model(#[from] InferenceError),
}

/// Loads the pretrained backbone named in `config` and runs the whole pipeline.
pub fn run(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    let backbone = TorchScript::load(&config.model.backbone)?;
    fit(Box::new(backbone), config)
}
