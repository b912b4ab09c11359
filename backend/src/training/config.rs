use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::TrainingError;
use super::augmentations::RandomAffine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub version: f32,
    pub data: DataConfig,
    pub image: ImageConfig,
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    pub training: LoopConfig,
    pub augmentation: AugmentationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub base_dir: PathBuf,
    #[serde(default = "default_train_dir")]
    pub train_dir: String,
    #[serde(default = "default_validation_dir")]
    pub validation_dir: String,
    #[serde(default = "default_test_dir")]
    pub test_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backbone: PathBuf,
    pub dropout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
}

/// Ranges follow the usual Keras-style semantics: rotation and shear in
/// degrees, shifts as a fraction of the side, zoom as `1 ± zoom_range`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentationConfig {
    pub enabled: bool,
    pub rotation_range: f32,
    pub width_shift_range: f32,
    pub height_shift_range: f32,
    pub shear_range: f32,
    pub zoom_range: f32,
    pub horizontal_flip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub weights: PathBuf,
    pub labels: PathBuf,
}

fn default_train_dir() -> String {
    "train".to_string()
}

fn default_validation_dir() -> String {
    "validation".to_string()
}

fn default_test_dir() -> String {
    "test".to_string()
}

impl TrainingConfig {
    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, TrainingError> {
        let config: TrainingConfig = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.training.batch_size == 0 {
            return Err(TrainingError::Config("batch_size must be positive".into()));
        }
        if self.image.size == 0 {
            return Err(TrainingError::Config("image size must be positive".into()));
        }
        Ok(())
    }

    pub fn train_dir(&self) -> PathBuf {
        self.data.base_dir.join(&self.data.train_dir)
    }

    pub fn validation_dir(&self) -> PathBuf {
        self.data.base_dir.join(&self.data.validation_dir)
    }

    pub fn test_dir(&self) -> PathBuf {
        self.data.base_dir.join(&self.data.test_dir)
    }

    pub fn to_random_affine(&self) -> Option<RandomAffine> {
        let aug = &self.augmentation;
        aug.enabled.then(|| RandomAffine {
            rotation_range: aug.rotation_range,
            width_shift_range: aug.width_shift_range,
            height_shift_range: aug.height_shift_range,
            shear_range: aug.shear_range,
            zoom_range: aug.zoom_range,
            horizontal_flip: aug.horizontal_flip,
        })
    }
}
