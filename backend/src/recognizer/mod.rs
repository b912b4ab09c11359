pub mod classifier;
pub mod detector;
pub mod labels;

use image::DynamicImage;
use shared::RecognizerKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tch::{CModule, Device, TchError, Tensor};

use crate::config::RecognizerSettings;
use classifier::ImageClassifier;
use detector::ObjectDetector;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {source}")]
    ModelLoad { path: PathBuf, source: TchError },
    #[error("Model error: {0}")]
    Model(#[from] TchError),
    #[error("Unexpected model output shape {0:?}")]
    OutputShape(Vec<i64>),
    #[error("Label map error: {0}")]
    Labels(String),
    #[error("Model lock poisoned")]
    Poisoned,
}

/// Turns a decoded photo into the ingredient labels it shows.
pub trait IngredientRecognizer: Send + Sync {
    fn kind(&self) -> RecognizerKind;

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, InferenceError>;
}

/// A forward pass that reports shape and runtime failures instead of panicking.
pub trait Network: Send {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TchError>;
}

pub struct TorchScript {
    module: CModule,
    device: Device,
}

impl TorchScript {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let mut module =
            CModule::load_on_device(path, device).map_err(|source| InferenceError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;
        module.set_eval();
        log::info!("Loaded TorchScript module {} on {:?}", path.display(), device);
        Ok(Self { module, device })
    }
}

impl Network for TorchScript {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TchError> {
        let input = input.f_to_device(self.device)?;
        self.module.forward_ts(&[input])
    }
}

/// Builds the recognizer selected for this deployment. Called once at startup.
pub fn load(settings: &RecognizerSettings) -> Result<Arc<dyn IngredientRecognizer>, InferenceError> {
    match settings.kind {
        RecognizerKind::Detector => {
            let detector = &settings.detector;
            let network = TorchScript::load(&detector.model_path)?;
            Ok(Arc::new(ObjectDetector::new(
                Box::new(network),
                labels::coco_classes(),
                detector.input_size,
                detector.confidence_threshold,
            )))
        }
        RecognizerKind::Classifier => {
            let classifier = &settings.classifier;
            let backbone = TorchScript::load(&classifier.backbone_path)?;
            Ok(Arc::new(ImageClassifier::load(
                Box::new(backbone),
                &classifier.weights_path,
                &classifier.labels_path,
            )?))
        }
    }
}

/// Copies a tensor of any shape into a flat `Vec<f32>` on the host.
pub(crate) fn to_vec_f32(tensor: &Tensor) -> Result<Vec<f32>, TchError> {
    let flat = tensor
        .f_to_kind(tch::Kind::Float)?
        .f_to_device(Device::Cpu)?
        .f_contiguous()?
        .f_view([-1])?;
    let num_elements = flat.size()[0] as usize;
    let mut values = vec![0.0f32; num_elements];
    flat.f_copy_data(&mut values, num_elements)?;
    Ok(values)
}
