use image::DynamicImage;
use shared::RecognizerKind;
use std::path::Path;
use std::sync::Mutex;
use tch::{Device, Kind, TchError, Tensor, nn};

use super::labels::ClassifierArtifact;
use super::{InferenceError, IngredientRecognizer, Network, to_vec_f32};
use crate::imaging;

/// Trainable head placed on top of a frozen feature extractor:
/// global average pooling, dropout, then a single linear layer.
#[derive(Debug)]
pub struct ClassificationHead {
    linear: nn::Linear,
    dropout: f64,
}

impl ClassificationHead {
    pub fn new(path: &nn::Path, feature_dim: i64, num_classes: i64, dropout: f64) -> Self {
        Self {
            linear: nn::linear(path / "linear", feature_dim, num_classes, Default::default()),
            dropout,
        }
    }

    pub fn num_classes(&self) -> i64 {
        self.linear.ws.size()[0]
    }

    /// Logits for a batch of backbone features, `[n, c]` or `[n, c, h, w]`.
    pub fn forward_t(&self, features: &Tensor, train: bool) -> Result<Tensor, TchError> {
        let pooled = pool_features(features)?;
        let dropped = pooled.f_dropout(self.dropout, train)?;
        dropped.f_linear(&self.linear.ws, self.linear.bs.as_ref())
    }
}

pub fn pool_features(features: &Tensor) -> Result<Tensor, TchError> {
    match features.dim() {
        2 => Ok(features.shallow_clone()),
        4 => features.f_mean_dim([2i64, 3].as_slice(), false, Kind::Float),
        _ => Err(TchError::Shape(format!(
            "expected 2-D or 4-D backbone features, got {:?}",
            features.size()
        ))),
    }
}

struct ClassifierNet {
    backbone: Box<dyn Network>,
    head: ClassificationHead,
    // Owns the head's variables.
    _vs: nn::VarStore,
}

/// Single-label classifier: always answers with exactly one label from the
/// trained vocabulary, however unsure the model is.
pub struct ImageClassifier {
    net: Mutex<ClassifierNet>,
    artifact: ClassifierArtifact,
}

impl ImageClassifier {
    pub fn load(
        backbone: Box<dyn Network>,
        weights_path: &Path,
        labels_path: &Path,
    ) -> Result<Self, InferenceError> {
        let artifact = ClassifierArtifact::load(labels_path)?;
        let mut vs = nn::VarStore::new(Device::cuda_if_available());
        let head = ClassificationHead::new(
            &vs.root(),
            artifact.feature_dim,
            artifact.class_names.len() as i64,
            0.0,
        );
        vs.load(weights_path)
            .map_err(|source| InferenceError::ModelLoad {
                path: weights_path.to_path_buf(),
                source,
            })?;
        vs.freeze();

        if head.num_classes() != artifact.class_names.len() as i64 {
            return Err(InferenceError::Labels(format!(
                "head has {} outputs but {} class names were saved",
                head.num_classes(),
                artifact.class_names.len()
            )));
        }

        log::info!(
            "Loaded ingredient classifier with {} classes: {:?}",
            artifact.class_names.len(),
            artifact.class_names
        );
        Ok(Self {
            net: Mutex::new(ClassifierNet {
                backbone,
                head,
                _vs: vs,
            }),
            artifact,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.artifact.class_names
    }

    /// Softmax probabilities over the trained classes.
    pub fn probabilities(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let input = imaging::to_tensor(image, self.artifact.input_size);
        let net = self.net.lock().map_err(|_| InferenceError::Poisoned)?;
        let probabilities = tch::no_grad(|| -> Result<Tensor, TchError> {
            let device = net.head.linear.ws.device();
            let features = net.backbone.forward(&input)?.f_to_device(device)?;
            net.head.forward_t(&features, false)?.f_softmax(-1, Kind::Float)
        })?;
        let probabilities = to_vec_f32(&probabilities)?;
        if probabilities.len() != self.artifact.class_names.len() {
            return Err(InferenceError::OutputShape(vec![probabilities.len() as i64]));
        }
        Ok(probabilities)
    }
}

impl IngredientRecognizer for ImageClassifier {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Classifier
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, InferenceError> {
        let probabilities = self.probabilities(image)?;
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| InferenceError::OutputShape(vec![0]))?;
        let label = self
            .artifact
            .label(index)
            .ok_or_else(|| InferenceError::Labels(format!("no label for class index {}", index)))?;
        log::info!("Predicted ingredient: {} (p={:.2})", label, confidence);
        Ok(vec![label.to_string()])
    }
}

/// Index and value of the largest entry; the first one wins ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((i, v)),
        })
}
