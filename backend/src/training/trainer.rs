use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use tch::{Device, Kind, Reduction, TchError, Tensor, nn, nn::OptimizerConfig};

use super::TrainingError;
use super::augmentations::RandomAffine;
use super::config::TrainingConfig;
use super::dataset::{ImageFolder, Sample};
use crate::imaging;
use crate::recognizer::Network;
use crate::recognizer::classifier::{ClassificationHead, pool_features};
use crate::recognizer::labels::ClassifierArtifact;

#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_accuracy: Option<f64>,
}

/// Fits a fresh classification head on top of a frozen backbone.
pub struct Trainer {
    backbone: Box<dyn Network>,
    vs: nn::VarStore,
    head: ClassificationHead,
    optimizer: nn::Optimizer,
    feature_dim: i64,
    input_size: u32,
    batch_size: usize,
    augmentation: Option<RandomAffine>,
    rng: StdRng,
}

impl Trainer {
    pub fn new(
        backbone: Box<dyn Network>,
        num_classes: usize,
        config: &TrainingConfig,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        tch::manual_seed(config.training.seed as i64);
        let vs = nn::VarStore::new(Device::cuda_if_available());
        let input_size = config.image.size;

        let probe = Tensor::zeros(
            [1, 3, input_size as i64, input_size as i64],
            (Kind::Float, Device::Cpu),
        );
        let features = tch::no_grad(|| backbone.forward(&probe))?;
        let feature_dim = pool_features(&features)?.size()[1];
        log::info!("Backbone produces {} features per image", feature_dim);

        let head = ClassificationHead::new(
            &vs.root(),
            feature_dim,
            num_classes as i64,
            config.model.dropout,
        );
        let optimizer = nn::Adam::default().build(&vs, config.optimizer.learning_rate)?;

        Ok(Self {
            backbone,
            vs,
            head,
            optimizer,
            feature_dim,
            input_size,
            batch_size: config.training.batch_size,
            augmentation: config.to_random_affine(),
            rng: StdRng::seed_from_u64(config.training.seed),
        })
    }

    pub fn feature_dim(&self) -> i64 {
        self.feature_dim
    }

    /// One shuffled pass over `data`. Returns mean loss and accuracy.
    pub fn train_epoch(&mut self, data: &ImageFolder) -> Result<(f64, f64), TrainingError> {
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.shuffle(&mut self.rng);

        let mut loss_sum = 0.0;
        let mut correct = 0.0;
        for chunk in order.chunks(self.batch_size) {
            let samples: Vec<&Sample> = chunk.iter().map(|&i| &data.samples[i]).collect();
            let (images, targets) = self.load_batch(&samples, true)?;
            let features = self.features(&images)?;

            let logits = self.head.forward_t(&features, true)?;
            let loss = cross_entropy(&logits, &targets)?;
            self.optimizer.zero_grad();
            loss.f_backward()?;
            self.optimizer.step();

            let n = samples.len() as f64;
            loss_sum += loss.f_double_value(&[])? * n;
            correct += accuracy(&logits, &targets)? * n;
        }

        let total = data.len().max(1) as f64;
        Ok((loss_sum / total, correct / total))
    }

    /// Accuracy over `data` without augmentation or dropout; `None` when empty.
    pub fn evaluate(&mut self, data: &ImageFolder) -> Result<Option<f64>, TrainingError> {
        if data.is_empty() {
            return Ok(None);
        }
        let mut correct = 0.0;
        let samples: Vec<&Sample> = data.samples.iter().collect();
        for chunk in samples.chunks(self.batch_size) {
            let (images, targets) = self.load_batch(chunk, false)?;
            let features = self.features(&images)?;
            let logits = tch::no_grad(|| self.head.forward_t(&features, false))?;
            correct += accuracy(&logits, &targets)? * chunk.len() as f64;
        }
        Ok(Some(correct / data.len() as f64))
    }

    /// Writes the head weights and the class list that sized its output layer.
    pub fn save(
        &self,
        weights_path: &Path,
        labels_path: &Path,
        class_names: &[String],
        test_accuracy: Option<f64>,
    ) -> Result<ClassifierArtifact, TrainingError> {
        if self.head.num_classes() != class_names.len() as i64 {
            return Err(TrainingError::Config(format!(
                "head has {} outputs for {} classes",
                self.head.num_classes(),
                class_names.len()
            )));
        }
        self.vs.save(weights_path)?;
        let artifact = ClassifierArtifact {
            class_names: class_names.to_vec(),
            feature_dim: self.feature_dim,
            input_size: self.input_size,
            test_accuracy,
            trained_at: Utc::now(),
        };
        artifact.save(labels_path)?;
        log::info!(
            "Saved classifier head to {} and labels to {}",
            weights_path.display(),
            labels_path.display()
        );
        Ok(artifact)
    }

    fn features(&self, images: &Tensor) -> Result<Tensor, TrainingError> {
        let device = self.vs.device();
        let features = tch::no_grad(|| self.backbone.forward(images))?;
        Ok(features.f_to_device(device)?)
    }

    fn load_batch(&mut self, samples: &[&Sample], augment: bool) -> Result<(Tensor, Tensor), TrainingError> {
        let mut arrays = Vec::with_capacity(samples.len());
        let mut labels = Vec::with_capacity(samples.len());
        for sample in samples {
            let image = image::open(&sample.path).map_err(|source| TrainingError::Image {
                path: sample.path.clone(),
                source,
            })?;
            let mut rgb = imaging::resize(&image, self.input_size);
            if augment {
                if let Some(augmentation) = &self.augmentation {
                    rgb = augmentation.apply(&rgb, &mut self.rng);
                }
            }
            arrays.push(imaging::rgb_to_array(&rgb));
            labels.push(sample.label as i64);
        }
        let images = imaging::batch_to_tensor(&arrays)
            .ok_or_else(|| TrainingError::Config("empty batch".into()))?;
        let targets = Tensor::from_slice(&labels).f_to_device(self.vs.device())?;
        Ok((images, targets))
    }
}

/// Mean cross-entropy of `logits` `[n, classes]` against class indices `[n]`.
pub fn cross_entropy(logits: &Tensor, targets: &Tensor) -> Result<Tensor, TchError> {
    logits
        .f_log_softmax(-1, Kind::Float)?
        .f_nll_loss(targets, None::<Tensor>, Reduction::Mean, -100)
}

/// Fraction of rows whose arg-max matches the target index.
pub fn accuracy(logits: &Tensor, targets: &Tensor) -> Result<f64, TchError> {
    logits
        .f_argmax(-1, false)?
        .f_eq_tensor(targets)?
        .f_to_kind(Kind::Float)?
        .f_mean(Kind::Float)?
        .f_double_value(&[])
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history: Vec<EpochStats>,
    pub artifact: ClassifierArtifact,
}

/// Full pipeline: discover splits, train, evaluate on the test split, persist.
pub fn fit(backbone: Box<dyn Network>, config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    config.validate()?;
    let train = ImageFolder::discover(&config.train_dir())?;
    if train.is_empty() || train.num_classes() == 0 {
        return Err(TrainingError::EmptyDataset(train.root));
    }
    let validation = ImageFolder::with_classes(&config.validation_dir(), &train.class_names)?;
    let test = ImageFolder::with_classes(&config.test_dir(), &train.class_names)?;
    log::info!("Class indices: {:?}", train.class_indices());

    let mut trainer = Trainer::new(backbone, train.num_classes(), config)?;
    let epochs = config.training.epochs;
    let mut history = Vec::with_capacity(epochs);
    for epoch in 1..=epochs {
        let (loss, accuracy) = trainer.train_epoch(&train)?;
        let val_accuracy = trainer.evaluate(&validation)?;
        log::info!(
            "Epoch {}/{} - loss: {:.4} - accuracy: {:.4} - val_accuracy: {}",
            epoch,
            epochs,
            loss,
            accuracy,
            val_accuracy.map_or_else(|| "n/a".to_string(), |a| format!("{:.4}", a))
        );
        history.push(EpochStats {
            epoch,
            loss,
            accuracy,
            val_accuracy,
        });
    }

    let test_accuracy = trainer.evaluate(&test)?;
    match test_accuracy {
        Some(acc) => log::info!("Test Accuracy: {:.2}%", acc * 100.0),
        None => log::warn!("Test split is empty, skipping evaluation"),
    }

    let artifact = trainer.save(
        &config.output.weights,
        &config.output.labels,
        &train.class_names,
        test_accuracy,
    )?;
    Ok(TrainingReport { history, artifact })
}
