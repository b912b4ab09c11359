use image::DynamicImage;
use shared::RecognizerKind;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tch::Tensor;

use super::{InferenceError, IngredientRecognizer, Network, to_vec_f32};
use crate::imaging;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
}

/// Multi-object detector over the full frame. Several boxes of the same
/// class collapse into one label.
pub struct ObjectDetector {
    network: Mutex<Box<dyn Network>>,
    class_names: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
}

impl ObjectDetector {
    pub fn new(
        network: Box<dyn Network>,
        class_names: Vec<String>,
        input_size: u32,
        confidence_threshold: f32,
    ) -> Self {
        Self {
            network: Mutex::new(network),
            class_names,
            input_size,
            confidence_threshold,
        }
    }

    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, InferenceError> {
        let input = imaging::to_tensor(image, self.input_size);
        let output = {
            let network = self.network.lock().map_err(|_| InferenceError::Poisoned)?;
            tch::no_grad(|| network.forward(&input))?
        };
        decode_output(&output, self.class_names.len())
    }
}

impl IngredientRecognizer for ObjectDetector {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Detector
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, InferenceError> {
        let detections = self.detect(image)?;
        let labels = labels_above(&detections, &self.class_names, self.confidence_threshold);
        log::info!(
            "Detector kept {} label(s) from {} candidate box(es): {:?}",
            labels.len(),
            detections.len(),
            labels
        );
        Ok(labels)
    }
}

/// Reads a YOLOv8-style head output `[1, 4 + classes, anchors]`: box
/// coordinates first, then one score per class for every anchor.
pub fn decode_output(output: &Tensor, num_classes: usize) -> Result<Vec<Detection>, InferenceError> {
    let size = output.size();
    let expected_rows = 4 + num_classes as i64;
    if size.len() != 3 || size[0] != 1 || size[1] != expected_rows {
        return Err(InferenceError::OutputShape(size));
    }
    let anchors = size[2] as usize;
    let values = to_vec_f32(output)?;

    let detections = (0..anchors)
        .filter_map(|anchor| {
            (0..num_classes)
                .map(|class_id| Detection {
                    class_id,
                    confidence: values[(4 + class_id) * anchors + anchor],
                })
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        })
        .collect();
    Ok(detections)
}

/// Labels of detections strictly above `threshold`, deduplicated and sorted.
pub fn labels_above(detections: &[Detection], class_names: &[String], threshold: f32) -> Vec<String> {
    let mut labels = BTreeSet::new();
    for detection in detections.iter().filter(|d| d.confidence > threshold) {
        match class_names.get(detection.class_id) {
            Some(label) => {
                log::debug!("Detected: {} (conf={:.2})", label, detection.confidence);
                labels.insert(label.clone());
            }
            None => log::warn!(
                "Detection with class id {} outside a {}-entry vocabulary",
                detection.class_id,
                class_names.len()
            ),
        }
    }
    labels.into_iter().collect()
}
