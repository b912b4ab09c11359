use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::InferenceError;

/// Class names of the COCO-pretrained detector, in model output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub fn coco_classes() -> Vec<String> {
    COCO_CLASSES.iter().map(|name| name.to_string()).collect()
}

/// Metadata written next to the trained head weights.
///
/// `class_names[i]` is the label of output unit `i`; the classifier trusts this
/// order blindly, so it must be the order the head was built with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierArtifact {
    pub class_names: Vec<String>,
    pub feature_dim: i64,
    pub input_size: u32,
    pub test_accuracy: Option<f64>,
    pub trained_at: DateTime<Utc>,
}

impl ClassifierArtifact {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| InferenceError::Labels(format!("{}: {}", path.display(), e)))?;
        let artifact: ClassifierArtifact = serde_json::from_str(&raw)
            .map_err(|e| InferenceError::Labels(format!("{}: {}", path.display(), e)))?;
        if artifact.class_names.is_empty() {
            return Err(InferenceError::Labels(format!(
                "{}: no class names",
                path.display()
            )));
        }
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.class_names.get(index).map(String::as_str)
    }
}
