use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::TrainingError;

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub path: PathBuf,
    pub label: usize,
}

/// One split of a labelled image tree: `root/<class name>/**/<image>`.
///
/// Class indices follow the lexical order of the class directory names.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    pub root: PathBuf,
    pub class_names: Vec<String>,
    pub samples: Vec<Sample>,
}

impl ImageFolder {
    /// Discovers classes from the sub-directories of `root`.
    pub fn discover(root: &Path) -> Result<Self, TrainingError> {
        if !root.is_dir() {
            return Err(TrainingError::MissingSplit(root.to_path_buf()));
        }
        let mut class_names = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                class_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        class_names.sort();
        Self::with_classes(root, &class_names)
    }

    /// Loads `root` against an existing class list. Directories that are not
    /// in the list are ignored.
    pub fn with_classes(root: &Path, class_names: &[String]) -> Result<Self, TrainingError> {
        if !root.is_dir() {
            return Err(TrainingError::MissingSplit(root.to_path_buf()));
        }
        let mut samples = Vec::new();
        for (label, class_name) in class_names.iter().enumerate() {
            let class_dir = root.join(class_name);
            if !class_dir.is_dir() {
                log::warn!("No directory for class {} in {}", class_name, root.display());
                continue;
            }
            let mut paths: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_image(e.path()))
                .map(|e| e.into_path())
                .collect();
            paths.sort();
            samples.extend(paths.into_iter().map(|path| Sample { path, label }));
        }

        log::info!(
            "Found {} images belonging to {} classes in {}",
            samples.len(),
            class_names.len(),
            root.display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            class_names: class_names.to_vec(),
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn class_indices(&self) -> HashMap<&str, usize> {
        self.class_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
