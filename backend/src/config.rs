use shared::RecognizerKind;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

const DEFAULT_SPOONACULAR_URL: &str = "https://api.spoonacular.com/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct RecipeApiSettings {
    pub base_url: Url,
    pub api_key: String,
    pub max_results: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub backbone_path: PathBuf,
    pub weights_path: PathBuf,
    pub labels_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    pub kind: RecognizerKind,
    pub detector: DetectorSettings,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub frontend_dir: String,
    pub recipe_api: RecipeApiSettings,
    pub recognizer: RecognizerSettings,
}

impl Settings {
    /// Reads the service settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("SPOONACULAR_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("SPOONACULAR_API_KEY"))?;

        let raw_url = lookup("SPOONACULAR_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SPOONACULAR_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        let kind = match lookup("RECOGNIZER") {
            Some(value) => RecognizerKind::from_str(value.trim()).map_err(|_| {
                ConfigError::Invalid {
                    key: "RECOGNIZER",
                    value,
                }
            })?,
            None => RecognizerKind::Detector,
        };

        let frontend_dir = lookup("FRONTEND_DIR").unwrap_or_else(|| {
            match lookup("CARGO_MANIFEST_DIR") {
                Some(manifest_dir) => format!("{}/../frontend/dist", manifest_dir),
                None => "/usr/src/app/frontend/dist".to_string(),
            }
        });

        Ok(Self {
            port: parse_or(&lookup, "PORT", 8000)?,
            frontend_dir,
            recipe_api: RecipeApiSettings {
                base_url,
                api_key,
                max_results: parse_or(&lookup, "RECIPE_RESULT_LIMIT", 5)?,
            },
            recognizer: RecognizerSettings {
                kind,
                detector: DetectorSettings {
                    model_path: path_or(&lookup, "DETECTOR_MODEL", "models/yolov8n.torchscript"),
                    input_size: positive_or(&lookup, "DETECTOR_INPUT_SIZE", 640)?,
                    confidence_threshold: parse_or(&lookup, "DETECTOR_CONFIDENCE", 0.5)?,
                },
                classifier: ClassifierSettings {
                    backbone_path: path_or(
                        &lookup,
                        "CLASSIFIER_BACKBONE",
                        "models/mobilenet_v2_features.pt",
                    ),
                    weights_path: path_or(
                        &lookup,
                        "CLASSIFIER_WEIGHTS",
                        "ingredient_classifier.safetensors",
                    ),
                    labels_path: path_or(&lookup, "CLASSIFIER_LABELS", "ingredient_classifier.json"),
                },
            },
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|_| ConfigError::Invalid {
        key: "SPOONACULAR_BASE_URL",
        value: raw.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn positive_or<F>(lookup: &F, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        value => Ok(value),
    }
}

fn path_or<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
}
