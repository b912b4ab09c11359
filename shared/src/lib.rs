use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Recipe {
    pub title: String,
    pub image: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RecipeResponse {
    pub ingredients: Vec<String>,
    pub recipes: Vec<Recipe>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Which ingredient recognizer a deployment serves with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    Detector,
    Classifier,
}
