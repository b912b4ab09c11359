use serde::Deserialize;
use shared::Recipe;

/// One entry of the `findByIngredients` search response. Only the id is used.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInformation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub extended_ingredients: Vec<ExtendedIngredient>,
    #[serde(default)]
    pub analyzed_instructions: Vec<InstructionGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendedIngredient {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionGroup {
    #[serde(default)]
    pub steps: Vec<InstructionStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionStep {
    pub step: String,
}

impl From<RecipeInformation> for Recipe {
    fn from(info: RecipeInformation) -> Self {
        // Only the first instruction group carries the main method.
        let steps = info
            .analyzed_instructions
            .into_iter()
            .next()
            .map(|group| group.steps.into_iter().map(|s| s.step).collect())
            .unwrap_or_default();

        Recipe {
            title: info.title.unwrap_or_default(),
            image: info.image.unwrap_or_default(),
            ingredients: info
                .extended_ingredients
                .into_iter()
                .map(|i| i.name)
                .collect(),
            steps,
        }
    }
}
