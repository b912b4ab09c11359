use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use shared::Recipe;
use url::Url;

use super::models::{RecipeInformation, SearchHit};
use crate::config::RecipeApiSettings;

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// Never carries the request URL, which holds the API key.
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("URL building failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("Recipe API returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },
}

fn redact(error: reqwest::Error) -> RecipeError {
    RecipeError::Http(error.without_url())
}

/// Client for the Spoonacular recipe API: one search per request, then one
/// detail lookup per hit. No caching and no retries.
#[derive(Clone)]
pub struct RecipeClient {
    http_client: HttpClient,
    base_url: Url,
    api_key: String,
    max_results: u32,
}

impl RecipeClient {
    pub fn new(http_client: HttpClient, base_url: Url, api_key: String, max_results: u32) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
            max_results,
        }
    }

    pub fn from_settings(settings: &RecipeApiSettings) -> Self {
        Self::new(
            HttpClient::new(),
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.max_results,
        )
    }

    /// Searches by ingredients and resolves every hit to a full recipe.
    ///
    /// A failing search aborts the lookup. A failing detail lookup only drops
    /// that recipe from the result.
    pub async fn find_recipes(&self, ingredients: &[String]) -> Result<Vec<Recipe>, RecipeError> {
        if ingredients.is_empty() {
            log::warn!("No ingredients detected, skipping recipe search");
            return Ok(Vec::new());
        }

        let hits = self.search(ingredients).await?;
        let mut recipes = Vec::with_capacity(hits.len());
        for hit in hits {
            log::info!("Fetching details for recipe {}", hit.id);
            match self.fetch_details(hit.id).await {
                Ok(info) => recipes.push(Recipe::from(info)),
                Err(e) => log::error!("Skipping recipe {}: {}", hit.id, e),
            }
        }

        log::info!("Found {} recipes", recipes.len());
        Ok(recipes)
    }

    pub async fn search(&self, ingredients: &[String]) -> Result<Vec<SearchHit>, RecipeError> {
        let joined = ingredients.join(",");
        log::info!("Searching recipes for: {}", joined);

        let mut url = self.base_url.join("recipes/findByIngredients")?;
        url.query_pairs_mut()
            .append_pair("ingredients", &joined)
            .append_pair("number", &self.max_results.to_string())
            .append_pair("apiKey", &self.api_key);

        let response = self.http_client.get(url).send().await.map_err(redact)?;
        let status = response.status();
        log::info!("Recipe search response status: {}", status);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            log::error!("Recipe search failed: {} - {}", status, body);
            return Err(RecipeError::Upstream { status, body });
        }

        response.json().await.map_err(redact)
    }

    pub async fn fetch_details(&self, recipe_id: u64) -> Result<RecipeInformation, RecipeError> {
        let mut url = self
            .base_url
            .join(&format!("recipes/{}/information", recipe_id))?;
        url.query_pairs_mut().append_pair("apiKey", &self.api_key);

        let response = self.http_client.get(url).send().await.map_err(redact)?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RecipeError::Upstream { status, body });
        }

        response.json().await.map_err(redact)
    }
}
