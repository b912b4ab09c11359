use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info};
use shared::{ErrorResponse, RecipeResponse};
use uuid::Uuid;

use crate::imaging::{DecodeError, UploadedImage};
use crate::recipes::{RecipeClient, RecipeError};
use crate::recognizer::{InferenceError, IngredientRecognizer};

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid upload: {0}")]
    Upload(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Recipes(#[from] RecipeError),
    #[error("Inference worker failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Upload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.service(web::resource("/generate-recipes/").route(web::post().to(generate_recipes)))
        .service(Files::new("/static", frontend_dir).index_file("index.html"));
}

async fn generate_recipes(
    recognizer: web::Data<dyn IngredientRecognizer>,
    recipe_client: web::Data<RecipeClient>,
    payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let request_id = Uuid::new_v4();

    let upload = read_upload(payload).await.inspect_err(|e| {
        error!("[{}] Failed to read upload: {}", request_id, e);
    })?;
    info!(
        "[{}] Received file: {} ({} bytes)",
        request_id,
        upload.file_name,
        upload.bytes.len()
    );

    let recognizer = recognizer.into_inner();
    let ingredients = web::block(move || -> Result<Vec<String>, ServiceError> {
        let image = upload.decode()?;
        Ok(recognizer.recognize(&image)?)
    })
    .await
    .map_err(ServiceError::from)
    .and_then(|result| result)
    .inspect_err(|e| error!("[{}] Ingredient recognition failed: {}", request_id, e))?;
    info!("[{}] Ingredients: {:?}", request_id, ingredients);

    let recipes = recipe_client
        .find_recipes(&ingredients)
        .await
        .inspect_err(|e| error!("[{}] Recipe lookup failed: {}", request_id, e))?;

    info!("[{}] Request completed with {} recipes", request_id, recipes.len());
    Ok(HttpResponse::Ok().json(RecipeResponse {
        ingredients,
        recipes,
    }))
}

/// Collects the `file` field of the multipart body, ignoring any other field.
async fn read_upload(mut payload: Multipart) -> Result<UploadedImage, ServiceError> {
    let mut upload = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ServiceError::Upload(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("upload")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ServiceError::Upload(format!("Failed to read file: {}", e)))?;
            if bytes.len() + data.len() > MAX_UPLOAD_BYTES {
                return Err(ServiceError::Upload(format!(
                    "File too large. Max size is {} bytes",
                    MAX_UPLOAD_BYTES
                )));
            }
            bytes.extend_from_slice(&data);
        }

        upload = Some(UploadedImage { file_name, bytes });
    }

    upload.ok_or_else(|| ServiceError::Upload("Missing file field".to_string()))
}
