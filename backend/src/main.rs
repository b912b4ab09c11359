use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use recipe_backend::config::Settings;
use recipe_backend::recipes::RecipeClient;
use recipe_backend::recognizer;
use recipe_backend::routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let settings = Settings::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Loading {} recognizer...", settings.recognizer.kind);
    let recognizer = recognizer::load(&settings.recognizer).map_err(|e| {
        log::error!("Failed to preload model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    log::info!("{} recognizer loaded successfully", recognizer.kind());

    let recognizer = web::Data::from(recognizer);
    let recipe_client = web::Data::new(RecipeClient::from_settings(&settings.recipe_api));
    let frontend_dir = settings.frontend_dir.clone();

    let bind_address = format!("0.0.0.0:{}", settings.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(recognizer.clone())
            .app_data(recipe_client.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
