#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use recipe_backend::recipes::RecipeClient;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use url::Url;

pub const API_KEY: &str = "test-key";

/// Canned recipe provider: answers search with `hits` (or `search_status`,
/// or a raw `search_body`) and detail lookups from `details`, 404 for unknown ids.
#[derive(Clone)]
pub struct StubConfig {
    pub search_status: u16,
    pub search_body: Option<Value>,
    pub hits: Vec<u64>,
    pub details: HashMap<u64, Value>,
}

impl StubConfig {
    pub fn with_hits(hits: &[u64]) -> Self {
        let details = hits.iter().map(|&id| (id, detail(id))).collect();
        Self {
            search_status: 200,
            search_body: None,
            hits: hits.to_vec(),
            details,
        }
    }
}

pub fn detail(id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Recipe {}", id),
        "image": format!("https://img.example/{}.jpg", id),
        "extendedIngredients": [{"id": 1, "name": "tomato"}, {"id": 2, "name": "onion"}],
        "analyzedInstructions": [{"name": "", "steps": [{"number": 1, "step": "Chop"}, {"number": 2, "step": "Cook"}]}]
    })
}

pub struct StubRecipeApi {
    pub base_url: Url,
    requests: Arc<Mutex<Vec<String>>>,
    handle: ServerHandle,
}

struct StubState {
    config: StubConfig,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubRecipeApi {
    pub async fn start(config: StubConfig) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(StubState {
            config,
            requests: requests.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/recipes/findByIngredients", web::get().to(search))
                .route("/recipes/{id}/information", web::get().to(information))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: Url::parse(&format!("http://{}/", addr)).unwrap(),
            requests,
            handle,
        }
    }

    pub fn client(&self) -> RecipeClient {
        RecipeClient::new(reqwest::Client::new(), self.base_url.clone(), API_KEY.to_string(), 5)
    }

    /// Every request received so far as `path?query`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

fn record(state: &StubState, req: &HttpRequest) {
    let line = format!("{}?{}", req.path(), req.query_string());
    state.requests.lock().unwrap().push(line);
}

async fn search(
    state: web::Data<StubState>,
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    record(&state, &req);
    if query.get("apiKey").map(String::as_str) != Some(API_KEY) {
        return HttpResponse::Unauthorized().json(json!({"message": "bad key"}));
    }
    if state.config.search_status != 200 {
        let status = actix_web::http::StatusCode::from_u16(state.config.search_status).unwrap();
        return HttpResponse::build(status).json(json!({"message": "quota exceeded"}));
    }
    if let Some(body) = &state.config.search_body {
        return HttpResponse::Ok().json(body);
    }
    let hits: Vec<Value> = state
        .config
        .hits
        .iter()
        .map(|id| json!({"id": id, "title": "ignored", "usedIngredientCount": 1}))
        .collect();
    HttpResponse::Ok().json(hits)
}

async fn information(
    state: web::Data<StubState>,
    req: HttpRequest,
    path: web::Path<u64>,
) -> HttpResponse {
    record(&state, &req);
    match state.config.details.get(&path.into_inner()) {
        Some(body) => HttpResponse::Ok().json(body),
        None => HttpResponse::NotFound().json(json!({"message": "not found"})),
    }
}

pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(24, 24, Rgb(color));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub const BOUNDARY: &str = "----recipe-test-boundary";

pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
