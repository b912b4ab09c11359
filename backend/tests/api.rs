mod common;

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{App, test, web};
use common::{API_KEY, BOUNDARY, StubConfig, StubRecipeApi, multipart_body, png_bytes};
use image::DynamicImage;
use recipe_backend::recognizer::{InferenceError, IngredientRecognizer};
use recipe_backend::routes::{MAX_UPLOAD_BYTES, configure_routes};
use serde_json::{Value, json};
use shared::RecognizerKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed label set and counts how many images it was shown.
struct FixedRecognizer {
    labels: Vec<String>,
    calls: AtomicUsize,
}

impl FixedRecognizer {
    fn new(labels: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl IngredientRecognizer for FixedRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Classifier
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<String>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }
}

struct BrokenRecognizer;

impl IngredientRecognizer for BrokenRecognizer {
    fn kind(&self) -> RecognizerKind {
        RecognizerKind::Detector
    }

    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<String>, InferenceError> {
        Err(InferenceError::OutputShape(vec![1, 2]))
    }
}

/// Posts one upload through the full app and returns status and JSON body.
async fn post_upload(
    recognizer: Arc<dyn IngredientRecognizer>,
    stub: &StubRecipeApi,
    field: &str,
    bytes: &[u8],
) -> (StatusCode, Value) {
    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    post_raw(recognizer, stub, &content_type, multipart_body(field, "photo.png", bytes)).await
}

async fn post_raw(
    recognizer: Arc<dyn IngredientRecognizer>,
    stub: &StubRecipeApi,
    content_type: &str,
    body: Vec<u8>,
) -> (StatusCode, Value) {
    let frontend = tempfile::tempdir().unwrap();
    let static_dir = frontend.path().to_string_lossy().into_owned();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::from(recognizer))
            .app_data(web::Data::new(stub.client()))
            .configure(|cfg| configure_routes(cfg, static_dir)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/generate-recipes/")
        .insert_header((CONTENT_TYPE, content_type.to_string()))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

#[actix_web::test]
async fn photo_round_trip_returns_ingredients_and_recipes() {
    let mut config = StubConfig::with_hits(&[42]);
    config.details.insert(
        42,
        json!({
            "title": "Tomato Soup",
            "image": "x.jpg",
            "extendedIngredients": [{"name": "tomato"}, {"name": "salt"}],
            "analyzedInstructions": [{"steps": [{"step": "Boil"}, {"step": "Serve"}]}]
        }),
    );
    let stub = StubRecipeApi::start(config).await;
    let recognizer = FixedRecognizer::new(&["Tomato"]);

    let (status, body) = post_upload(recognizer.clone(), &stub, "file", &png_bytes([200, 30, 30])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "ingredients": ["Tomato"],
            "recipes": [{
                "title": "Tomato Soup",
                "image": "x.jpg",
                "ingredients": ["tomato", "salt"],
                "steps": ["Boil", "Serve"]
            }]
        })
    );
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("/recipes/findByIngredients?"));
    assert!(requests[0].contains("ingredients=Tomato"));
    assert!(requests[0].contains("number=5"));
    assert!(requests[1].starts_with("/recipes/42/information?"));
    stub.stop().await;
}

#[actix_web::test]
async fn no_ingredients_skips_the_recipe_provider() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1, 2])).await;

    let (status, body) = post_upload(FixedRecognizer::new(&[]), &stub, "file", &png_bytes([0, 0, 0])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ingredients": [], "recipes": []}));
    assert!(stub.requests().is_empty());
    stub.stop().await;
}

#[actix_web::test]
async fn failed_detail_lookup_drops_only_that_recipe() {
    let mut config = StubConfig::with_hits(&[1, 2, 3, 4, 5]);
    config.details.remove(&3);
    let stub = StubRecipeApi::start(config).await;

    let (status, body) = post_upload(FixedRecognizer::new(&["Tomato", "Onion"]), &stub, "file", &png_bytes([9, 9, 9])).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Recipe 1", "Recipe 2", "Recipe 4", "Recipe 5"]);
    assert_eq!(stub.requests().len(), 6);
    stub.stop().await;
}

#[actix_web::test]
async fn search_failure_is_a_server_error() {
    let mut config = StubConfig::with_hits(&[1]);
    config.search_status = 402;
    let stub = StubRecipeApi::start(config).await;

    let (status, body) = post_upload(FixedRecognizer::new(&["Tomato"]), &stub, "file", &png_bytes([1, 2, 3])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("402"), "unexpected detail: {}", detail);
    assert_eq!(stub.requests().len(), 1);
    stub.stop().await;
}

#[actix_web::test]
async fn undecodable_upload_is_a_server_error() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1])).await;
    let recognizer = FixedRecognizer::new(&["Tomato"]);

    let (status, body) = post_upload(recognizer.clone(), &stub, "file", b"definitely not an image").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    assert!(stub.requests().is_empty());
    stub.stop().await;
}

#[actix_web::test]
async fn recognizer_failure_is_a_server_error() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1])).await;

    let (status, body) = post_upload(Arc::new(BrokenRecognizer), &stub, "file", &png_bytes([5, 5, 5])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("output shape"));
    assert!(stub.requests().is_empty());
    stub.stop().await;
}

#[actix_web::test]
async fn missing_file_field_is_a_bad_request() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1])).await;
    let recognizer = FixedRecognizer::new(&["Tomato"]);

    let (status, body) = post_upload(recognizer.clone(), &stub, "image", &png_bytes([5, 5, 5])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid upload: Missing file field");
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    stub.stop().await;
}

#[actix_web::test]
async fn oversized_upload_is_a_bad_request() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1])).await;
    let recognizer = FixedRecognizer::new(&["Tomato"]);
    let bytes = vec![0u8; MAX_UPLOAD_BYTES + 1];

    let (status, body) = post_upload(recognizer.clone(), &stub, "file", &bytes).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("File too large"));
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    assert!(stub.requests().is_empty());
    stub.stop().await;
}

#[actix_web::test]
async fn corrupt_multipart_body_is_a_bad_request() {
    let stub = StubRecipeApi::start(StubConfig::with_hits(&[1])).await;
    let recognizer = FixedRecognizer::new(&["Tomato"]);
    let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
    // Parts delimited by a boundary other than the declared one.
    let body = b"--some-other-boundary\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\r\n\
abc\r\n--some-other-boundary--\r\n"
        .to_vec();

    let (status, body) = post_raw(recognizer.clone(), &stub, &content_type, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid upload"));
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    stub.stop().await;
}

#[actix_web::test]
async fn transport_errors_do_not_echo_the_api_key() {
    let mut config = StubConfig::with_hits(&[1]);
    config.search_body = Some(json!({"message": "not a list"}));
    let stub = StubRecipeApi::start(config).await;

    let (status, body) = post_upload(FixedRecognizer::new(&["Tomato"]), &stub, "file", &png_bytes([1, 2, 3])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("HTTP request failed"), "unexpected detail: {}", detail);
    assert!(!detail.contains(API_KEY), "key leaked: {}", detail);
    assert!(!detail.contains("apiKey"), "key leaked: {}", detail);
    stub.stop().await;
}
