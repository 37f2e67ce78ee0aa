use std::future::Future;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sticker_studio::api::{router, AppState};
use sticker_studio::utils::upload::UploadedImage;
use sticker_studio::{AppError, AppResult, ImageGenerator, WorkflowController};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
const BOUNDARY: &str = "sticker-test-boundary";

#[derive(Default)]
struct StubGenerator {
    prompts: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl ImageGenerator for StubGenerator {
    fn generate(&self, prompt: &str, _image: &UploadedImage) -> impl Future<Output = AppResult<String>> + Send {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let fail = self.fail_on.map_or(false, |f| prompt.contains(f));
        async move {
            if fail {
                Err(AppError::GenerationFailed("model overloaded".to_string()))
            } else {
                Ok("data:image/png;base64,aGVsbG8=".to_string())
            }
        }
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

fn app_with(generator: Option<StubGenerator>) -> (Router, Arc<AppState<StubGenerator>>) {
    let state = Arc::new(AppState::new(WorkflowController::new(generator, "configured-model")));
    (router(state.clone()), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(app: &Router, file_name: &str, content_type: &str, data: &[u8]) -> (StatusCode, Value) {
    let body = multipart_body(file_name, content_type, data);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn at_base(app: &Router) {
    assert_eq!(upload(app, "me.png", "image/png", PNG).await.0, StatusCode::OK);
    assert_eq!(send(app, Method::POST, "/consent", Some(json!({"accepted": true}))).await.0, StatusCode::OK);
    assert_eq!(send(app, Method::POST, "/generate/base", None).await.0, StatusCode::OK);
}

#[tokio::test]
async fn initial_session_is_upload() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    let (status, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["state"], "upload");
    assert_eq!(v["can_generate_base"], false);
    assert_eq!(v["generation_enabled"], true);
    assert_eq!(v["settings"]["style"], "cute");
}

#[tokio::test]
async fn base_requires_upload_and_consent() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    let (status, v) = send(&app, Method::POST, "/generate/base", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("Upload an image"));

    let (status, v) = upload(&app, "me.png", "image/png", PNG).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["image"]["media_type"], "image/png");
    assert_eq!(v["image"]["preview"], "data:image/png;base64,iVBORw0KGgoAAAAA");
    assert_eq!(v["can_generate_base"], false);

    let (status, _) = send(&app, Method::POST, "/generate/base", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, v) = send(&app, Method::POST, "/consent", Some(json!({"accepted": true}))).await;
    assert_eq!(v["can_generate_base"], true);
}

#[tokio::test]
async fn full_flow_with_partial_variant_failure() {
    let generator = StubGenerator { fail_on: Some("\"no\""), ..Default::default() };
    let (app, state) = app_with(Some(generator));
    at_base(&app).await;

    let (status, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["state"], "base_generated");
    assert_eq!(v["base"]["label"], "original");

    let (status, v) = send(&app, Method::POST, "/generate/confirm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["session"]["state"], "variants_generated");
    assert_eq!(v["session"]["variants"].as_array().unwrap().len(), 3);

    let (status, v) = send(&app, Method::POST, "/generate/custom", Some(json!({"text": "yes, no, ok"}))).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<_> = v["session"]["variants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["yes", "ok"]);
    assert_eq!(v["errors"].as_array().unwrap().len(), 1);
    assert!(v["session"]["error"].as_str().unwrap().contains("model overloaded"));

    let session = state.session.read().await;
    assert_eq!(session.variants().len(), 2);
}

#[tokio::test]
async fn new_upload_resets_results() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    at_base(&app).await;
    send(&app, Method::POST, "/generate/confirm", None).await;

    let (status, v) = upload(&app, "other.png", "image/png", PNG).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["state"], "upload");
    assert_eq!(v["base"], Value::Null);
    assert!(v["variants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_upload_surfaces_error() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    let (status, v) = upload(&app, "notes.txt", "text/plain", b"just text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().starts_with("Failed to read image"));

    let (_, v) = send(&app, Method::GET, "/session", None).await;
    assert!(v["error"].as_str().unwrap().contains("notes.txt"));
    assert_eq!(v["image"], Value::Null);
}

#[tokio::test]
async fn metadata_export_reflects_settings() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    let (status, _) = send(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({"style": "custom", "customStyle": "ink wash", "styleStrength": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder().uri("/export/metadata").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"sticker-metadata.json\"");
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["style"], "custom");
    assert_eq!(v["customStyle"], "ink wash");
    assert_eq!(v["styleStrength"], 40);
    assert_eq!(v["model"], "stub-model");
    assert!(v["timestamp"].is_string());
}

#[tokio::test]
async fn sticker_downloads() {
    let (app, state) = app_with(Some(StubGenerator::default()));
    let req = Request::builder().uri("/export/base").body(Body::empty()).unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);

    at_base(&app).await;
    send(&app, Method::POST, "/generate/custom", Some(json!({"text": "thumbs up"}))).await;

    let req = Request::builder().uri("/export/base").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"sticker-00-original.png\""
    );
    assert_eq!(&hyper::body::to_bytes(resp.into_body()).await.unwrap()[..], b"hello");

    let id = state.session.read().await.variants()[0].id;
    let req = Request::builder()
        .uri(format!("/export/variants/{}", id))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"sticker-01-thumbs-up.png\""
    );

    let req = Request::builder()
        .uri(format!("/export/variants/{}", uuid::Uuid::new_v4()))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn busy_session_refuses_new_actions() {
    let (app, state) = app_with(Some(StubGenerator::default()));
    let guard = state.session.write().await;

    let (status, v) = send(&app, Method::POST, "/generate/base", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(v["error"], "A generation is already in progress");

    let (status, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["loading"], true);
    drop(guard);

    let (_, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(v["loading"], false);
}

#[tokio::test]
async fn missing_credential_disables_generation() {
    let (app, _) = app_with(None);
    upload(&app, "me.png", "image/png", PNG).await;
    send(&app, Method::POST, "/consent", Some(json!({"accepted": true}))).await;

    let (_, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(v["generation_enabled"], false);
    assert_eq!(v["can_generate_base"], false);

    let (status, v) = send(&app, Method::POST, "/generate/base", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn slow_upload_does_not_hold_session() {
    let (app, _) = app_with(Some(StubGenerator::default()));
    let body = multipart_body("me.png", "image/png", PNG);
    let (head, tail) = body.split_at(body.len() / 2);
    let (mut sender, stream) = Body::channel();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(stream)
        .unwrap();
    let pending = tokio::spawn(app.clone().oneshot(req));

    sender.send_data(hyper::body::Bytes::copy_from_slice(head)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let (status, _) = send(&app, Method::PUT, "/settings", Some(json!({"style": "pixel"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(v["loading"], false);

    sender.send_data(hyper::body::Bytes::copy_from_slice(tail)).await.unwrap();
    drop(sender);
    let resp = pending.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let (_, v) = send(&app, Method::GET, "/session", None).await;
    assert_eq!(v["image"]["file_name"], "me.png");
    assert_eq!(v["settings"]["style"], "pixel");
}
