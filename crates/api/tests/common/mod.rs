#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use hyperspace_core::executor::JobCompletion;
use hyperspace_core::shape::{JobError, JobPayload, JobProcessor, ShapeData};
use hyperspace_core::types::TrackingToken;
use tokio::sync::mpsc;
use tower::ServiceExt;

use hyperspace_api::app;
use hyperspace_api::config::ServerConfig;
use hyperspace_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:4200".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_bytes: 1024 * 1024,
        job_workers: 4,
        job_simulated_latency_ms: 0,
        scene_tick_ms: 1000,
        heartbeat_interval_secs: 30,
    }
}

/// Processor that returns a fixed vertex list, named after the upload.
pub struct FixedShape;

#[async_trait]
impl JobProcessor for FixedShape {
    async fn process(&self, payload: JobPayload) -> Result<ShapeData, JobError> {
        Ok(ShapeData {
            source_file: payload.file_name,
            vertices: vec![0.1, 0.2, 0.3],
        })
    }
}

/// Wire up application state around `processor`.
pub fn test_state(
    processor: Arc<dyn JobProcessor>,
) -> (AppState, mpsc::UnboundedReceiver<JobCompletion>) {
    AppState::new(test_config(), processor)
}

/// Build the application router with the correlation router running, as
/// `main.rs` does.
pub fn build_test_app(processor: Arc<dyn JobProcessor>) -> (Router, AppState) {
    let (state, completions) = test_state(processor);
    tokio::spawn(Arc::clone(&state.correlation).run(completions));
    (app::build_app(state.clone()), state)
}

pub fn token(value: &str) -> TrackingToken {
    TrackingToken::from_client(value)
}

pub fn shape(source_file: &str) -> ShapeData {
    ShapeData {
        source_file: source_file.to_string(),
        vertices: vec![0.1, 0.2, 0.3],
    }
}

/// Decode a hub frame into `(event, payload)`.
pub fn decode_event(message: Message) -> (String, serde_json::Value) {
    let Message::Text(text) = message else {
        panic!("expected a text frame, got: {message:?}");
    };
    let mut json: serde_json::Value =
        serde_json::from_str(text.as_str()).expect("hub frame should be JSON");
    let event = json["event"]
        .as_str()
        .expect("hub frame should name its event")
        .to_string();
    (event, json["payload"].take())
}

/// Drain every frame currently queued on `rx`.
pub fn drain_events(rx: &mut mpsc::Receiver<Message>) -> Vec<(String, serde_json::Value)> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        events.push(decode_event(message));
    }
    events
}

/// Send a request through the router and return the response.
pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should be handled")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub const BOUNDARY: &str = "hyperspace-test-boundary";

/// Build a `multipart/form-data` upload request with a single file part.
pub fn upload_request(field: &str, file_name: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/eeg/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}
