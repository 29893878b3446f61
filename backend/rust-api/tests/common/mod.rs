#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use policynavigator_api::{
    config::{Config, StorageBackend},
    create_router,
    services::{catalog::QuestionCatalog, AppState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage_backend = StorageBackend::Memory;
    config.persistence.background = false;
    config.quiz.tick_interval_ms = 50;
    config
}

pub fn create_test_app() -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let app_state =
        Arc::new(AppState::in_memory(test_config()).expect("Failed to initialize test app state"));

    create_router(app_state)
}

/// Correct option for the question at `index` in the bundled catalog.
pub fn correct_index(index: usize) -> usize {
    QuestionCatalog::builtin()
        .expect("bundled catalog")
        .get(index)
        .expect("question index")
        .correct_index
}

pub fn question_count() -> usize {
    QuestionCatalog::builtin().expect("bundled catalog").len()
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
