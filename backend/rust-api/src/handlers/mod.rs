use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{QuizError, StoreError};
use crate::metrics;
use crate::services::game_service::GameServiceError;
use crate::services::AppState;

pub mod chat;
pub mod games;
pub mod leaderboard;
pub mod sse;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Validation(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::InvalidSelection { .. } => ApiError::BadRequest(err.to_string()),
            QuizError::AlreadyAnswered { .. }
            | QuizError::NotAnswered { .. }
            | QuizError::GameCompleted => ApiError::Conflict(err.to_string()),
            QuizError::QuestionOutOfRange { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<GameServiceError> for ApiError {
    fn from(err: GameServiceError) -> Self {
        match err {
            GameServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            GameServiceError::Quiz(quiz) => quiz.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    let sessions = dependency_health(
        "Session store",
        tokio::time::timeout(Duration::from_secs(1), state.sessions.ping()).await,
    );
    let cache = dependency_health(
        "Leaderboard cache",
        tokio::time::timeout(Duration::from_millis(500), state.leaderboard_cache.ping()).await,
    );

    let all_healthy = [&sessions, &cache]
        .iter()
        .all(|dep| dep.get("status").and_then(|v| v.as_str()) == Some("healthy"));
    dependencies.insert("session_store".to_string(), json!(sessions));
    dependencies.insert("leaderboard_cache".to_string(), json!(cache));

    let (status_code, status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "policynavigator-api",
            "version": env!("CARGO_PKG_VERSION"),
            "storage_backend": state.config.storage_backend,
            "questions": state.catalog.len(),
            "active_games": state.games.active_count().await,
            "dependencies": dependencies
        })),
    )
}

fn dependency_health(
    name: &str,
    result: Result<Result<(), StoreError>, tokio::time::error::Elapsed>,
) -> serde_json::Map<String, serde_json::Value> {
    let mut health = serde_json::Map::new();

    match result {
        Ok(Ok(())) => {
            health.insert("status".to_string(), json!("healthy"));
            health.insert("message".to_string(), json!(format!("{} reachable", name)));
        }
        Ok(Err(e)) => {
            health.insert("status".to_string(), json!("unhealthy"));
            health.insert("error".to_string(), json!(format!("{} error: {}", name, e)));
        }
        Err(_) => {
            health.insert("status".to_string(), json!("unhealthy"));
            health.insert("error".to_string(), json!(format!("{} timeout", name)));
        }
    }

    health
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// HTTP Basic Auth for `/metrics`, credentials from `METRICS_AUTH` (`user:password`).
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());
    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
