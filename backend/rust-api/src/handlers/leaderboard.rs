use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    models::{leaderboard::LeaderboardView, CatalogResponse},
    services::AppState,
};

pub async fn leaderboard(State(state): State<Arc<AppState>>) -> Json<LeaderboardView> {
    Json(state.leaderboard_service().top().await)
}

/// The catalog without answers.
pub async fn questions(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        version: state.catalog.version().to_string(),
        total_questions: state.catalog.len(),
        questions: state.catalog.public_questions(),
    })
}
