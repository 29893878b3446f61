use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    models::game::{
        AdvanceResponse, GameView, StartGameRequest, StartGameResponse, SubmitAnswerRequest,
        SubmitAnswerResponse,
    },
    services::{game_service::GameService, AppState},
};

use super::ApiError;

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    tracing::info!("Starting game for player_id={}", req.player_id);

    let service = GameService::from_state(&state);
    let response: StartGameResponse = service.start_session(req).await?;

    let status = if response.game.restored {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let service = GameService::from_state(&state);
    Ok(Json(service.state(&player_id).await?))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    req.validate()?;
    tracing::debug!(
        "Submitting answer: player_id={}, selected_index={}",
        player_id,
        req.selected_index
    );

    let service = GameService::from_state(&state);
    Ok(Json(service.submit_answer(&player_id, &req).await?))
}

pub async fn advance(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let service = GameService::from_state(&state);
    Ok(Json(service.advance(&player_id).await?))
}

pub async fn restart(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<StartGameResponse>, ApiError> {
    let service = GameService::from_state(&state);
    Ok(Json(service.restart(&player_id).await?))
}

pub async fn end_game(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = GameService::from_state(&state);
    service.end_session(&player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
