use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    models::chat::{
        ChatMessage, ChatRequest, ChatResponse, HistoryQuery, LegalAdviceRequest,
        LegalAdviceResponse,
    },
    services::{chat_service::ChatService, AppState},
};

use super::ApiError;

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    req.validate()?;
    let service = ChatService::from_state(&state);
    Ok(Json(service.ask(req).await))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<ChatMessage>> {
    let service = ChatService::from_state(&state);
    Json(service.history(&session_id, query.limit).await)
}

pub async fn legal_advice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LegalAdviceRequest>,
) -> Result<Json<LegalAdviceResponse>, ApiError> {
    req.validate()?;
    let service = ChatService::from_state(&state);
    Ok(Json(service.legal_advice(&req)))
}
