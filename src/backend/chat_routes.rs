use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::{
    backend::{error::ApiError, json::AppJson, state::AppState, state::new_id},
    models::{ChatQuery, ChatStatus, ChatStatusUpdate},
};

/// Body the site's chat widget posts before handing over to WhatsApp.
#[derive(Debug, Deserialize)]
pub struct NewChatRequest {
    pub name: String,
    pub phone: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chats", get(list_chats).post(create_chat))
        .route("/api/chats/{id}", put(update_chat_status))
}

pub async fn list_chats(State(state): State<AppState>) -> Json<Vec<ChatQuery>> {
    Json(state.data.read().await.chats.clone())
}

pub async fn create_chat(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewChatRequest>,
) -> Result<Json<ChatQuery>, ApiError> {
    if req.name.trim().is_empty() || req.phone.trim().is_empty() {
        return Err(ApiError::validation("name and phone are required"));
    }

    let chat = ChatQuery {
        id: new_id(),
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        status: ChatStatus::Pending,
        created_at: Some(Utc::now()),
    };
    state.data.write().await.chats.push(chat.clone());
    info!(id = %chat.id, "chat started");
    Ok(Json(chat))
}

pub async fn update_chat_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<ChatStatusUpdate>,
) -> Result<Json<ChatQuery>, ApiError> {
    let mut data = state.data.write().await;
    let chat = data
        .chats
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found("chat", &id))?;

    chat.status = req.status;
    info!(id = %id, status = %req.status, "chat status changed");
    Ok(Json(chat.clone()))
}
