use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use crate::{
    backend::{error::ApiError, json::AppJson, state::AppState, state::new_id},
    models::{Query, QueryStatus, QueryStatusUpdate},
};

/// Body the public contact form posts.
#[derive(Debug, Deserialize)]
pub struct NewQueryRequest {
    pub name: String,
    pub phone: String,
    pub department: String,
    #[serde(default)]
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/queries", get(list_queries).post(create_query))
        .route(
            "/api/queries/{id}",
            put(update_query_status).delete(delete_query),
        )
}

pub async fn list_queries(State(state): State<AppState>) -> Json<Vec<Query>> {
    Json(state.data.read().await.queries.clone())
}

pub async fn create_query(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewQueryRequest>,
) -> Result<Json<Query>, ApiError> {
    if [&req.name, &req.phone, &req.department]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(ApiError::validation("name, phone and department are required"));
    }

    let now = Utc::now();
    let query = Query {
        id: new_id(),
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        department: req.department.trim().to_string(),
        message: req.message,
        status: QueryStatus::Pending,
        created_at: Some(now),
        updated_at: Some(now),
    };
    state.data.write().await.queries.push(query.clone());
    info!(id = %query.id, "query received");
    Ok(Json(query))
}

pub async fn update_query_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<QueryStatusUpdate>,
) -> Result<Json<Query>, ApiError> {
    let mut data = state.data.write().await;
    let query = data
        .queries
        .iter_mut()
        .find(|q| q.id == id)
        .ok_or_else(|| ApiError::not_found("query", &id))?;

    query.status = req.status;
    query.updated_at = Some(Utc::now());
    info!(id = %id, status = %req.status, "query status changed");
    Ok(Json(query.clone()))
}

pub async fn delete_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let mut data = state.data.write().await;
    let before = data.queries.len();
    data.queries.retain(|q| q.id != id);
    if data.queries.len() == before {
        return Err(ApiError::not_found("query", &id));
    }
    info!(id = %id, "query deleted");
    Ok(Json(json!({ "message": "Query deleted" })))
}
