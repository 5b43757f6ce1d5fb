use axum::{Json, Router, extract::State, routing::post};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    backend::{error::ApiError, json::AppJson, state::AppState},
    models::{LoginRequest, LoginResponse},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/login", post(login))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let admin = &state.admin;
    if !email.eq_ignore_ascii_case(&admin.email) || req.password != admin.password {
        warn!(email, "admin login rejected");
        return Err(ApiError::invalid_credentials());
    }

    info!(email, "admin logged in");
    Ok(Json(LoginResponse {
        token: Some(Uuid::new_v4().to_string()),
        admin: Some(admin.profile.clone()),
    }))
}
