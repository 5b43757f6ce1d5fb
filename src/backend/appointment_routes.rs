use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use crate::{
    backend::{error::ApiError, json::AppJson, state::AppState, state::new_id},
    models::{Appointment, AppointmentStatusUpdate, CreateAppointmentBody},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/appointmentRoutes",
            get(list_appointments).post(create_appointment),
        )
        .route(
            "/api/appointmentRoutes/{id}",
            get(get_appointment)
                .put(update_appointment_status)
                .delete(delete_appointment),
        )
}

pub async fn list_appointments(State(state): State<AppState>) -> Json<Vec<Appointment>> {
    Json(state.data.read().await.appointments.clone())
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let data = state.data.read().await;
    data.appointments
        .iter()
        .find(|a| a.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("appointment", &id))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateAppointmentBody>,
) -> Result<Json<Appointment>, ApiError> {
    body.appointment
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let req = body.appointment;
    let now = Utc::now();
    let created = Appointment {
        id: new_id(),
        clinic: req.clinic.trim().to_string(),
        service: req.service.trim().to_string(),
        date: req.date.trim().to_string(),
        time: req.time.trim().to_string(),
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        message: req.message,
        status: body.status,
        amount: None,
        created_at: Some(now),
        updated_at: Some(now),
    };

    state.data.write().await.appointments.push(created.clone());
    info!(id = %created.id, "appointment created");
    Ok(Json(created))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<AppointmentStatusUpdate>,
) -> Result<Json<Appointment>, ApiError> {
    if req.amount.is_some_and(|a| !a.is_finite() || a < 0.0) {
        return Err(ApiError::validation("amount must be a non-negative number"));
    }

    let mut data = state.data.write().await;
    let appointment = data
        .appointments
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| ApiError::not_found("appointment", &id))?;

    appointment.status = req.status;
    if let Some(amount) = req.amount {
        appointment.amount = Some(amount);
    }
    appointment.updated_at = Some(Utc::now());

    info!(id = %id, status = %req.status, "appointment status changed");
    Ok(Json(appointment.clone()))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, ApiError> {
    let mut data = state.data.write().await;
    let before = data.appointments.len();
    data.appointments.retain(|a| a.id != id);
    if data.appointments.len() == before {
        return Err(ApiError::not_found("appointment", &id));
    }
    info!(id = %id, "appointment deleted");
    Ok(Json(json!({ "message": "Appointment deleted" })))
}
