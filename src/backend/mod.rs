//! In-memory implementation of the clinic REST contract, used for local
//! development and by the integration tests.

pub mod admin_routes;
pub mod appointment_routes;
pub mod chat_routes;
pub mod error;
pub mod json;
pub mod query_routes;
pub mod state;

use axum::Router;
use axum::http::Uri;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(appointment_routes::router())
        .merge(query_routes::router())
        .merge(chat_routes::router())
        .merge(admin_routes::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound("NOT_FOUND", format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn app() -> (Router, AppState) {
        let state = AppState::new("admin@clinic.test", "secret");
        (router(state.clone()), state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn ali() -> Value {
        json!({
            "clinic": "Smile Dental Clinic",
            "service": "Root Canal",
            "date": "2025-09-01",
            "time": "10:00 AM",
            "name": "Ali",
            "phone": "03001234567",
            "message": "",
            "status": "pending"
        })
    }

    #[tokio::test]
    async fn created_appointment_is_listed_as_pending() {
        let (app, _) = app();
        let (status, created) = call(&app, Method::POST, "/api/appointmentRoutes", Some(ali())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "pending");
        assert!(created["_id"].as_str().is_some_and(|id| !id.is_empty()));

        let (_, list) = call(&app, Method::GET, "/api/appointmentRoutes", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["name"], "Ali");
    }

    #[tokio::test]
    async fn status_update_sets_amount_and_unknown_id_is_404() {
        let (app, _) = app();
        let (_, created) = call(&app, Method::POST, "/api/appointmentRoutes", Some(ali())).await;
        let id = created["_id"].as_str().unwrap();

        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/api/appointmentRoutes/{id}"),
            Some(json!({ "status": "completed", "amount": 5000 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "completed");
        assert_eq!(updated["amount"], 5000.0);

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/appointmentRoutes/missing",
            Some(json!({ "status": "rejected" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let (app, _) = app();
        let (_, created) = call(&app, Method::POST, "/api/appointmentRoutes", Some(ali())).await;
        let id = created["_id"].as_str().unwrap();
        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/appointmentRoutes/{id}"),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn malformed_body_uses_error_envelope() {
        let (app, _) = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/admin/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = call(&app, Method::POST, "/api/queries", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn incomplete_appointment_is_a_validation_error() {
        let (app, _) = app();
        let mut body = ali();
        body["phone"] = json!("  ");
        let (status, res) = call(&app, Method::POST, "/api/appointmentRoutes", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn query_lifecycle() {
        let (app, state) = app();
        let (_, q) = call(
            &app,
            Method::POST,
            "/api/queries",
            Some(json!({ "name": "Hina", "phone": "0321", "department": "orthodontics" })),
        )
        .await;
        let id = q["_id"].as_str().unwrap().to_string();
        assert_eq!(q["status"], "pending");

        let (status, q) = call(
            &app,
            Method::PUT,
            &format!("/api/queries/{id}"),
            Some(json!({ "status": "answered" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(q["status"], "answered");

        let (status, _) = call(&app, Method::DELETE, &format!("/api/queries/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.data.read().await.queries.is_empty());

        let (status, _) = call(&app, Method::DELETE, &format!("/api/queries/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_status_accepts_only_wire_values() {
        let (app, _) = app();
        let (_, chat) = call(
            &app,
            Method::POST,
            "/api/chats",
            Some(json!({ "name": "Usman", "phone": "+923331234567" })),
        )
        .await;
        let id = chat["_id"].as_str().unwrap();

        let (status, closed) = call(
            &app,
            Method::PUT,
            &format!("/api/chats/{id}"),
            Some(json!({ "status": "closed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(closed["status"], "closed");

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/chats/{id}"),
            Some(json!({ "status": "completed" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn login_checks_credentials() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/login",
            Some(json!({ "email": "Admin@Clinic.test", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["admin"]["email"], "admin@clinic.test");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/admin/login",
            Some(json!({ "email": "admin@clinic.test", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_route_uses_error_envelope() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/api/patients", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "no route for /api/patients");
    }
}
