//! Liveness endpoints.

use axum::{http::StatusCode, response::IntoResponse, Json};

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Static acknowledgment that the backend is up.
pub async fn test() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "The backend is running! 🚀" }))
}
