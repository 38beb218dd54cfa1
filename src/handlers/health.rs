// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::error::AppError;

/// Basic service identity probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness: the process is up and serving requests.
pub async fn live() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness: the database answers. 503 when it does not, so a load
/// balancer can pull the instance without killing it.
pub async fn ready(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Database not ready: {}", e)))?;

    Ok(Json(json!({ "status": "ready" })))
}
