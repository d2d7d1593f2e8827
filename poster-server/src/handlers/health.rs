//! GET /health

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::handlers::{poster_error, ApiError};
use crate::router::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub submissions_open: bool,
    pub poster_version: u64,
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let config = state
        .records
        .load_config()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "health check could not read poster config");
            poster_error(e.into())
        })?;
    Ok(Json(HealthResponse {
        status: "ok",
        submissions_open: config.submissions_are_open,
        poster_version: config.poster_version,
    }))
}

pub async fn not_found() -> ApiError {
    crate::handlers::error_response(StatusCode::NOT_FOUND, "no such route")
}
