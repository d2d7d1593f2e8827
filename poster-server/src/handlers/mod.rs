pub mod health;
pub mod upload;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use poster_core::PosterError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<PosterError> for ErrorResponse {
    fn from(err: PosterError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Map a core error to its HTTP status and JSON body. Logging is left to
/// the caller, which knows what was being attempted.
pub fn poster_error(err: PosterError) -> ApiError {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.into()))
}
