//! POST /upload
//!
//! Multipart form with an `invitation` field (the older `passphrase` name is
//! still accepted) and an `image` file field.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use poster_core::SubmissionReceipt;

use crate::handlers::{error_response, poster_error, ApiError};
use crate::router::AppState;

const MISSING_FIELDS: &str = "Need both invitation and image in form data.";

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let mut invitation: Option<String> = None;
    let mut image: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "invitation" | "passphrase" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
                let text = text.trim();
                if !text.is_empty() {
                    invitation = Some(text.to_string());
                }
            }
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    let (Some(invitation), Some(image)) = (invitation, image) else {
        return Err(error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS));
    };

    match state.service.submit(&invitation, image).await {
        Ok(receipt) => Ok((StatusCode::CREATED, Json(receipt))),
        Err(err) => {
            let (status, body) = poster_error(err);
            if status.is_server_error() {
                tracing::error!(%invitation, error = %body.error, "submission failed");
            } else {
                tracing::warn!(%invitation, error = %body.error, "submission rejected");
            }
            Err((status, body))
        }
    }
}
