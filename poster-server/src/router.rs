//! Router construction for the poster upload server.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use poster_core::{RecordStore, SubmissionService};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SubmissionService>,
    pub records: Arc<dyn RecordStore>,
}

/// Build the full router. When `blob_root` is given, published blobs are
/// served read-only under `/blobs`.
pub fn build_router(
    state: AppState,
    blob_root: Option<PathBuf>,
    max_upload_bytes: usize,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/upload",
            post(handlers::upload::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        );

    if let Some(root) = blob_root {
        router = router.nest_service("/blobs", ServeDir::new(root));
    }

    router
        .fallback(handlers::health::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
