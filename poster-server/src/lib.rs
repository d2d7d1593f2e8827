//! HTTP surface for the holiday poster: one multipart upload endpoint, a
//! health probe, and static serving of published blobs.

pub mod app;
pub mod config;
pub mod handlers;
pub mod router;
pub mod seed;

pub use config::PosterSettings;
pub use router::{build_router, AppState};
