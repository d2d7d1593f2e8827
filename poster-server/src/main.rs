//! poster-server: upload endpoint for the holiday poster.
//!
//! Settings come from `POSTER_*` environment variables (a `.env` file is
//! read first when present). See `config.rs` for the full list.

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use poster_server::{app::build_app, PosterSettings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,poster_server=debug,poster_core=debug".into()),
        )
        .init();

    let settings = PosterSettings::from_env();
    tracing::debug!(?settings, "loaded settings");

    let (app, config) = build_app(&settings).await?;

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", settings.bind_addr))?;
    tracing::info!(
        addr = %settings.bind_addr,
        submissions_open = config.submissions_are_open,
        poster_version = config.poster_version,
        "poster-server listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
