//! Startup wiring: record store, seeding, blob store and router.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use poster_core::{
    Compositor, FileRecordStore, LocalBlobStore, MemoryRecordStore, PosterConfig, RecordStore,
    SubmissionService,
};

use crate::config::PosterSettings;
use crate::router::{build_router, AppState};
use crate::seed::seed_invitations;

/// Open the record store named by `settings`. `POSTER_SUBMISSIONS_OPEN`, when
/// set, overrides whatever the store remembered.
pub async fn open_records(settings: &PosterSettings) -> Result<Arc<dyn RecordStore>> {
    let initial = PosterConfig {
        submissions_are_open: settings.submissions_open.unwrap_or(true),
        ..PosterConfig::default()
    };
    let records: Arc<dyn RecordStore> = match &settings.state_file {
        Some(path) => Arc::new(
            FileRecordStore::open(path, initial)
                .await
                .with_context(|| format!("failed to open state file {}", path.display()))?,
        ),
        None => {
            tracing::warn!("POSTER_STATE_FILE not set, records will not survive a restart");
            Arc::new(MemoryRecordStore::with_config(initial))
        }
    };
    if let Some(open) = settings.submissions_open {
        records
            .set_submissions_open(open)
            .await
            .context("failed to apply POSTER_SUBMISSIONS_OPEN")?;
    }
    Ok(records)
}

/// Everything `main` needs to serve: the router plus the config it started with.
pub async fn build_app(settings: &PosterSettings) -> Result<(Router, PosterConfig)> {
    let records = open_records(settings).await?;

    if let Some(path) = &settings.invitations_file {
        seed_invitations(records.as_ref(), path).await?;
    }

    tokio::fs::create_dir_all(&settings.blob_root)
        .await
        .with_context(|| format!("failed to create {}", settings.blob_root.display()))?;
    let blobs = Arc::new(LocalBlobStore::new(
        settings.blob_root.clone(),
        settings.public_base_url.clone(),
    ));

    let service = Arc::new(SubmissionService::new(
        records.clone(),
        blobs,
        Compositor::new(settings.preview_width),
        settings.starter_path.clone(),
    ));

    let config = records
        .load_config()
        .await
        .context("failed to read poster config")?;

    let app = build_router(
        AppState { service, records },
        Some(settings.blob_root.clone()),
        settings.max_upload_bytes,
    );
    Ok((app, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn settings_in(dir: &TempDir) -> PosterSettings {
        PosterSettings {
            blob_root: dir.path().join("blobs"),
            state_file: Some(dir.path().join("state/records.json")),
            ..PosterSettings::default()
        }
    }

    #[tokio::test]
    async fn build_app_serves_health_from_file_store() {
        let dir = TempDir::new().unwrap();
        let invitations = dir.path().join("invitations.yaml");
        std::fs::write(&invitations, "- id: holly\n  participant: Robin\n").unwrap();
        let settings = PosterSettings {
            invitations_file: Some(invitations),
            ..settings_in(&dir)
        };

        let (app, config) = build_app(&settings).await.unwrap();
        assert!(config.submissions_are_open);
        assert_eq!(config.poster_version, 0);
        assert!(settings.blob_root.is_dir());
        assert!(dir.path().join("state/records.json").is_file());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn explicit_switch_overrides_persisted_flag() {
        let dir = TempDir::new().unwrap();
        let closed = PosterSettings {
            submissions_open: Some(false),
            ..settings_in(&dir)
        };
        let records = open_records(&closed).await.unwrap();
        assert!(!records.load_config().await.unwrap().submissions_are_open);
        drop(records);

        // Unset keeps the stored value.
        let records = open_records(&settings_in(&dir)).await.unwrap();
        assert!(!records.load_config().await.unwrap().submissions_are_open);
        drop(records);

        let reopened = PosterSettings {
            submissions_open: Some(true),
            ..settings_in(&dir)
        };
        let records = open_records(&reopened).await.unwrap();
        assert!(records.load_config().await.unwrap().submissions_are_open);
    }
}
