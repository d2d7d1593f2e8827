//! Poster publishing: the only writer of the shared poster.
//!
//! Read-modify-write of the poster is serialized by an in-process mutex, and
//! the final pointer swing is a versioned compare-and-set so writers in other
//! processes cannot silently drop each other's tiles. The swing is the last
//! step; anything that fails before it leaves the previous poster canonical.

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::blob_store::{BlobStore, PNG};
use crate::compositor::{Compositor, PosterBase};
use crate::error::{PosterError, StoreError};
use crate::geometry::Square;
use crate::store::RecordStore;
use crate::types::PointerSwing;

/// Recomposite attempts when another writer moves the pointer first.
pub const MAX_PUBLISH_ATTEMPTS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedPoster {
    pub path: String,
    pub url: String,
    pub preview_path: String,
    pub preview_url: String,
    pub version: u64,
}

pub struct PosterPublisher {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    compositor: Compositor,
    starter_path: String,
    write_lock: Mutex<()>,
}

impl PosterPublisher {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        compositor: Compositor,
        starter_path: impl Into<String>,
    ) -> Self {
        Self {
            records,
            blobs,
            compositor,
            starter_path: starter_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Composite `tile` at `square` onto the current poster and make the
    /// result the new current poster.
    #[tracing::instrument(skip(self, tile), fields(%square))]
    pub async fn publish_tile(
        &self,
        tile: &[u8],
        square: Square,
    ) -> Result<PublishedPoster, PosterError> {
        let _writer = self.write_lock.lock().await;

        for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
            let config = self.records.load_config().await?;
            let base = self
                .current_poster(config.latest_poster_path.as_deref())
                .await?;

            let compositor = self.compositor;
            let tile_bytes = tile.to_vec();
            let composite = tokio::task::spawn_blocking(move || {
                compositor.composite(base, &tile_bytes, square)
            })
            .await??;

            // Fresh paths every attempt: earlier versions stay as history.
            let stem = format!(
                "posters/{:06}-{}",
                config.poster_version + 1,
                Uuid::new_v4().simple()
            );
            let path = format!("{stem}.png");
            let preview_path = format!("{stem}-preview.png");

            let locator = self.blobs.upload(&path, &composite.poster, PNG).await?;
            let preview_locator = self
                .blobs
                .upload(&preview_path, &composite.preview, PNG)
                .await?;
            let url = self.blobs.publish(&locator).await?;
            let preview_url = self.blobs.publish(&preview_locator).await?;

            match self
                .records
                .compare_and_set_poster(config.poster_version, &path)
                .await?
            {
                PointerSwing::Swung { version } => {
                    tracing::info!(version, %path, "poster published");
                    return Ok(PublishedPoster {
                        path,
                        url,
                        preview_path,
                        preview_url,
                        version,
                    });
                }
                PointerSwing::Stale { current_version } => {
                    tracing::warn!(
                        attempt,
                        expected = config.poster_version,
                        current_version,
                        "poster pointer moved during publish, recompositing"
                    );
                }
            }
        }

        Err(PosterError::Conflict {
            attempts: MAX_PUBLISH_ATTEMPTS,
        })
    }

    /// Latest published poster, else the starter image, else a blank canvas.
    async fn current_poster(&self, latest: Option<&str>) -> Result<PosterBase, PosterError> {
        if let Some(path) = latest {
            return Ok(PosterBase::Encoded(self.blobs.download(path).await?));
        }
        match self.blobs.download(&self.starter_path).await {
            Ok(bytes) => Ok(PosterBase::Encoded(bytes)),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(starter = %self.starter_path, "no starter poster, using blank canvas");
                Ok(PosterBase::Blank)
            }
            Err(e) => Err(e.into()),
        }
    }
}
