//! Submission orchestration.
//!
//! Steps run strictly in order: open check, invitation lookup, normalize,
//! assign square, store tile, publish poster, append submission record.
//! Nothing is rolled back. A failure after the square is assigned leaves it
//! assigned, and resubmitting reuses it.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::allocator::SquareAllocator;
use crate::blob_store::{BlobStore, PNG};
use crate::compositor::Compositor;
use crate::error::PosterError;
use crate::geometry::Square;
use crate::normalizer::normalize;
use crate::publisher::PosterPublisher;
use crate::store::RecordStore;
use crate::types::Submission;

/// What the uploader gets back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub invitation_id: String,
    pub square: Square,
    pub participant: Option<String>,
    pub tile_url: String,
    pub poster_url: String,
    pub preview_url: String,
    pub poster_version: u64,
}

pub struct SubmissionService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    allocator: SquareAllocator,
    publisher: PosterPublisher,
}

impl SubmissionService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        compositor: Compositor,
        starter_path: impl Into<String>,
    ) -> Self {
        Self {
            allocator: SquareAllocator::new(records.clone()),
            publisher: PosterPublisher::new(
                records.clone(),
                blobs.clone(),
                compositor,
                starter_path,
            ),
            records,
            blobs,
        }
    }

    pub fn allocator(&self) -> &SquareAllocator {
        &self.allocator
    }

    pub fn publisher(&self) -> &PosterPublisher {
        &self.publisher
    }

    #[tracing::instrument(skip(self, raw_image), fields(bytes = raw_image.len()))]
    pub async fn submit(
        &self,
        invitation_id: &str,
        raw_image: Vec<u8>,
    ) -> Result<SubmissionReceipt, PosterError> {
        let config = self.records.load_config().await?;
        if !config.submissions_are_open {
            return Err(PosterError::Closed);
        }

        let invitation = self
            .records
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| PosterError::NotFound(format!("invitation {invitation_id}")))?;

        // Normalize before any record is touched: a bad upload must not cost
        // the invitation a square.
        let tile = tokio::task::spawn_blocking(move || normalize(&raw_image)).await??;

        let square = self.allocator.assign_or_get_square(invitation_id).await?;

        let tile_path = format!("tiles/{}.png", hex::encode(Sha256::digest(&tile)));
        let tile_locator = self.blobs.upload(&tile_path, &tile, PNG).await?;
        let tile_url = self.blobs.publish(&tile_locator).await?;

        let poster = self.publisher.publish_tile(&tile, square).await?;

        let submission = Submission {
            id: Uuid::new_v4(),
            invitation_id: invitation_id.to_string(),
            square,
            tile_path,
            tile_url: tile_url.clone(),
            poster_path: poster.path.clone(),
            created_at: Utc::now(),
        };
        self.records.append_submission(&submission).await?;
        tracing::info!(
            submission_id = %submission.id,
            %square,
            version = poster.version,
            "submission accepted"
        );

        Ok(SubmissionReceipt {
            invitation_id: invitation_id.to_string(),
            square,
            participant: invitation.participant().map(str::to_string),
            tile_url,
            poster_url: poster.url,
            preview_url: poster.preview_url,
            poster_version: poster.version,
        })
    }
}
