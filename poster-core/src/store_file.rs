//! JSON-file backed `RecordStore`.
//!
//! Keeps the working set in a `MemoryRecordStore` and rewrites the whole
//! snapshot after every state change. A write whose snapshot cannot be
//! persisted is undone in memory too, so the file and the working set never
//! disagree. Sized for one poster's worth of invitations, not for general use.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::geometry::Square;
use crate::store::RecordStore;
use crate::store_memory::{MemoryRecordStore, RecordSnapshot};
use crate::types::*;

pub struct FileRecordStore {
    path: PathBuf,
    memory: MemoryRecordStore,
    /// Held across mutate + persist so the file never lags a later write.
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Load `path` if it exists, otherwise start empty with `initial` config
    /// and write the first snapshot.
    pub async fn open(path: impl Into<PathBuf>, initial: PosterConfig) -> Result<Self, StoreError> {
        let path = path.into();
        let memory = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: RecordSnapshot = serde_json::from_slice(&bytes)?;
                tracing::info!(
                    path = %path.display(),
                    invitations = snapshot.invitations.len(),
                    version = snapshot.config.poster_version,
                    "loaded record snapshot"
                );
                MemoryRecordStore::from_snapshot(snapshot)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                MemoryRecordStore::with_config(initial)
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            path,
            memory,
            write_lock: Mutex::new(()),
        };
        store.persist().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist after a mutation. On failure the working set is put back to
    /// `before` and the persist error is returned.
    async fn persist_or_rollback(&self, before: RecordSnapshot) -> Result<(), StoreError> {
        match self.persist().await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    "persist failed, rolling back"
                );
                self.memory.restore(before).await?;
                Err(err)
            }
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.memory.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("partial");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get_invitation(&self, id: &str) -> Result<Option<Invitation>, StoreError> {
        self.memory.get_invitation(id).await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        let _writer = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let inserted = self.memory.insert_invitation(invitation).await?;
        if inserted {
            self.persist_or_rollback(before).await?;
        }
        Ok(inserted)
    }

    async fn assigned_squares(&self) -> Result<BTreeSet<Square>, StoreError> {
        self.memory.assigned_squares().await
    }

    async fn claim_square(
        &self,
        invitation_id: &str,
        square: Square,
    ) -> Result<ClaimOutcome, StoreError> {
        let _writer = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let outcome = self.memory.claim_square(invitation_id, square).await?;
        if outcome == ClaimOutcome::Claimed {
            self.persist_or_rollback(before).await?;
        }
        Ok(outcome)
    }

    async fn append_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let _writer = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        self.memory.append_submission(submission).await?;
        self.persist_or_rollback(before).await
    }

    async fn list_submissions(&self, invitation_id: &str) -> Result<Vec<Submission>, StoreError> {
        self.memory.list_submissions(invitation_id).await
    }

    async fn load_config(&self) -> Result<PosterConfig, StoreError> {
        self.memory.load_config().await
    }

    async fn set_submissions_open(&self, open: bool) -> Result<(), StoreError> {
        let _writer = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        self.memory.set_submissions_open(open).await?;
        self.persist_or_rollback(before).await
    }

    async fn compare_and_set_poster(
        &self,
        expected_version: u64,
        poster_path: &str,
    ) -> Result<PointerSwing, StoreError> {
        let _writer = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let swing = self
            .memory
            .compare_and_set_poster(expected_version, poster_path)
            .await?;
        if matches!(swing, PointerSwing::Swung { .. }) {
            self.persist_or_rollback(before).await?;
        }
        Ok(swing)
    }
}
