//! In-memory `RecordStore`.
//!
//! Each conditional write runs under a single write guard, which gives the
//! per-record atomicity the trait requires.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::geometry::Square;
use crate::store::RecordStore;
use crate::types::*;

#[derive(Default)]
struct Inner {
    invitations: HashMap<String, Invitation>,
    /// square -> invitation id, kept in step with `Invitation::square`.
    claimed: HashMap<Square, String>,
    submissions: Vec<Submission>,
    config: PosterConfig,
}

impl Inner {
    fn from_snapshot(snapshot: RecordSnapshot) -> Result<Self, StoreError> {
        let mut inner = Inner {
            config: snapshot.config,
            submissions: snapshot.submissions,
            ..Inner::default()
        };
        for invitation in snapshot.invitations {
            if let Some(square) = invitation.square {
                if let Some(holder) = inner.claimed.insert(square, invitation.id.clone()) {
                    return Err(StoreError::Storage(format!(
                        "square {square} held by both {holder} and {}",
                        invitation.id
                    )));
                }
            }
            inner.invitations.insert(invitation.id.clone(), invitation);
        }
        Ok(inner)
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

/// Serializable copy of the whole store, used by `FileRecordStore`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub config: PosterConfig,
    pub invitations: Vec<Invitation>,
    pub submissions: Vec<Submission>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PosterConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                config,
                ..Inner::default()
            }),
        }
    }

    /// Rebuild a store from a snapshot. Two invitations holding the same
    /// square is a corrupt snapshot.
    pub fn from_snapshot(snapshot: RecordSnapshot) -> Result<Self, StoreError> {
        Ok(Self {
            inner: RwLock::new(Inner::from_snapshot(snapshot)?),
        })
    }

    /// Replace the whole store with `snapshot`.
    pub async fn restore(&self, snapshot: RecordSnapshot) -> Result<(), StoreError> {
        let inner = Inner::from_snapshot(snapshot)?;
        *self.inner.write().await = inner;
        Ok(())
    }

    pub async fn snapshot(&self) -> RecordSnapshot {
        let inner = self.inner.read().await;
        let mut invitations: Vec<Invitation> = inner.invitations.values().cloned().collect();
        invitations.sort_by(|a, b| a.id.cmp(&b.id));
        RecordSnapshot {
            config: inner.config.clone(),
            invitations,
            submissions: inner.submissions.clone(),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_invitation(&self, id: &str) -> Result<Option<Invitation>, StoreError> {
        Ok(self.inner.read().await.invitations.get(id).cloned())
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.invitations.contains_key(&invitation.id) {
            return Ok(false);
        }
        if let Some(square) = invitation.square {
            if let Some(holder) = inner.claimed.get(&square) {
                return Err(StoreError::Storage(format!(
                    "square {square} already held by invitation {holder}"
                )));
            }
            inner.claimed.insert(square, invitation.id.clone());
        }
        inner
            .invitations
            .insert(invitation.id.clone(), invitation.clone());
        Ok(true)
    }

    async fn assigned_squares(&self) -> Result<BTreeSet<Square>, StoreError> {
        Ok(self.inner.read().await.claimed.keys().copied().collect())
    }

    async fn claim_square(
        &self,
        invitation_id: &str,
        square: Square,
    ) -> Result<ClaimOutcome, StoreError> {
        let mut guard = self.inner.write().await;
        let Inner {
            invitations,
            claimed,
            ..
        } = &mut *guard;

        let invitation = invitations
            .get_mut(invitation_id)
            .ok_or_else(|| StoreError::NotFound(format!("invitation {invitation_id}")))?;

        if let Some(existing) = invitation.square {
            return Ok(ClaimOutcome::AlreadyAssigned(existing));
        }
        if claimed.contains_key(&square) {
            return Ok(ClaimOutcome::SquareTaken);
        }

        invitation.square = Some(square);
        claimed.insert(square, invitation_id.to_string());
        Ok(ClaimOutcome::Claimed)
    }

    async fn append_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.submissions.iter().any(|s| s.id == submission.id) {
            return Err(StoreError::Storage(format!(
                "submission {} already recorded",
                submission.id
            )));
        }
        inner.submissions.push(submission.clone());
        Ok(())
    }

    async fn list_submissions(&self, invitation_id: &str) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .submissions
            .iter()
            .filter(|s| s.invitation_id == invitation_id)
            .cloned()
            .collect())
    }

    async fn load_config(&self) -> Result<PosterConfig, StoreError> {
        Ok(self.inner.read().await.config.clone())
    }

    async fn set_submissions_open(&self, open: bool) -> Result<(), StoreError> {
        self.inner.write().await.config.submissions_are_open = open;
        Ok(())
    }

    async fn compare_and_set_poster(
        &self,
        expected_version: u64,
        poster_path: &str,
    ) -> Result<PointerSwing, StoreError> {
        let mut inner = self.inner.write().await;
        let config = &mut inner.config;
        if config.poster_version != expected_version {
            return Ok(PointerSwing::Stale {
                current_version: config.poster_version,
            });
        }
        config.poster_version += 1;
        config.latest_poster_path = Some(poster_path.to_string());
        Ok(PointerSwing::Swung {
            version: config.poster_version,
        })
    }
}
