//! Square allocation.
//!
//! An invitation gets at most one square for its lifetime. Free squares are
//! drawn uniformly from the complement of the assigned set, and the write is
//! an atomic conditional claim so racing submissions cannot share a square.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::PosterError;
use crate::geometry::{Square, NUM_SQUARES};
use crate::store::RecordStore;
use crate::types::ClaimOutcome;

pub struct SquareAllocator {
    records: Arc<dyn RecordStore>,
}

impl SquareAllocator {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Return the invitation's square, assigning a free one on first use.
    #[tracing::instrument(skip(self))]
    pub async fn assign_or_get_square(&self, invitation_id: &str) -> Result<Square, PosterError> {
        let invitation = self
            .records
            .get_invitation(invitation_id)
            .await?
            .ok_or_else(|| PosterError::NotFound(format!("invitation {invitation_id}")))?;

        if let Some(square) = invitation.square {
            tracing::debug!(%square, "invitation already holds a square");
            return Ok(square);
        }

        // A lost claim means the assigned set grew, so this loop runs at most
        // once per square before either claiming or running out.
        for _ in 0..=NUM_SQUARES {
            let assigned = self.records.assigned_squares().await?;
            let candidate = pick_free_square(&assigned, &mut rand::thread_rng())
                .ok_or(PosterError::Exhausted)?;

            match self.records.claim_square(invitation_id, candidate).await? {
                ClaimOutcome::Claimed => {
                    tracing::info!(square = %candidate, taken = assigned.len() + 1, "square assigned");
                    return Ok(candidate);
                }
                ClaimOutcome::AlreadyAssigned(existing) => {
                    tracing::debug!(square = %existing, "concurrent call assigned first");
                    return Ok(existing);
                }
                ClaimOutcome::SquareTaken => {
                    tracing::debug!(square = %candidate, "square claimed concurrently, resampling");
                }
            }
        }

        Err(PosterError::StorageFailure(format!(
            "record store kept refusing claims for invitation {invitation_id}"
        )))
    }
}

/// Uniform pick from the squares not in `assigned`. `None` when the grid is full.
pub fn pick_free_square<R: Rng + ?Sized>(
    assigned: &BTreeSet<Square>,
    rng: &mut R,
) -> Option<Square> {
    let free: Vec<Square> = Square::all().filter(|s| !assigned.contains(s)).collect();
    free.choose(rng).copied()
}
