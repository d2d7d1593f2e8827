use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::geometry::Square;
use crate::types::*;

/// Persistence trait for invitation, submission and configuration records.
///
/// The allocator, publisher and submission service operate exclusively
/// through this trait. Implementations must make `claim_square` and
/// `compare_and_set_poster` atomic: both are the only places where racing
/// submissions are arbitrated.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ── Invitations ──

    async fn get_invitation(&self, id: &str) -> Result<Option<Invitation>, StoreError>;

    /// Insert an invitation if its id is unknown. Returns `false` and leaves
    /// the stored record untouched when it already exists.
    async fn insert_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError>;

    /// Every square currently bound to some invitation.
    async fn assigned_squares(&self) -> Result<BTreeSet<Square>, StoreError>;

    /// Bind `square` to the invitation only if the invitation has no square
    /// yet and no other invitation holds `square`. A missing invitation is
    /// `StoreError::NotFound`.
    async fn claim_square(
        &self,
        invitation_id: &str,
        square: Square,
    ) -> Result<ClaimOutcome, StoreError>;

    // ── Submission log (append-only) ──

    async fn append_submission(&self, submission: &Submission) -> Result<(), StoreError>;
    async fn list_submissions(&self, invitation_id: &str) -> Result<Vec<Submission>, StoreError>;

    // ── Configuration record ──

    async fn load_config(&self) -> Result<PosterConfig, StoreError>;
    async fn set_submissions_open(&self, open: bool) -> Result<(), StoreError>;

    /// Point the configuration at `poster_path` if the stored version still
    /// equals `expected_version`, bumping the version on success.
    async fn compare_and_set_poster(
        &self,
        expected_version: u64,
        poster_path: &str,
    ) -> Result<PointerSwing, StoreError>;
}
