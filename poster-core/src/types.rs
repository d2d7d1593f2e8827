use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::geometry::Square;

// ─── Invitation ───────────────────────────────────────────────

/// An externally issued invitation. Only `square` is ever written by this
/// crate, and only once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square: Option<Square>,
    /// Opaque fields carried through unchanged (participant name etc).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Invitation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            square: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn participant(&self) -> Option<&str> {
        self.fields.get("participant").and_then(Value::as_str)
    }
}

/// Result of an atomic square claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The square is now bound to the invitation.
    Claimed,
    /// The invitation already held a square; nothing was written.
    AlreadyAssigned(Square),
    /// Another invitation holds the requested square; nothing was written.
    SquareTaken,
}

// ─── Submission log ───────────────────────────────────────────

/// Append-only record of one accepted upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub invitation_id: String,
    pub square: Square,
    pub tile_path: String,
    pub tile_url: String,
    pub poster_path: String,
    pub created_at: DateTime<Utc>,
}

// ─── Poster configuration record ──────────────────────────────

/// Singleton configuration record. `poster_version` is bumped on every
/// pointer swing and doubles as the optimistic concurrency token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterConfig {
    pub submissions_are_open: bool,
    pub latest_poster_path: Option<String>,
    pub poster_version: u64,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            submissions_are_open: true,
            latest_poster_path: None,
            poster_version: 0,
        }
    }
}

/// Result of a compare-and-set on the poster pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSwing {
    Swung { version: u64 },
    Stale { current_version: u64 },
}
