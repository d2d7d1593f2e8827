use thiserror::Error;

use crate::geometry::NUM_SQUARES;

/// Failure surfaced to the caller of a submission. Every variant is terminal
/// for that submission; nothing here is retried internally.
#[derive(Debug, Error)]
pub enum PosterError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("all {} squares are already assigned", NUM_SQUARES)]
    Exhausted,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("submissions are closed")]
    Closed,

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("poster pointer kept moving, gave up after {attempts} attempt(s)")]
    Conflict { attempts: u32 },
}

impl PosterError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Exhausted => 409,
            Self::InvalidImage(_) => 422,
            Self::InvalidGeometry(_) => 500,
            Self::Closed => 403,
            Self::StorageFailure(_) => 502,
            Self::Conflict { .. } => 409,
        }
    }
}

/// Error type for record and blob store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for PosterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PosterError::NotFound(what),
            other => PosterError::StorageFailure(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for PosterError {
    fn from(err: tokio::task::JoinError) -> Self {
        PosterError::StorageFailure(format!("image task aborted: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_per_variant() {
        assert_eq!(PosterError::NotFound("x".into()).http_status(), 404);
        assert_eq!(PosterError::Exhausted.http_status(), 409);
        assert_eq!(PosterError::InvalidImage("x".into()).http_status(), 422);
        assert_eq!(PosterError::InvalidGeometry("x".into()).http_status(), 500);
        assert_eq!(PosterError::Closed.http_status(), 403);
        assert_eq!(PosterError::StorageFailure("x".into()).http_status(), 502);
        assert_eq!(PosterError::Conflict { attempts: 5 }.http_status(), 409);
    }

    #[test]
    fn display_exhausted_names_grid_size() {
        assert_eq!(
            PosterError::Exhausted.to_string(),
            "all 72 squares are already assigned"
        );
    }

    #[test]
    fn store_not_found_stays_not_found() {
        let err: PosterError = StoreError::NotFound("posters/1.png".into()).into();
        assert!(matches!(err, PosterError::NotFound(ref p) if p == "posters/1.png"));
    }

    #[test]
    fn other_store_errors_become_storage_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PosterError = StoreError::Io(io).into();
        assert!(matches!(err, PosterError::StorageFailure(_)));
        assert_eq!(err.to_string(), "storage failure: IO error: denied");

        let err: PosterError = StoreError::InvalidPath("../etc".into()).into();
        assert!(matches!(err, PosterError::StorageFailure(_)));
    }
}
