//! Server settings, loaded once at startup from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use poster_core::compositor::DEFAULT_PREVIEW_WIDTH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterSettings {
    pub bind_addr: String,
    pub blob_root: PathBuf,
    pub public_base_url: String,
    pub starter_path: String,
    pub preview_width: u32,
    /// YAML list of invitations inserted at startup (existing ids are kept).
    pub invitations_file: Option<PathBuf>,
    /// JSON snapshot of the record store. Unset means in-memory only.
    pub state_file: Option<PathBuf>,
    /// Overrides the stored open/closed flag at startup when set.
    pub submissions_open: Option<bool>,
    pub max_upload_bytes: usize,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".into(),
            blob_root: PathBuf::from("./data/blobs"),
            public_base_url: "http://localhost:5000/blobs".into(),
            starter_path: "starter/poster.png".into(),
            preview_width: DEFAULT_PREVIEW_WIDTH,
            invitations_file: None,
            state_file: None,
            submissions_open: None,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl PosterSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("POSTER_BIND_ADDR", defaults.bind_addr),
            blob_root: env_path("POSTER_BLOB_ROOT").unwrap_or(defaults.blob_root),
            public_base_url: env_string("POSTER_PUBLIC_BASE_URL", defaults.public_base_url),
            starter_path: env_string("POSTER_STARTER_PATH", defaults.starter_path),
            preview_width: env_parse("POSTER_PREVIEW_WIDTH", defaults.preview_width),
            invitations_file: env_path("POSTER_INVITATIONS_FILE"),
            state_file: env_path("POSTER_STATE_FILE"),
            submissions_open: env_bool("POSTER_SUBMISSIONS_OPEN"),
            max_upload_bytes: env_parse("POSTER_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}
