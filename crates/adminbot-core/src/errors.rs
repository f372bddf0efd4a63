use std::path::PathBuf;

/// Core error type for the admin bot.
///
/// Adapter crates map their specific errors into this type so command handlers
/// can turn failures into a user reply plus a log entry at one boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("permission denied for chat {0}")]
    Unauthorized(i64),

    #[error("restart record {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sync command failed: {0}")]
    ExternalOperation(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
