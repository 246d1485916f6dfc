use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PaperError {
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Document not found: {0}")]
    NotFound(Uuid),

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("Index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl PaperError {
    /// Whether a caller should present this error as "not found".
    ///
    /// Malformed ids are indistinguishable from unknown ones to the outside world.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PaperError::NotFound(_) | PaperError::InvalidPath(_))
    }
}

pub type Result<T> = std::result::Result<T, PaperError>;

/// Failures of a single renderer invocation.
///
/// These never leave the cover pipeline: the coordinator turns them into a
/// [`crate::cover::CoverOutcome::Failed`] and a backoff entry.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to spawn renderer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("renderer exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },

    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("renderer reported success but produced no output")]
    MissingOutput,

    #[error("renderer produced a placeholder image")]
    Placeholder,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
