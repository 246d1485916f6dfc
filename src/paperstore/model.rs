use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::tags::parse_tags;

/// The only content type the store accepts.
pub const PDF_MIME: &str = "application/pdf";
/// The only cover type the store accepts.
pub const PNG_MIME: &str = "image/png";

const FALLBACK_FILENAME: &str = "document.pdf";
const MAX_FILENAME_LEN: usize = 120;

/// One entry of the index, and the body of each `metadata.json` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub tags: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl DocumentRecord {
    /// Builds a fresh record from raw upload fields, applying the title,
    /// filename and tag normalization rules.
    pub fn new(title: &str, original_filename: &str, tags: &str, size_bytes: u64) -> Self {
        let original_filename = sanitize_filename(original_filename);
        let title = match title.trim() {
            "" => file_stem(&original_filename).to_string(),
            t => t.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            title,
            original_filename,
            tags: parse_tags(tags),
            uploaded_at: Utc::now(),
            size_bytes,
        }
    }
}

/// A validated upload handed over by the transport layer.
///
/// `content` and `cover` point at temporary files the caller owns; the store
/// copies them and never moves or deletes the originals.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub content: PathBuf,
    pub content_type: String,
    pub original_filename: String,
    pub title: String,
    /// Comma-separated, as submitted.
    pub tags: String,
    pub cover: Option<UploadedCover>,
}

#[derive(Debug, Clone)]
pub struct UploadedCover {
    pub path: PathBuf,
    pub content_type: String,
}

impl NewDocument {
    pub fn pdf(content: impl Into<PathBuf>, original_filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: PDF_MIME.to_string(),
            original_filename: original_filename.into(),
            title: String::new(),
            tags: String::new(),
            cover: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_cover(mut self, path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        self.cover = Some(UploadedCover {
            path: path.into(),
            content_type: content_type.into(),
        });
        self
    }
}

/// Reduces a client-supplied filename to a safe, bounded form.
pub fn sanitize_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_FILENAME_LEN)
        .collect();
    if safe.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        safe
    }
}

/// Name used when serving a document whose index entry is gone.
pub fn fallback_filename() -> &'static str {
    FALLBACK_FILENAME
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(pos) => &name[..pos],
    }
}
