use crate::commands::CmdResult;
use crate::error::{PaperError, Result};
use crate::model::{fallback_filename, PDF_MIME};
use crate::store::dirs::parse_id;
use crate::store::PaperStore;
use std::path::PathBuf;

/// Where a document's content lives and how to name it for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: &'static str,
}

pub async fn run(store: &PaperStore, id: &str) -> Result<CmdResult> {
    let id = parse_id(id)?;
    let path = store.dirs().content_path(&id)?;
    if !path.is_file() {
        return Err(PaperError::NotFound(id));
    }
    let filename = store
        .index()
        .read()
        .await
        .get(&id)
        .map(|record| record.original_filename.clone())
        .unwrap_or_else(|| fallback_filename().to_string());
    Ok(CmdResult::default().with_file(DocumentFile {
        path,
        filename,
        content_type: PDF_MIME,
    }))
}
