use crate::commands::{CmdMessage, CmdResult};
use crate::error::{PaperError, Result};
use crate::model::{DocumentRecord, NewDocument, PDF_MIME, PNG_MIME};
use crate::store::atomic::{copy_atomic, write_atomic};
use crate::store::dirs::DocumentDirs;
use crate::store::PaperStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// Stores an upload as a new document.
///
/// The directory is fully populated before the record enters the index. Any
/// failure on the way removes the directory again, so a failed create leaves
/// neither files nor an index entry behind.
pub async fn run(store: &PaperStore, upload: NewDocument, max_bytes: u64) -> Result<CmdResult> {
    if upload.content_type != PDF_MIME {
        return Err(PaperError::UnsupportedMedia(format!(
            "content must be {}, got {}",
            PDF_MIME, upload.content_type
        )));
    }
    if let Some(cover) = &upload.cover {
        if cover.content_type != PNG_MIME {
            return Err(PaperError::UnsupportedMedia(format!(
                "cover must be {}, got {}",
                PNG_MIME, cover.content_type
            )));
        }
    }
    let size = tokio::fs::metadata(&upload.content).await?.len();
    check_size(size, max_bytes)?;

    let mut record =
        DocumentRecord::new(&upload.title, &upload.original_filename, &upload.tags, size);
    let dirs = store.dirs();
    dirs.create(&record.id).await?;

    let files = match populate(dirs, &upload, &mut record, max_bytes).await {
        Ok(files) => files,
        Err(e) => {
            discard(dirs, &record).await;
            return Err(e);
        }
    };

    let inserted = record.clone();
    if let Err(e) = store
        .index()
        .mutate(move |index| index.prepend(inserted))
        .await
    {
        discard(dirs, &record).await;
        return Err(e);
    }

    info!(id = %record.id, title = %record.title, size = record.size_bytes, "document stored");
    if let Some(mirror) = store.mirror() {
        mirror.mirror(record.clone(), files);
    }

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Document stored: {} ({})",
        record.title, record.id
    )));
    Ok(result.with_documents(vec![record]))
}

fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(PaperError::TooLarge { size, limit });
    }
    Ok(())
}

/// Copies the upload into the document directory and writes the snapshot.
/// Returns the copied files.
async fn populate(
    dirs: &DocumentDirs,
    upload: &NewDocument,
    record: &mut DocumentRecord,
    max_bytes: u64,
) -> Result<Vec<PathBuf>> {
    let content = dirs.content_path(&record.id)?;
    let copied = copy_atomic(&upload.content, &content).await?;
    // The upload may have changed between the size check and the copy.
    check_size(copied, max_bytes)?;
    record.size_bytes = copied;

    let mut files = vec![content];
    if let Some(cover) = &upload.cover {
        let dest = dirs.cover_path(&record.id)?;
        copy_atomic(&cover.path, &dest).await?;
        files.push(dest);
    }

    let snapshot = serde_json::to_vec_pretty(&*record)?;
    write_atomic(&dirs.metadata_path(&record.id)?, &snapshot).await?;
    Ok(files)
}

async fn discard(dirs: &DocumentDirs, record: &DocumentRecord) {
    if let Err(e) = dirs.remove(&record.id).await {
        warn!(id = %record.id, error = %e, "could not clean up failed upload");
    }
}
