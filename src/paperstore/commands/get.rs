use crate::commands::CmdResult;
use crate::error::{PaperError, Result};
use crate::model::DocumentRecord;
use crate::store::dirs::parse_id;
use crate::store::PaperStore;

/// Reads a document's metadata snapshot.
pub async fn run(store: &PaperStore, id: &str) -> Result<CmdResult> {
    let id = parse_id(id)?;
    let path = store.dirs().metadata_path(&id)?;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PaperError::NotFound(id))
        }
        Err(e) => return Err(e.into()),
    };
    let record: DocumentRecord = serde_json::from_slice(&bytes)?;
    Ok(CmdResult::default().with_documents(vec![record]))
}
