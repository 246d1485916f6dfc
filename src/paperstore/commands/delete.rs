use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::dirs::parse_id;
use crate::store::PaperStore;
use tracing::info;

/// Deletes a document.
///
/// The index entry goes first, then the directory, so the index never points
/// at a directory that is being torn down. Deleting an unknown id succeeds.
pub async fn run(store: &PaperStore, id: &str) -> Result<CmdResult> {
    let id = parse_id(id)?;
    store.dirs().resolve_id(&id)?;

    let mut removed = None;
    store
        .index()
        .mutate(|index| {
            removed = index.get(&id).cloned();
            index.without(&id)
        })
        .await?;
    store.dirs().remove(&id).await?;
    if let Some(mirror) = store.mirror() {
        mirror.unmirror(id);
    }

    let mut result = CmdResult::default();
    match removed {
        Some(record) => {
            info!(%id, "document deleted");
            result.add_message(CmdMessage::success(format!(
                "Document deleted: {}",
                record.title
            )));
            result.documents.push(record);
        }
        None => {
            result.add_message(CmdMessage::warning(format!("No document with id {}", id)));
        }
    }
    Ok(result)
}
