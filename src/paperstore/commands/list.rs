use crate::commands::CmdResult;
use crate::error::Result;
use crate::store::PaperStore;

/// All documents, newest first.
pub async fn run(store: &PaperStore) -> Result<CmdResult> {
    let index = store.index().read().await;
    Ok(CmdResult::default().with_documents(index.into_records()))
}
