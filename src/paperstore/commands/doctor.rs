//! Reconciles the index with what is on disk.
//!
//! Each document directory carries a `metadata.json` snapshot of its record,
//! which makes the index rebuildable:
//! - index entries whose content file is gone are dropped
//! - directories with content and a valid snapshot but no index entry are re-added
//!
//! The rebuilt index is ordered newest first by upload time.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::DocumentRecord;
use crate::store::index::Index;
use crate::store::PaperStore;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    /// Entries restored from snapshots.
    pub recovered: usize,
    /// Entries pointing at missing content.
    pub dropped: usize,
    /// Directories with content but no usable snapshot.
    pub unreadable: usize,
    pub total: usize,
}

pub async fn run(store: &PaperStore) -> Result<CmdResult> {
    let dirs = store.dirs();
    let mut on_disk: HashSet<Uuid> = HashSet::new();
    let mut snapshots = Vec::new();
    let mut report = DoctorReport::default();

    for id in dirs.list_ids()? {
        if !dirs.content_path(&id)?.is_file() {
            continue;
        }
        on_disk.insert(id);
        match read_snapshot(store, &id).await {
            Some(record) => snapshots.push(record),
            None => report.unreadable += 1,
        }
    }

    let index = store
        .index()
        .mutate(|index| {
            let before = index.len();
            let mut records: Vec<DocumentRecord> = index
                .into_iter()
                .filter(|r| on_disk.contains(&r.id))
                .collect();
            report.dropped = before - records.len();
            for snapshot in snapshots {
                if !records.iter().any(|r| r.id == snapshot.id) {
                    records.push(snapshot);
                    report.recovered += 1;
                }
            }
            records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
            Index::from_records(records)
        })
        .await?;
    report.total = index.len();

    info!(
        recovered = report.recovered,
        dropped = report.dropped,
        unreadable = report.unreadable,
        total = report.total,
        "index reconciled"
    );

    let mut result = CmdResult::default();
    if report.recovered == 0 && report.dropped == 0 {
        result.add_message(CmdMessage::success("Index is consistent"));
    } else {
        result.add_message(CmdMessage::success(format!(
            "Recovered {} and dropped {} index entries",
            report.recovered, report.dropped
        )));
    }
    if report.unreadable > 0 {
        result.add_message(CmdMessage::warning(format!(
            "{} document directories have no readable metadata",
            report.unreadable
        )));
    }
    Ok(result.with_report(report))
}

async fn read_snapshot(store: &PaperStore, id: &Uuid) -> Option<DocumentRecord> {
    let path = store.dirs().metadata_path(id).ok()?;
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice::<DocumentRecord>(&bytes) {
        Ok(record) if record.id == *id => Some(record),
        Ok(record) => {
            warn!(%id, snapshot_id = %record.id, "snapshot id does not match its directory");
            None
        }
        Err(e) => {
            warn!(%id, error = %e, "unreadable metadata snapshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create;
    use crate::model::NewDocument;
    use crate::test_utils::TestEnv;

    async fn add(env: &TestEnv, name: &str) -> DocumentRecord {
        let pdf = env.upload(name, b"%PDF");
        create::run(&env.store, NewDocument::pdf(&pdf, name), 1024)
            .await
            .unwrap()
            .documents
            .remove(0)
    }

    #[tokio::test]
    async fn consistent_store_is_untouched() {
        let env = TestEnv::new().await;
        add(&env, "a.pdf").await;
        let before = env.store.index().read().await;

        let report = run(&env.store).await.unwrap().report.unwrap();

        assert_eq!(report.recovered, 0);
        assert_eq!(report.dropped, 0);
        assert_eq!(env.store.index().read().await, before);
    }

    #[tokio::test]
    async fn rebuilds_lost_index_newest_first() {
        let env = TestEnv::new().await;
        let older = add(&env, "older.pdf").await;
        let newer = add(&env, "newer.pdf").await;
        std::fs::remove_file(env.store.index().path()).unwrap();

        let report = run(&env.store).await.unwrap().report.unwrap();

        assert_eq!(report.recovered, 2);
        let ids: Vec<_> = env.store.index().read().await.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn drops_entries_without_content() {
        let env = TestEnv::new().await;
        let gone = add(&env, "gone.pdf").await;
        let kept = add(&env, "kept.pdf").await;
        std::fs::remove_dir_all(env.store.dirs().resolve_id(&gone.id).unwrap()).unwrap();

        let report = run(&env.store).await.unwrap().report.unwrap();

        assert_eq!(report.dropped, 1);
        assert_eq!(report.total, 1);
        assert!(env.store.index().read().await.contains(&kept.id));
    }

    #[tokio::test]
    async fn counts_unreadable_snapshots() {
        let env = TestEnv::new().await;
        let doc = add(&env, "doc.pdf").await;
        let meta = env.store.dirs().metadata_path(&doc.id).unwrap();
        std::fs::write(&meta, "{").unwrap();
        std::fs::remove_file(env.store.index().path()).unwrap();

        let result = run(&env.store).await.unwrap();
        let report = result.report.unwrap();

        assert_eq!(report.unreadable, 1);
        assert_eq!(report.total, 0);
        assert_eq!(result.messages.len(), 2);
    }
}
