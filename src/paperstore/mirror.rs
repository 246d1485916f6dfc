//! Best-effort replication of the primary store to a secondary root.
//!
//! The secondary root uses the primary layout and has its own [`IndexStore`],
//! so its index gets the same atomicity guarantees. Replication runs in the
//! background: the caller never waits for it, and a failure becomes a `warn!`
//! line. The mirror can lag or miss changes when the secondary stays broken;
//! nothing reconciles it later.
//!
//! Jobs go through one channel to one worker task and apply in the order they
//! were issued, so a delete can never be overtaken by the copy of the document
//! it deletes.
//!
//! [`Mirror::drain`] waits for every job queued before it. Short-lived
//! processes call it before exiting.

use crate::error::Result;
use crate::model::DocumentRecord;
use crate::store::atomic::{copy_atomic, write_atomic};
use crate::store::dirs::{DocumentDirs, METADATA_FILE};
use crate::store::index::IndexStore;
use crate::store::INDEX_FILE;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

enum Job {
    Store {
        record: DocumentRecord,
        files: Vec<PathBuf>,
    },
    CopyFiles {
        id: Uuid,
        files: Vec<PathBuf>,
    },
    Remove(Uuid),
    Flush(oneshot::Sender<()>),
}

pub struct Mirror {
    root: PathBuf,
    jobs: mpsc::UnboundedSender<Job>,
}

struct Replica {
    root: PathBuf,
    dirs: DocumentDirs,
    index: IndexStore,
}

impl Mirror {
    /// Prepares `secondary` as a mirror of `primary` and starts its worker.
    ///
    /// Returns `None`, with a log line, when the two resolve to the same
    /// directory or the secondary cannot be set up.
    pub async fn open(primary: &Path, secondary: &Path) -> Option<Self> {
        match Replica::open(primary, secondary).await {
            Ok(Some(replica)) => {
                info!(root = %replica.root.display(), "mirroring enabled");
                let root = replica.root.clone();
                let (jobs, queue) = mpsc::unbounded_channel();
                tokio::spawn(replica.run(queue));
                Some(Self { root, jobs })
            }
            Ok(None) => {
                debug!("mirror root is the primary root, mirroring disabled");
                None
            }
            Err(e) => {
                warn!(root = %secondary.display(), error = %e, "mirror unavailable");
                None
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `files` into the secondary document directory and upserts the
    /// record into the secondary index.
    pub fn mirror(&self, record: DocumentRecord, files: Vec<PathBuf>) {
        self.submit(Job::Store { record, files });
    }

    /// Copies `files` without touching the secondary index.
    pub fn mirror_files(&self, id: Uuid, files: Vec<PathBuf>) {
        self.submit(Job::CopyFiles { id, files });
    }

    /// Removes the secondary copy of a document.
    pub fn unmirror(&self, id: Uuid) {
        self.submit(Job::Remove(id));
    }

    /// Waits until every job submitted before this call has been applied.
    pub async fn drain(&self) {
        let (done, flushed) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_err() {
            return;
        }
        if flushed.await.is_err() {
            warn!("mirror worker stopped before flushing");
        }
    }

    fn submit(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            warn!("mirror worker is gone, dropping replication job");
        }
    }
}

impl Replica {
    /// Applies jobs one at a time until every [`Mirror`] handle is dropped.
    async fn run(self, mut queue: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = queue.recv().await {
            match job {
                Job::Store { record, files } => {
                    let id = record.id;
                    if let Err(e) = self.store(record, &files).await {
                        warn!(%id, error = %e, "mirror failed");
                    }
                }
                Job::CopyFiles { id, files } => {
                    if let Err(e) = self.copy_files(&id, &files).await {
                        warn!(%id, error = %e, "mirror file copy failed");
                    }
                }
                Job::Remove(id) => {
                    if let Err(e) = self.remove(&id).await {
                        warn!(%id, error = %e, "unmirror failed");
                    }
                }
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!(root = %self.root.display(), "mirror worker stopped");
    }

    async fn open(primary: &Path, secondary: &Path) -> Result<Option<Self>> {
        tokio::fs::create_dir_all(secondary).await?;
        let primary = tokio::fs::canonicalize(primary).await?;
        let root = tokio::fs::canonicalize(secondary).await?;
        if primary == root {
            return Ok(None);
        }
        let dirs = DocumentDirs::open(&root)?;
        let index = IndexStore::new(root.join(INDEX_FILE));
        index.init().await?;
        Ok(Some(Self { root, dirs, index }))
    }

    async fn store(&self, record: DocumentRecord, files: &[PathBuf]) -> Result<()> {
        let dir = self.copy_files(&record.id, files).await?;
        write_atomic(&dir.join(METADATA_FILE), &serde_json::to_vec_pretty(&record)?).await?;
        let id = record.id;
        self.index.mutate(move |index| index.prepend(record)).await?;
        debug!(%id, "mirrored document");
        Ok(())
    }

    async fn copy_files(&self, id: &Uuid, files: &[PathBuf]) -> Result<PathBuf> {
        let dir = self.dirs.resolve_id(id)?;
        tokio::fs::create_dir_all(&dir).await?;
        for file in files {
            if let Some(name) = file.file_name() {
                copy_atomic(file, &dir.join(name)).await?;
            }
        }
        Ok(dir)
    }

    async fn remove(&self, id: &Uuid) -> Result<()> {
        self.dirs.remove(id).await?;
        self.index.mutate(|index| index.without(id)).await?;
        debug!(%id, "removed mirrored document");
        Ok(())
    }
}
