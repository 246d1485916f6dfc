//! The document index: one JSON array of [`DocumentRecord`], newest first.
//!
//! [`IndexStore::mutate`] is the only write path. Mutations queue on an async
//! mutex that hands the lock out in FIFO order, so each one reads the state
//! left by every mutation queued before it and no read-modify-write cycle runs
//! against a stale base. Readers never take the lock; the atomic writer
//! guarantees they see a complete file.
//!
//! This only orders writers inside one process. Two processes pointing at the
//! same root can still race.

use crate::error::{PaperError, Result};
use crate::model::DocumentRecord;
use crate::store::atomic::write_atomic;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ordered, id-unique list of records. Position 0 is the newest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Index(Vec<DocumentRecord>);

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let records = Vec::<DocumentRecord>::deserialize(deserializer)?;
        Ok(Index::from_records(records))
    }
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index, dropping later duplicates of an id.
    pub fn from_records(records: Vec<DocumentRecord>) -> Self {
        let mut index = Index(Vec::with_capacity(records.len()));
        for record in records {
            if index.get(&record.id).is_none() {
                index.0.push(record);
            }
        }
        index
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| PaperError::IndexCorrupt(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Puts `record` at the front, replacing any record with the same id.
    pub fn prepend(mut self, record: DocumentRecord) -> Self {
        self.0.retain(|r| r.id != record.id);
        self.0.insert(0, record);
        self
    }

    pub fn without(mut self, id: &Uuid) -> Self {
        self.0.retain(|r| &r.id != id);
        self
    }

    pub fn get(&self, id: &Uuid) -> Option<&DocumentRecord> {
        self.0.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.0
    }

    pub fn into_records(self) -> Vec<DocumentRecord> {
        self.0
    }
}

impl IntoIterator for Index {
    type Item = DocumentRecord;
    type IntoIter = std::vec::IntoIter<DocumentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Owner of one index file.
pub struct IndexStore {
    path: PathBuf,
    queue: Mutex<()>,
}

enum Loaded {
    Missing,
    Valid(Index),
    Corrupt(String),
    Unreadable(std::io::Error),
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queue: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty index file if none exists yet.
    pub async fn init(&self) -> Result<()> {
        let _turn = self.queue.lock().await;
        if !self.path.exists() {
            write_atomic(&self.path, &Index::new().to_json()?).await?;
            debug!(path = %self.path.display(), "initialized empty index");
        }
        Ok(())
    }

    /// Current index. Missing or unreadable files read as empty.
    pub async fn read(&self) -> Index {
        match self.load().await {
            Loaded::Missing => Index::new(),
            Loaded::Valid(index) => index,
            Loaded::Corrupt(reason) => {
                warn!(path = %self.path.display(), %reason, "index corrupt, treating as empty");
                Index::new()
            }
            Loaded::Unreadable(e) => {
                warn!(path = %self.path.display(), error = %e, "index unreadable, treating as empty");
                Index::new()
            }
        }
    }

    /// Applies `f` to the current index and persists the result.
    ///
    /// Returns the index as written. A file that exists but cannot be read
    /// fails the mutation and is left untouched.
    pub async fn mutate<F>(&self, f: F) -> Result<Index>
    where
        F: FnOnce(Index) -> Index,
    {
        let _turn = self.queue.lock().await;
        let current = match self.load().await {
            Loaded::Missing => Index::new(),
            Loaded::Valid(index) => index,
            Loaded::Corrupt(reason) => {
                let kept = self.preserve_corrupt().await;
                warn!(
                    path = %self.path.display(),
                    %reason,
                    preserved = ?kept,
                    "index unreadable, rebuilding from empty"
                );
                Index::new()
            }
            Loaded::Unreadable(e) => return Err(PaperError::Io(e)),
        };
        let next = f(current);
        write_atomic(&self.path, &next.to_json()?).await?;
        Ok(next)
    }

    async fn load(&self) -> Loaded {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match Index::from_json(&bytes) {
                Ok(index) => Loaded::Valid(index),
                Err(e) => Loaded::Corrupt(e.to_string()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Loaded::Missing,
            Err(e) => Loaded::Unreadable(e),
        }
    }

    /// Copies an unreadable index aside so the next write does not destroy it.
    async fn preserve_corrupt(&self) -> Option<PathBuf> {
        let name = self.path.file_name()?.to_string_lossy().into_owned();
        let aside = self.path.with_file_name(format!(
            "{}.corrupt-{}",
            name,
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        match tokio::fs::copy(&self.path, &aside).await {
            Ok(_) => Some(aside),
            Err(e) => {
                warn!(error = %e, "could not preserve corrupt index");
                None
            }
        }
    }
}
