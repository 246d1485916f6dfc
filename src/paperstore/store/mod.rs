//! # Storage Layer
//!
//! Everything that touches the primary store root lives here:
//!
//! - [`atomic`]: temp-file + rename writes used for every file the store owns
//! - [`index::IndexStore`]: the serialized `index.json`
//! - [`dirs::DocumentDirs`]: per-document directories and path validation
//!
//! ## Storage Format
//!
//! ```text
//! <root>/
//! ├── index.json              # All DocumentRecords, newest first
//! ├── config.json             # StoreConfig (optional)
//! └── papers/
//!     └── {uuid}/
//!         ├── content.pdf     # Uploaded document
//!         ├── cover.png       # Uploaded or rendered preview (optional)
//!         └── metadata.json   # Snapshot of the index record, for recovery
//! ```
//!
//! A document directory is populated completely before its record enters the
//! index, so the index never points at a half-written directory.

use crate::error::Result;
use crate::mirror::Mirror;
use std::path::{Path, PathBuf};

pub mod atomic;
pub mod dirs;
pub mod index;

use dirs::DocumentDirs;
use index::IndexStore;

pub const INDEX_FILE: &str = "index.json";

/// The primary store: index, directories and the optional mirror.
pub struct PaperStore {
    root: PathBuf,
    dirs: DocumentDirs,
    index: IndexStore,
    mirror: Option<Mirror>,
}

impl PaperStore {
    /// Opens the store at `root`, creating the layout on first run.
    pub async fn open(root: impl Into<PathBuf>, mirror_root: Option<&Path>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        let dirs = DocumentDirs::open(&root)?;
        let index = IndexStore::new(root.join(INDEX_FILE));
        index.init().await?;
        let mirror = match mirror_root {
            Some(secondary) => Mirror::open(&root, secondary).await,
            None => None,
        };
        Ok(Self {
            root,
            dirs,
            index,
            mirror,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dirs(&self) -> &DocumentDirs {
        &self.dirs
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    pub fn mirror(&self) -> Option<&Mirror> {
        self.mirror.as_ref()
    }
}
