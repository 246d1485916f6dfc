use crate::error::{PaperError, Result};
use std::io;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

pub const PAPERS_DIR: &str = "papers";
pub const CONTENT_FILE: &str = "content.pdf";
pub const COVER_FILE: &str = "cover.png";
pub const METADATA_FILE: &str = "metadata.json";

/// Length of the canonical hyphenated UUID form.
const ID_LEN: usize = 36;
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Owner of `<root>/papers/<id>/` directories.
///
/// Every path handed out is checked to be a direct child of the canonical
/// papers directory, whatever the caller passed in.
#[derive(Debug, Clone)]
pub struct DocumentDirs {
    papers: PathBuf,
}

impl DocumentDirs {
    /// Opens (creating if needed) the papers directory under `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let papers = root.join(PAPERS_DIR);
        std::fs::create_dir_all(&papers)?;
        Ok(Self {
            papers: papers.canonicalize()?,
        })
    }

    pub fn papers_dir(&self) -> &Path {
        &self.papers
    }

    /// Maps a textual id to its directory, rejecting anything that is not a
    /// canonical UUID or that would land outside the papers directory.
    pub fn resolve(&self, id: &str) -> Result<PathBuf> {
        let uuid = parse_id(id)?;
        self.resolve_id(&uuid)
    }

    pub fn resolve_id(&self, id: &Uuid) -> Result<PathBuf> {
        let candidate = normalize(&self.papers.join(id.hyphenated().to_string()));
        if candidate.parent() != Some(self.papers.as_path()) {
            return Err(PaperError::InvalidPath(id.to_string()));
        }
        Ok(candidate)
    }

    /// Creates a fresh document directory. An existing one is an error.
    pub async fn create(&self, id: &Uuid) -> Result<PathBuf> {
        let dir = self.resolve_id(id)?;
        tokio::fs::create_dir(&dir).await?;
        Ok(dir)
    }

    /// Removes a document directory and everything in it. Already gone is fine.
    pub async fn remove(&self, id: &Uuid) -> Result<()> {
        let dir = self.resolve_id(id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn content_path(&self, id: &Uuid) -> Result<PathBuf> {
        Ok(self.resolve_id(id)?.join(CONTENT_FILE))
    }

    pub fn cover_path(&self, id: &Uuid) -> Result<PathBuf> {
        Ok(self.resolve_id(id)?.join(COVER_FILE))
    }

    pub fn metadata_path(&self, id: &Uuid) -> Result<PathBuf> {
        Ok(self.resolve_id(id)?.join(METADATA_FILE))
    }

    /// Ids of every well-formed directory currently on disk.
    pub fn list_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.papers)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = parse_id(name) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

/// Accepts only the 36-character hyphenated form, e.g.
/// `67e55044-10b1-426f-9247-bb680e5fe0c8`.
pub fn parse_id(id: &str) -> Result<Uuid> {
    let invalid = || PaperError::InvalidPath(id.to_string());
    if id.len() != ID_LEN {
        return Err(invalid());
    }
    let shape_ok = id.bytes().enumerate().all(|(i, b)| {
        if HYPHEN_POSITIONS.contains(&i) {
            b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    });
    if !shape_ok {
        return Err(invalid());
    }
    Uuid::parse_str(id).map_err(|_| invalid())
}

/// Lexical normalization: folds `.` and `..` without touching the filesystem,
/// so it also works for directories that do not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
