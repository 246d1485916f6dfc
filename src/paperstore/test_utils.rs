use crate::store::PaperStore;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    // Keeps the directory alive until the test is done
    pub _temp_dir: TempDir,
    pub store: PaperStore,
    pub root: PathBuf,
    pub uploads: PathBuf,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().join("data");
        let uploads = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).expect("failed to create upload dir");
        let store = PaperStore::open(&root, None)
            .await
            .expect("failed to open store");
        Self {
            _temp_dir: temp_dir,
            store,
            root,
            uploads,
        }
    }

    /// Drops `bytes` into the upload area, as a transport layer would.
    pub fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.uploads.join(name);
        std::fs::write(&path, bytes).expect("failed to write upload");
        path
    }
}

/// Just enough of a PNG for header inspection.
pub fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    bytes
}
