//! Cheap classification of cover files.
//!
//! A cover counts as a placeholder when it is a known stand-in image, a
//! degenerate 1×1 image, or not a readable PNG at all. Only the 24-byte PNG
//! header (signature + IHDR width/height) is read; a full comparison against a
//! known placeholder happens only when the file sizes already match.

use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// 1×1 transparent PNG, served when nothing better exists.
pub const BUILTIN_PLACEHOLDER: &[u8] = b"\x89PNG\r\n\x1a\n\
\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x06\x00\x00\x00\x1f\x15\xc4\x89\
\x00\x00\x00\rIDATx\x9cc\xf8\xff\xff\x3f\x03\x00\x08\xfc\x02\xfe\xa7\x9a\xa0\xa0\
\x00\x00\x00\x00IEND\xaeB`\x82";

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const HEADER_LEN: usize = 24;

/// Width and height from a PNG header, if `header` starts with one.
pub fn png_dimensions(header: &[u8]) -> Option<(u32, u32)> {
    if header.len() < HEADER_LEN || &header[..8] != PNG_SIGNATURE || &header[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([header[16], header[17], header[18], header[19]]);
    let height = u32::from_be_bytes([header[20], header[21], header[22], header[23]]);
    Some((width, height))
}

#[derive(Debug, Clone)]
pub struct PlaceholderDetector {
    known: Vec<Vec<u8>>,
}

impl Default for PlaceholderDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderDetector {
    /// A detector that knows the built-in placeholder.
    pub fn new() -> Self {
        Self {
            known: vec![BUILTIN_PLACEHOLDER.to_vec()],
        }
    }

    pub fn with_known(mut self, bytes: Vec<u8>) -> Self {
        if !bytes.is_empty() && !self.known.contains(&bytes) {
            self.known.push(bytes);
        }
        self
    }

    /// Registers the contents of `path` (typically the configured default
    /// cover) as a known placeholder. Unreadable files are logged and skipped.
    pub fn with_known_file(self, path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => self.with_known(bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "default cover unreadable");
                self
            }
        }
    }

    pub async fn looks_like_placeholder(&self, path: &Path) -> bool {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(_) => return true,
        };
        let len = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(_) => return true,
        };
        let mut header = [0u8; HEADER_LEN];
        if file.read_exact(&mut header).await.is_err() {
            return true;
        }
        match png_dimensions(&header) {
            None => return true,
            Some((w, h)) if w == 0 || h == 0 || (w <= 1 && h <= 1) => return true,
            Some(_) => {}
        }
        if !self.known.iter().any(|k| k.len() as u64 == len) {
            return false;
        }
        match tokio::fs::read(path).await {
            Ok(bytes) => self.known.iter().any(|k| *k == bytes),
            Err(_) => true,
        }
    }
}
