//! Crash-safe file replacement.
//!
//! Every file the store owns is written to a sibling temp file first and then
//! renamed over its final name, so a reader sees either the old bytes or the new
//! bytes and never a truncated file. The temp file shares the target's
//! directory, which keeps the rename on one filesystem.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Path of a fresh temp sibling for `target`, e.g. `.index.json.<uuid>.tmp`.
pub fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    target.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
}

/// Write `bytes` to `path` atomically.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path);
    let written = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    replace(&tmp, path).await
}

/// Copy `src` to `dest` atomically, returning the number of bytes copied.
pub async fn copy_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    let tmp = temp_sibling(dest);
    let copied = async {
        let len = fs::copy(src, &tmp).await?;
        fs::File::open(&tmp).await?.sync_all().await?;
        Ok::<_, io::Error>(len)
    }
    .await;
    match copied {
        Ok(len) => {
            replace(&tmp, dest).await?;
            Ok(len)
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp).await;
            Err(e)
        }
    }
}

/// Rename an already written `tmp` over `dest`.
///
/// Some platforms refuse to rename onto an existing file; in that case the
/// target is removed and the rename retried once. The temp file is cleaned up
/// when both attempts fail.
pub async fn replace(tmp: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(tmp, dest).await.is_ok() {
        return Ok(());
    }
    match fs::remove_file(dest).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            let _ = fs::remove_file(tmp).await;
            return Err(e);
        }
    }
    if let Err(e) = fs::rename(tmp, dest).await {
        let _ = fs::remove_file(tmp).await;
        return Err(e);
    }
    Ok(())
}
