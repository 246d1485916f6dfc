#![allow(dead_code)]

use paperstore::error::RenderError;
use paperstore::cover::RenderBackend;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A PNG long enough for header inspection.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    bytes.extend_from_slice(b"IDAT-not-really");
    bytes
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Counters shared between a [`FakeRenderer`] and the test observing it.
#[derive(Debug, Default)]
pub struct RenderStats {
    pub calls: AtomicUsize,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
}

impl RenderStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct Running<'a>(&'a RenderStats);

impl<'a> Running<'a> {
    fn enter(stats: &'a RenderStats) -> Self {
        let now = stats.running.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-process renderer that sleeps, then writes a real-sized cover or fails.
#[derive(Clone)]
pub struct FakeRenderer {
    pub stats: Arc<RenderStats>,
    delay: Duration,
    fail: bool,
    output: Vec<u8>,
}

impl FakeRenderer {
    pub fn new(delay: Duration) -> Self {
        Self {
            stats: Arc::new(RenderStats::default()),
            delay,
            fail: false,
            output: png(200, 280),
        }
    }

    pub fn failing(delay: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(delay)
        }
    }

    /// Writes `bytes` instead of a normal cover.
    pub fn producing(mut self, bytes: Vec<u8>) -> Self {
        self.output = bytes;
        self
    }
}

impl RenderBackend for FakeRenderer {
    async fn render(&self, _source: &Path, dest: &Path) -> Result<(), RenderError> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let _running = Running::enter(&self.stats);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(RenderError::Exit {
                code: Some(1),
                stderr: "cannot open document".to_string(),
            });
        }
        tokio::fs::write(dest, &self.output).await?;
        Ok(())
    }
}

/// Writes an executable shell script and returns its path.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
