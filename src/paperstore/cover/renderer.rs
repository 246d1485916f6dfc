//! Renderer backends.
//!
//! [`RenderBackend`] is the seam between the coordinator and whatever turns a
//! document into a PNG. [`ProcessRenderer`] runs an external program as
//! `<program> <source> <dest> [args...]`; exit code 0 means `dest` was written.

use crate::error::RenderError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tracing::debug;

/// Bytes of renderer stderr kept for diagnostics.
const MAX_STDERR: usize = 8 * 1024;

pub trait RenderBackend: Send + Sync + 'static {
    /// Render the first page of `source` into a PNG at `dest`.
    ///
    /// The coordinator enforces the timeout by dropping this future, so
    /// implementations must release their resources on drop.
    fn render(
        &self,
        source: &Path,
        dest: &Path,
    ) -> impl Future<Output = Result<(), RenderError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ProcessRenderer {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRenderer {
    /// Uses `program` as given, without checking that it exists.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Finds `program` on disk, searching `PATH` for bare names.
    pub fn locate(program: &Path, args: Vec<String>) -> Option<Self> {
        let found = if program.is_absolute() || program.components().count() > 1 {
            program.is_file().then(|| program.to_path_buf())
        } else {
            std::env::var_os("PATH").and_then(|paths| {
                std::env::split_paths(&paths)
                    .map(|dir| dir.join(program))
                    .find(|candidate| candidate.is_file())
            })
        };
        found.map(|program| Self::new(program, args))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl RenderBackend for ProcessRenderer {
    async fn render(&self, source: &Path, dest: &Path) -> Result<(), RenderError> {
        debug!(
            program = %self.program.display(),
            source = %source.display(),
            dest = %dest.display(),
            "spawning renderer"
        );
        let mut child = Command::new(&self.program)
            .arg(source)
            .arg(dest)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RenderError::Spawn)?;

        let stderr = child.stderr.take();
        let (status, stderr) = tokio::join!(child.wait(), read_bounded(stderr));
        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(RenderError::Exit {
                code: status.code(),
                stderr,
            })
        }
    }
}

/// Drains the pipe so the child never blocks on a full buffer, keeping only
/// the first [`MAX_STDERR`] bytes.
async fn read_bounded(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut kept = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = MAX_STDERR.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    String::from_utf8_lossy(&kept).trim().to_string()
}
