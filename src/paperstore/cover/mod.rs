//! # Cover Generation
//!
//! Rendering a cover means starting an external process, which is slow, heavy
//! and sometimes hangs. [`CoverCoordinator`] keeps that under control:
//!
//! - **Admission**: at most `concurrency` renders run at once. Waiters queue on
//!   a fair semaphore and are admitted in FIFO order.
//! - **De-duplication**: one job per document id. Concurrent requests for the
//!   same id attach to the running job and all observe its outcome.
//! - **Timeout**: each render gets a wall-clock limit; on expiry the render
//!   future is dropped, which kills the child process.
//! - **Backoff**: a failed id is not retried until its cool-down passes. The
//!   cool-down lives in memory only, so a restart clears it.
//!
//! Failures never escape: [`CoverCoordinator::ensure_cover`] returns a
//! [`CoverOutcome`] and the caller falls back to a placeholder.
//!
//! Jobs run as spawned tasks, so a caller that goes away does not cancel a
//! render other callers are waiting on.

use crate::config::StoreConfig;
use crate::error::RenderError;
use crate::store::atomic::replace;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod placeholder;
pub mod renderer;

pub use placeholder::PlaceholderDetector;
pub use renderer::{ProcessRenderer, RenderBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverOutcome {
    /// A new cover was written to the destination.
    Rendered,
    /// Nothing was attempted.
    Skipped(SkipReason),
    /// The render failed; the id is backing off.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RendererUnavailable,
    SourceMissing,
    BackingOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverSettings {
    pub concurrency: usize,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for CoverSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            timeout: Duration::from_secs(25),
            backoff: Duration::from_secs(10 * 60),
        }
    }
}

impl CoverSettings {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            concurrency: config.cover_concurrency(),
            timeout: config.render_timeout(),
            backoff: config.failure_backoff(),
        }
    }
}

type SharedJob = Shared<BoxFuture<'static, CoverOutcome>>;

#[derive(Default)]
struct Jobs {
    failed_until: HashMap<Uuid, Instant>,
    in_flight: HashMap<Uuid, SharedJob>,
}

struct Inner<R> {
    renderer: Option<Arc<R>>,
    detector: Arc<PlaceholderDetector>,
    slots: Semaphore,
    settings: CoverSettings,
    jobs: Mutex<Jobs>,
}

pub struct CoverCoordinator<R: RenderBackend = ProcessRenderer> {
    inner: Arc<Inner<R>>,
}

impl<R: RenderBackend> Clone for CoverCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RenderBackend> CoverCoordinator<R> {
    /// `renderer: None` yields a coordinator that skips every request.
    pub fn new(
        renderer: Option<R>,
        detector: Arc<PlaceholderDetector>,
        settings: CoverSettings,
    ) -> Self {
        let settings = CoverSettings {
            concurrency: settings.concurrency.max(1),
            ..settings
        };
        Self {
            inner: Arc::new(Inner {
                renderer: renderer.map(Arc::new),
                detector,
                slots: Semaphore::new(settings.concurrency),
                settings,
                jobs: Mutex::new(Jobs::default()),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.renderer.is_some()
    }

    pub fn settings(&self) -> CoverSettings {
        self.inner.settings
    }

    pub fn detector(&self) -> &PlaceholderDetector {
        &self.inner.detector
    }

    /// Renders currently holding a slot.
    pub fn active_jobs(&self) -> usize {
        self.inner.settings.concurrency - self.inner.slots.available_permits()
    }

    /// Makes sure `dest` holds a rendered cover for `source`, if possible.
    pub async fn ensure_cover(&self, id: Uuid, source: &Path, dest: &Path) -> CoverOutcome {
        let Some(renderer) = self.inner.renderer.as_ref() else {
            debug!(%id, "no renderer configured, skipping cover");
            return CoverOutcome::Skipped(SkipReason::RendererUnavailable);
        };
        if !source.exists() {
            debug!(%id, source = %source.display(), "no content to render");
            return CoverOutcome::Skipped(SkipReason::SourceMissing);
        }

        let job = {
            let mut jobs = self.inner.lock_jobs();
            if let Some(&until) = jobs.failed_until.get(&id) {
                if Instant::now() < until {
                    debug!(%id, "cover render backing off");
                    return CoverOutcome::Skipped(SkipReason::BackingOff);
                }
                jobs.failed_until.remove(&id);
            }
            match jobs.in_flight.get(&id) {
                Some(job) => {
                    debug!(%id, "joining in-flight cover render");
                    job.clone()
                }
                None => {
                    let handle = tokio::spawn(run_job(
                        Arc::clone(&self.inner),
                        Arc::clone(renderer),
                        id,
                        source.to_path_buf(),
                        dest.to_path_buf(),
                    ));
                    let job = async move {
                        handle.await.unwrap_or_else(|e| {
                            CoverOutcome::Failed(format!("render task aborted: {}", e))
                        })
                    }
                    .boxed()
                    .shared();
                    jobs.in_flight.insert(id, job.clone());
                    job
                }
            }
        };
        job.await
    }
}

async fn run_job<R: RenderBackend>(
    inner: Arc<Inner<R>>,
    renderer: Arc<R>,
    id: Uuid,
    source: PathBuf,
    dest: PathBuf,
) -> CoverOutcome {
    let started = Instant::now();
    let result = inner.render_once(renderer.as_ref(), &source, &dest).await;

    let mut jobs = inner.lock_jobs();
    jobs.in_flight.remove(&id);
    match result {
        Ok(()) => {
            jobs.failed_until.remove(&id);
            info!(%id, elapsed_ms = started.elapsed().as_millis() as u64, "cover rendered");
            CoverOutcome::Rendered
        }
        Err(e) => {
            jobs.failed_until
                .insert(id, Instant::now() + inner.settings.backoff);
            warn!(
                %id,
                error = %e,
                retry_in_secs = inner.settings.backoff.as_secs(),
                "cover render failed"
            );
            CoverOutcome::Failed(e.to_string())
        }
    }
}

impl<R: RenderBackend> Inner<R> {
    fn lock_jobs(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn render_once(&self, renderer: &R, source: &Path, dest: &Path) -> Result<(), RenderError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| RenderError::Io(std::io::Error::other("cover slots closed")))?;

        let target = render_target(dest);
        let rendered = match tokio::time::timeout(
            self.settings.timeout,
            renderer.render(source, &target),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(self.settings.timeout)),
        };
        drop(permit);

        let accepted = match rendered {
            Ok(()) => self.accept(&target, dest).await,
            Err(e) => Err(e),
        };
        if accepted.is_err() {
            let _ = tokio::fs::remove_file(&target).await;
        }
        accepted
    }

    /// Moves a finished render into place if it is a usable cover.
    async fn accept(&self, target: &Path, dest: &Path) -> Result<(), RenderError> {
        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => return Err(RenderError::MissingOutput),
        }
        if self.detector.looks_like_placeholder(target).await {
            return Err(RenderError::Placeholder);
        }
        replace(target, dest).await?;
        Ok(())
    }
}

/// Hidden sibling of `dest` that keeps the `.png` extension, since renderers
/// commonly pick the output format from it.
fn render_target(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cover".to_string());
    dest.with_file_name(format!(".{}.{}.png", stem, Uuid::new_v4()))
}
