//! # API Facade
//!
//! [`PaperApi`] is the single entry point for callers, whether that is the
//! bundled CLI or an HTTP layer. It owns the store and the cover coordinator
//! and dispatches to the command layer; it holds no business logic itself.
//!
//! Every method takes `&self`, so one instance can be shared (e.g. in an `Arc`)
//! across concurrent request handlers. The coordination that needs locks
//! (index mutations, cover admission) happens below this layer.
//!
//! ## Error mapping
//!
//! Callers should treat [`crate::error::PaperError::is_not_found`] errors as a
//! missing document. Cover and mirror problems never surface here: covers fall
//! back to a placeholder and mirror failures are only logged.

use crate::commands;
use crate::config::StoreConfig;
use crate::cover::{CoverCoordinator, CoverSettings, PlaceholderDetector, ProcessRenderer, RenderBackend};
use crate::error::Result;
use crate::model::NewDocument;
use crate::store::PaperStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use crate::commands::{
    CmdMessage, CmdResult, CoverSource, DoctorReport, DocumentFile, MessageLevel,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub renderer_available: bool,
    pub active_cover_jobs: usize,
    pub cover_concurrency: usize,
    pub mirror_enabled: bool,
}

pub struct PaperApi<R: RenderBackend = ProcessRenderer> {
    store: PaperStore,
    covers: CoverCoordinator<R>,
    default_cover: Option<PathBuf>,
    max_upload_bytes: u64,
}

impl PaperApi<ProcessRenderer> {
    /// Opens the store at `root` with the external renderer named in `config`.
    pub async fn open(root: impl Into<PathBuf>, config: &StoreConfig) -> Result<Self> {
        let renderer = match &config.renderer {
            Some(program) => {
                let found = ProcessRenderer::locate(program, config.renderer_args.clone());
                match &found {
                    Some(r) => info!(program = %r.program().display(), "cover renderer ready"),
                    None => warn!(
                        program = %program.display(),
                        "cover renderer not found, cover generation disabled"
                    ),
                }
                found
            }
            None => {
                info!("no cover renderer configured, cover generation disabled");
                None
            }
        };
        Self::open_with_renderer(root, config, renderer).await
    }
}

impl<R: RenderBackend> PaperApi<R> {
    /// Opens the store with a caller-supplied renderer backend.
    pub async fn open_with_renderer(
        root: impl Into<PathBuf>,
        config: &StoreConfig,
        renderer: Option<R>,
    ) -> Result<Self> {
        let store = PaperStore::open(root, config.mirror_root.as_deref()).await?;
        let mut detector = PlaceholderDetector::new();
        if let Some(path) = &config.default_cover {
            detector = detector.with_known_file(path);
        }
        let covers = CoverCoordinator::new(
            renderer,
            Arc::new(detector),
            CoverSettings::from_config(config),
        );
        Ok(Self {
            store,
            covers,
            default_cover: config.default_cover.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub async fn create_document(&self, upload: NewDocument) -> Result<CmdResult> {
        commands::create::run(&self.store, upload, self.max_upload_bytes).await
    }

    pub async fn list_documents(&self) -> Result<CmdResult> {
        commands::list::run(&self.store).await
    }

    pub async fn get_document(&self, id: &str) -> Result<CmdResult> {
        commands::get::run(&self.store, id).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<CmdResult> {
        commands::delete::run(&self.store, id).await
    }

    pub async fn cover(&self, id: &str) -> Result<CmdResult> {
        commands::cover::run(&self.store, &self.covers, self.default_cover.as_deref(), id).await
    }

    pub async fn document_file(&self, id: &str) -> Result<CmdResult> {
        commands::file::run(&self.store, id).await
    }

    pub async fn doctor(&self) -> Result<CmdResult> {
        commands::doctor::run(&self.store).await
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            ok: true,
            renderer_available: self.covers.is_available(),
            active_cover_jobs: self.covers.active_jobs(),
            cover_concurrency: self.covers.settings().concurrency,
            mirror_enabled: self.store.mirror().is_some(),
        }
    }

    /// Waits for pending mirror work. Call before shutting down.
    pub async fn shutdown(&self) {
        if let Some(mirror) = self.store.mirror() {
            mirror.drain().await;
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &PaperStore {
        &self.store
    }

    pub fn covers(&self) -> &CoverCoordinator<R> {
        &self.covers
    }
}
