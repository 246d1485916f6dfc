use crate::commands::{CmdMessage, CmdResult};
use crate::cover::placeholder::BUILTIN_PLACEHOLDER;
use crate::cover::{CoverCoordinator, CoverOutcome, RenderBackend, SkipReason};
use crate::error::Result;
use crate::store::dirs::parse_id;
use crate::store::PaperStore;
use std::path::{Path, PathBuf};

/// What to serve as a document's cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverSource {
    File(PathBuf),
    Builtin(&'static [u8]),
}

/// Resolves the cover for `id`, rendering one first when the stored cover is
/// missing or a placeholder. Always produces something servable.
pub async fn run<R: RenderBackend>(
    store: &PaperStore,
    covers: &CoverCoordinator<R>,
    default_cover: Option<&Path>,
    id: &str,
) -> Result<CmdResult> {
    let id = parse_id(id)?;
    let cover = store.dirs().cover_path(&id)?;
    let detector = covers.detector();
    let mut result = CmdResult::default();

    if !detector.looks_like_placeholder(&cover).await {
        return Ok(result.with_cover(CoverSource::File(cover)));
    }

    let content = store.dirs().content_path(&id)?;
    match covers.ensure_cover(id, &content, &cover).await {
        CoverOutcome::Rendered => {
            result.add_message(CmdMessage::success("Cover rendered"));
            if let Some(mirror) = store.mirror() {
                mirror.mirror_files(id, vec![cover.clone()]);
            }
        }
        CoverOutcome::Failed(reason) => {
            result.add_message(CmdMessage::warning(format!(
                "Cover rendering failed: {}",
                reason
            )));
        }
        CoverOutcome::Skipped(SkipReason::BackingOff) => {
            result.add_message(CmdMessage::info(
                "Cover rendering failed recently, serving placeholder",
            ));
        }
        CoverOutcome::Skipped(SkipReason::RendererUnavailable) => {
            result.add_message(CmdMessage::info("No renderer configured, serving placeholder"));
        }
        CoverOutcome::Skipped(SkipReason::SourceMissing) => {}
    }

    if !detector.looks_like_placeholder(&cover).await {
        return Ok(result.with_cover(CoverSource::File(cover)));
    }
    let fallback = match default_cover {
        Some(path) if path.is_file() => CoverSource::File(path.to_path_buf()),
        _ => CoverSource::Builtin(BUILTIN_PLACEHOLDER),
    };
    Ok(result.with_cover(fallback))
}
