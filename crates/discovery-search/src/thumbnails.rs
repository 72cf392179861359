//! Representative thumbnail for a domain.
//!
//! Candidates come from the files behind the domain's web downloads (newest
//! first, icons last) and then from its web cache entries (largest first).
//! The first candidate the [`ThumbnailProvider`] can render wins; when none
//! can, the result is [`Thumbnail::Unsupported`].

use std::cmp::Ordering;
use std::sync::Arc;

use discovery_core::{ArtifactType, AttributeKind};

use crate::artifacts::ArtifactList;
use crate::context::SearchContext;
use crate::error::DiscoveryResult;
use crate::request::{ArtifactsRequest, ThumbnailRequest};
use crate::store::{CaseStore, FileRow};

/// A rendered thumbnail, or the fixed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    Image {
        /// File the image was generated from.
        file_id: i64,
        bytes: Arc<[u8]>,
    },
    Unsupported,
}

impl Thumbnail {
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    #[must_use]
    pub const fn source_file_id(&self) -> Option<i64> {
        match self {
            Self::Image { file_id, .. } => Some(*file_id),
            Self::Unsupported => None,
        }
    }
}

/// Renders a thumbnail for one file. Returning `None` means "try the next
/// candidate"; failures are never propagated.
pub trait ThumbnailProvider: Send + Sync {
    fn thumbnail(&self, file: &FileRow, icon_size: u32) -> Option<Vec<u8>>;
}

/// Provider used when none is configured: every domain gets the placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThumbnails;

impl ThumbnailProvider for NoThumbnails {
    fn thumbnail(&self, _file: &FileRow, _icon_size: u32) -> Option<Vec<u8>> {
        None
    }
}

fn is_image(file: &FileRow) -> bool {
    file.mime_type
        .as_deref()
        .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("image/"))
}

fn is_icon(file: &FileRow) -> bool {
    let name = file.name.to_ascii_lowercase();
    let mime = file.mime_type.as_deref().unwrap_or("").to_ascii_lowercase();
    name.contains("favicon")
        || name.ends_with(".ico")
        || mime == "image/x-icon"
        || mime == "image/vnd.microsoft.icon"
}

/// Icons last, then newest first, then by id for a stable order.
fn compare_downloads(a: &FileRow, b: &FileRow) -> Ordering {
    is_icon(a)
        .cmp(&is_icon(b))
        .then_with(|| b.crtime.cmp(&a.crtime))
        .then_with(|| a.id.cmp(&b.id))
}

/// Largest first, then by id.
fn compare_cache_entries(a: &FileRow, b: &FileRow) -> Ordering {
    b.size.cmp(&a.size).then_with(|| a.id.cmp(&b.id))
}

/// Image files referenced by the artifacts' path-id attribute, deduplicated.
fn image_files(
    store: &dyn CaseStore,
    artifacts: &ArtifactList,
    context: &SearchContext,
) -> DiscoveryResult<Vec<FileRow>> {
    let mut files: Vec<FileRow> = Vec::new();
    for artifact in artifacts.iter() {
        context.check("thumbnail candidates")?;
        let Some(file_id) = artifact.int(AttributeKind::PathId) else {
            continue;
        };
        if files.iter().any(|f| f.id == file_id) {
            continue;
        }
        match store.file_by_id(file_id) {
            Ok(Some(file)) if is_image(&file) => files.push(file),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(file_id, error = %err, "thumbnail candidate could not be read, skipping");
            }
        }
    }
    Ok(files)
}

fn first_rendered(
    candidates: &[FileRow],
    provider: &dyn ThumbnailProvider,
    icon_size: u32,
    context: &SearchContext,
) -> DiscoveryResult<Option<Thumbnail>> {
    for file in candidates {
        context.check("thumbnail generation")?;
        if let Some(bytes) = provider.thumbnail(file, icon_size) {
            return Ok(Some(Thumbnail::Image {
                file_id: file.id,
                bytes: bytes.into(),
            }));
        }
        tracing::debug!(file_id = file.id, "thumbnail candidate produced no image");
    }
    Ok(None)
}

/// Pick a thumbnail for the requested domain.
///
/// `artifacts` fetches the domain's artifacts of one type, normally through
/// the artifacts cache.
pub fn load_thumbnail<F>(
    request: &ThumbnailRequest,
    provider: &dyn ThumbnailProvider,
    context: &SearchContext,
    artifacts: F,
) -> DiscoveryResult<Thumbnail>
where
    F: Fn(&ArtifactsRequest, &SearchContext) -> DiscoveryResult<ArtifactList>,
{
    let store = request.store();

    let downloads = artifacts(&request.artifacts(ArtifactType::WebDownload), context)?;
    let mut candidates = image_files(store, &downloads, context)?;
    candidates.sort_by(compare_downloads);
    if let Some(thumbnail) = first_rendered(&candidates, provider, request.icon_size(), context)? {
        return Ok(thumbnail);
    }

    let cached = artifacts(&request.artifacts(ArtifactType::WebCache), context)?;
    let mut candidates = image_files(store, &cached, context)?;
    candidates.sort_by(compare_cache_entries);
    if let Some(thumbnail) = first_rendered(&candidates, provider, request.icon_size(), context)? {
        return Ok(thumbnail);
    }

    tracing::debug!(domain = request.domain(), "no thumbnail candidate rendered, using placeholder");
    Ok(Thumbnail::Unsupported)
}
