//! Builders for case store records.

use discovery_core::{ArtifactType, AttributeKind, FileKnown};
use discovery_search::{Artifact, ArtifactAttribute, FileRow, StoreRow, Value};

/// Builder for [`FileRow`] with sensible defaults: a 1 KiB unknown PNG in
/// `/root/`, data source 1, not deleted, no hash.
#[derive(Debug, Clone)]
pub struct FileFixture {
    row: FileRow,
}

impl FileFixture {
    #[must_use]
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            row: FileRow {
                id,
                name: name.to_string(),
                parent_path: Some("/root/".to_string()),
                size: 1_024,
                md5: None,
                mime_type: Some("image/png".to_string()),
                known: FileKnown::Unknown,
                data_source_id: 1,
                deleted: false,
                crtime: 0,
            },
        }
    }

    #[must_use]
    pub const fn size(mut self, size: u64) -> Self {
        self.row.size = size;
        self
    }

    #[must_use]
    pub fn md5(mut self, md5: &str) -> Self {
        self.row.md5 = Some(md5.to_string());
        self
    }

    #[must_use]
    pub fn mime(mut self, mime: &str) -> Self {
        self.row.mime_type = Some(mime.to_string());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: &str) -> Self {
        self.row.parent_path = Some(parent.to_string());
        self
    }

    #[must_use]
    pub const fn known(mut self, known: FileKnown) -> Self {
        self.row.known = known;
        self
    }

    #[must_use]
    pub const fn data_source(mut self, id: i64) -> Self {
        self.row.data_source_id = id;
        self
    }

    #[must_use]
    pub const fn deleted(mut self) -> Self {
        self.row.deleted = true;
        self
    }

    #[must_use]
    pub const fn crtime(mut self, epoch_seconds: i64) -> Self {
        self.row.crtime = epoch_seconds;
        self
    }

    #[must_use]
    pub fn build(self) -> FileRow {
        self.row
    }
}

/// Builder for web artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactFixture {
    artifact: Artifact,
}

impl ArtifactFixture {
    #[must_use]
    pub const fn new(id: i64, artifact_type: ArtifactType) -> Self {
        Self {
            artifact: Artifact {
                id,
                artifact_type,
                object_id: id,
                data_source_id: 1,
                attributes: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn attribute(mut self, kind: AttributeKind, value: impl Into<Value>) -> Self {
        self.artifact.attributes.push(ArtifactAttribute {
            kind,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn domain(self, domain: &str) -> Self {
        self.attribute(AttributeKind::Domain, domain)
    }

    #[must_use]
    pub fn url(self, url: &str) -> Self {
        self.attribute(AttributeKind::Url, url)
    }

    /// Case file the artifact points at (downloaded file, cached entry).
    #[must_use]
    pub fn path_id(self, file_id: i64) -> Self {
        self.attribute(AttributeKind::PathId, file_id)
    }

    #[must_use]
    pub const fn data_source(mut self, id: i64) -> Self {
        self.artifact.data_source_id = id;
        self
    }

    #[must_use]
    pub fn build(self) -> Artifact {
        self.artifact
    }
}

/// Counters for one row of the aggregate domain query.
#[derive(Debug, Clone, Default)]
pub struct DomainRowFixture {
    pub domain: String,
    pub data_source_id: i64,
    pub activity_start: i64,
    pub activity_end: i64,
    pub page_views: i64,
    pub page_views_recent: i64,
    pub downloads: i64,
    pub downloads_recent: i64,
    pub account_types: Vec<String>,
}

impl DomainRowFixture {
    #[must_use]
    pub fn new(domain: &str, activity_start: i64, activity_end: i64) -> Self {
        Self {
            domain: domain.to_string(),
            data_source_id: 1,
            activity_start,
            activity_end,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn page_views(mut self, total: i64, recent: i64) -> Self {
        self.page_views = total;
        self.page_views_recent = recent;
        self
    }

    #[must_use]
    pub const fn downloads(mut self, total: i64, recent: i64) -> Self {
        self.downloads = total;
        self.downloads_recent = recent;
        self
    }

    #[must_use]
    pub fn account_type(mut self, account_type: &str) -> Self {
        self.account_types.push(account_type.to_string());
        self
    }

    #[must_use]
    pub const fn data_source(mut self, id: i64) -> Self {
        self.data_source_id = id;
        self
    }

    #[must_use]
    pub fn build(self) -> StoreRow {
        let account_count = i64::try_from(self.account_types.len()).unwrap_or(i64::MAX);
        let (count, joined) = if self.account_types.is_empty() {
            (None, None)
        } else {
            (Some(account_count), Some(self.account_types.join(",")))
        };
        StoreRow::new()
            .with("domain", self.domain.as_str())
            .with("data_source_obj_id", self.data_source_id)
            .with("activity_start", self.activity_start)
            .with("activity_end", self.activity_end)
            .with("total_page_views", self.page_views)
            .with("page_views_in_recent_window", self.page_views_recent)
            .with("files_downloaded", self.downloads)
            .with("files_downloaded_in_recent_window", self.downloads_recent)
            .with("count_of_known_account_types", count)
            .with("account_types", joined)
    }
}
