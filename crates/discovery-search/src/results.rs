//! Per-match records produced by a search.
//!
//! - [`FileResult`]: one or more content-identical files (same MD5). The
//!   first instance is the representative; later duplicates are merged in.
//! - [`DomainResult`]: one aggregated network domain per data source. Domain
//!   results are never merged with each other.
//!
//! Results are created during query execution, mutated by attribute
//! enrichment, and become read-only once they are grouped and cached.

use std::collections::BTreeSet;

use discovery_core::{FileKnown, FileType, Frequency, PreviouslyNotable, Score};
use serde::{Deserialize, Serialize};

use crate::store::{DirectoryRef, FileRow};

/// MD5 of zero bytes. Files with this hash carry no content and are never
/// treated as duplicates of each other.
pub const EMPTY_CONTENT_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

// ---------------------------------------------------------------------------
// FileResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    instances: Vec<FileRow>,
    file_type: FileType,
    frequency: Frequency,
    previously_notable: PreviouslyNotable,
    tag_names: BTreeSet<String>,
    keyword_list_names: BTreeSet<String>,
    hash_set_names: BTreeSet<String>,
    interesting_set_names: BTreeSet<String>,
    object_detected_names: BTreeSet<String>,
    containing_directory: Option<DirectoryRef>,
    data_source_name: Option<String>,
}

impl FileResult {
    #[must_use]
    pub fn new(first: FileRow) -> Self {
        let file_type = first.file_type();
        Self {
            instances: vec![first],
            file_type,
            frequency: Frequency::Unknown,
            previously_notable: PreviouslyNotable::NotPreviouslyNotable,
            tag_names: BTreeSet::new(),
            keyword_list_names: BTreeSet::new(),
            hash_set_names: BTreeSet::new(),
            interesting_set_names: BTreeSet::new(),
            object_detected_names: BTreeSet::new(),
            containing_directory: None,
            data_source_name: None,
        }
    }

    #[must_use]
    pub fn first_instance(&self) -> &FileRow {
        &self.instances[0]
    }

    #[must_use]
    pub fn all_instances(&self) -> &[FileRow] {
        &self.instances
    }

    /// Record another file with the same content. Instances already present
    /// (same object id) are ignored.
    pub fn add_duplicate(&mut self, duplicate: FileRow) {
        if self.instances.iter().any(|f| f.id == duplicate.id) {
            return;
        }
        self.instances.push(duplicate);
    }

    /// Merge another result with the same content identity into this one,
    /// keeping every instance and every enrichment value.
    pub fn absorb(&mut self, other: Self) {
        let Self {
            instances,
            tag_names,
            keyword_list_names,
            hash_set_names,
            interesting_set_names,
            object_detected_names,
            ..
        } = other;
        for instance in instances {
            self.add_duplicate(instance);
        }
        self.tag_names.extend(tag_names);
        self.keyword_list_names.extend(keyword_list_names);
        self.hash_set_names.extend(hash_set_names);
        self.interesting_set_names.extend(interesting_set_names);
        self.object_detected_names.extend(object_detected_names);
    }

    /// Lower-cased content hash used for duplicate detection, or `None` when
    /// the hash is missing, blank, or the empty-content hash.
    #[must_use]
    pub fn dedup_key(&self) -> Option<String> {
        let md5 = self.first_instance().md5.as_deref()?.trim();
        if md5.is_empty() || md5.eq_ignore_ascii_case(EMPTY_CONTENT_MD5) {
            return None;
        }
        Some(md5.to_ascii_lowercase())
    }

    /// Same content as `other` by the dedup identity.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        match (self.dedup_key(), other.dedup_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    #[must_use]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    /// `true` only when every instance is deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.instances.iter().all(|f| f.deleted)
    }

    #[must_use]
    pub fn score(&self) -> Score {
        if self.instances.iter().any(|f| f.known == FileKnown::Bad) {
            Score::Notable
        } else if !self.interesting_set_names.is_empty() || !self.tag_names.is_empty() {
            Score::Interesting
        } else {
            Score::Unknown
        }
    }

    #[must_use]
    pub fn keyword_list_names(&self) -> &BTreeSet<String> {
        &self.keyword_list_names
    }

    pub fn add_keyword_list_name(&mut self, name: impl Into<String>) {
        self.keyword_list_names.insert(name.into());
    }

    #[must_use]
    pub fn hash_set_names(&self) -> &BTreeSet<String> {
        &self.hash_set_names
    }

    pub fn add_hash_set_name(&mut self, name: impl Into<String>) {
        self.hash_set_names.insert(name.into());
    }

    #[must_use]
    pub fn interesting_set_names(&self) -> &BTreeSet<String> {
        &self.interesting_set_names
    }

    pub fn add_interesting_set_name(&mut self, name: impl Into<String>) {
        self.interesting_set_names.insert(name.into());
    }

    #[must_use]
    pub fn object_detected_names(&self) -> &BTreeSet<String> {
        &self.object_detected_names
    }

    pub fn add_object_detected_name(&mut self, name: impl Into<String>) {
        self.object_detected_names.insert(name.into());
    }

    #[must_use]
    pub const fn containing_directory(&self) -> Option<&DirectoryRef> {
        self.containing_directory.as_ref()
    }

    pub fn set_containing_directory(&mut self, directory: Option<DirectoryRef>) {
        self.containing_directory = directory;
    }

    #[must_use]
    pub fn data_source_name(&self) -> Option<&str> {
        self.data_source_name.as_deref()
    }

    pub fn set_data_source_name(&mut self, name: Option<String>) {
        self.data_source_name = name;
    }
}

// ---------------------------------------------------------------------------
// DomainResult
// ---------------------------------------------------------------------------

/// Aggregated activity for one domain within one data source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainResult {
    pub domain: String,
    /// Earliest activity, epoch seconds.
    pub activity_start: i64,
    /// Latest activity, epoch seconds.
    pub activity_end: i64,
    pub total_page_views: u64,
    pub page_views_in_recent_window: u64,
    pub files_downloaded: u64,
    pub files_downloaded_in_recent_window: u64,
    pub count_of_known_account_types: u64,
    pub account_types: Vec<String>,
    pub data_source_id: i64,
    pub data_source_name: Option<String>,
    pub frequency: Frequency,
    pub previously_notable: PreviouslyNotable,
    pub tag_names: BTreeSet<String>,
    pub web_categories: BTreeSet<String>,
}

impl DomainResult {
    #[must_use]
    pub fn new(domain: impl Into<String>, data_source_id: i64) -> Self {
        Self {
            domain: domain.into(),
            data_source_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn has_known_account_type(&self) -> bool {
        self.count_of_known_account_types > 0
    }

    pub fn add_web_category(&mut self, category: impl Into<String>) {
        self.web_categories.insert(category.into());
    }
}

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// A single search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchResult {
    File(FileResult),
    Domain(DomainResult),
}

impl SearchResult {
    #[must_use]
    pub fn file(row: FileRow) -> Self {
        Self::File(FileResult::new(row))
    }

    /// `"file"` or `"domain"`, used in contract-violation errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Domain(_) => "domain",
        }
    }

    #[must_use]
    pub const fn result_type(&self) -> FileType {
        match self {
            Self::File(f) => f.file_type,
            Self::Domain(_) => FileType::Domain,
        }
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        match self {
            Self::File(f) => f.frequency,
            Self::Domain(d) => d.frequency,
        }
    }

    pub fn set_frequency(&mut self, frequency: Frequency) {
        match self {
            Self::File(f) => f.frequency = frequency,
            Self::Domain(d) => d.frequency = frequency,
        }
    }

    #[must_use]
    pub const fn previously_notable(&self) -> PreviouslyNotable {
        match self {
            Self::File(f) => f.previously_notable,
            Self::Domain(d) => d.previously_notable,
        }
    }

    pub fn set_previously_notable(&mut self, value: PreviouslyNotable) {
        match self {
            Self::File(f) => f.previously_notable = value,
            Self::Domain(d) => d.previously_notable = value,
        }
    }

    #[must_use]
    pub const fn tag_names(&self) -> &BTreeSet<String> {
        match self {
            Self::File(f) => &f.tag_names,
            Self::Domain(d) => &d.tag_names,
        }
    }

    pub fn add_tag_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Self::File(f) => f.tag_names.insert(name),
            Self::Domain(d) => d.tag_names.insert(name),
        };
    }

    #[must_use]
    pub fn data_source_id(&self) -> i64 {
        match self {
            Self::File(f) => f.first_instance().data_source_id,
            Self::Domain(d) => d.data_source_id,
        }
    }

    /// Known status of the representative file; domains are always unknown.
    #[must_use]
    pub fn known(&self) -> FileKnown {
        match self {
            Self::File(f) => f.first_instance().known,
            Self::Domain(_) => FileKnown::Unknown,
        }
    }

    #[must_use]
    pub const fn as_file(&self) -> Option<&FileResult> {
        match self {
            Self::File(f) => Some(f),
            Self::Domain(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileResult> {
        match self {
            Self::File(f) => Some(f),
            Self::Domain(_) => None,
        }
    }

    #[must_use]
    pub const fn as_domain(&self) -> Option<&DomainResult> {
        match self {
            Self::Domain(d) => Some(d),
            Self::File(_) => None,
        }
    }

    pub fn as_domain_mut(&mut self) -> Option<&mut DomainResult> {
        match self {
            Self::Domain(d) => Some(d),
            Self::File(_) => None,
        }
    }
}
