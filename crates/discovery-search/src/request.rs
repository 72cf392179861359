//! Search requests and the cache keys derived from them.
//!
//! A [`SearchKey`] is equal to another when both the textual signature of
//! the request and the identity of the case store and central repository
//! match. The store handles themselves are held by the key, so a cached
//! entry never outlives the store it was computed from.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use discovery_core::ArtifactType;
use serde::{Deserialize, Serialize};

use crate::attributes::GroupingAttribute;
use crate::filters::FilterRef;
use crate::grouping::GroupSortingAlgorithm;
use crate::sorter::SortingMethod;
use crate::store::{CaseStore, CentralRepository};

/// What a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    Files,
    Domains,
}

impl SearchTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Domains => "domains",
        }
    }
}

// ---------------------------------------------------------------------------
// SearchSources
// ---------------------------------------------------------------------------

/// The external stores one search reads from.
#[derive(Clone)]
pub struct SearchSources {
    pub store: Arc<dyn CaseStore>,
    pub central_repo: Option<Arc<dyn CentralRepository>>,
}

impl SearchSources {
    #[must_use]
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self {
            store,
            central_repo: None,
        }
    }

    #[must_use]
    pub fn with_central_repo(mut self, central_repo: Arc<dyn CentralRepository>) -> Self {
        self.central_repo = Some(central_repo);
        self
    }

    fn same_store(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.store), Arc::as_ptr(&other.store))
    }

    fn same_central_repo(&self, other: &Self) -> bool {
        match (&self.central_repo, &other.central_repo) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }

    fn store_addr(&self) -> usize {
        Arc::as_ptr(&self.store).cast::<()>() as usize
    }
}

impl fmt::Debug for SearchSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSources")
            .field("store", &format_args!("{:#x}", self.store_addr()))
            .field("central_repo", &self.central_repo.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SearchRequest
// ---------------------------------------------------------------------------

/// Everything that defines one search apart from where it reads from.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub user: String,
    pub target: SearchTarget,
    pub filters: Vec<FilterRef>,
    pub grouping: GroupingAttribute,
    pub group_sorting: GroupSortingAlgorithm,
    pub sorting: SortingMethod,
}

impl SearchRequest {
    /// File search with no grouping, sorted by name.
    #[must_use]
    pub fn files(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            target: SearchTarget::Files,
            filters: Vec::new(),
            grouping: GroupingAttribute::NoGrouping,
            group_sorting: GroupSortingAlgorithm::ByGroupName,
            sorting: SortingMethod::ByFileName,
        }
    }

    /// Domain search with no grouping, sorted by domain name.
    #[must_use]
    pub fn domains(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            target: SearchTarget::Domains,
            filters: Vec::new(),
            grouping: GroupingAttribute::NoGrouping,
            group_sorting: GroupSortingAlgorithm::ByGroupName,
            sorting: SortingMethod::ByDomainName,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterRef) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub const fn grouped_by(mut self, grouping: GroupingAttribute) -> Self {
        self.grouping = grouping;
        self
    }

    #[must_use]
    pub const fn groups_sorted_by(mut self, group_sorting: GroupSortingAlgorithm) -> Self {
        self.group_sorting = group_sorting;
        self
    }

    #[must_use]
    pub const fn sorted_by(mut self, sorting: SortingMethod) -> Self {
        self.sorting = sorting;
        self
    }

    /// Attributes that must be enriched before grouping and sorting: the
    /// grouping attribute plus whatever the sort method reads.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<GroupingAttribute> {
        let mut attributes = vec![self.grouping];
        for attribute in self.sorting.required_attributes() {
            if !attributes.contains(attribute) {
                attributes.push(*attribute);
            }
        }
        attributes
    }

    /// Textual identity of the request. Filters contribute their
    /// descriptions in declaration order.
    #[must_use]
    pub fn signature(&self) -> String {
        let mut signature = String::with_capacity(128);
        signature.push_str(&self.user);
        signature.push('|');
        signature.push_str(self.target.as_str());
        for filter in &self.filters {
            signature.push('|');
            signature.push_str(&filter.cache_key());
        }
        signature.push('|');
        signature.push_str(self.grouping.display_name());
        signature.push('|');
        signature.push_str(self.group_sorting.display_name());
        signature.push('|');
        signature.push_str(self.sorting.display_name());
        signature
    }
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

/// Key of the grouped search result cache.
#[derive(Clone)]
pub struct SearchKey {
    signature: String,
    sources: SearchSources,
}

impl SearchKey {
    #[must_use]
    pub fn new(request: &SearchRequest, sources: &SearchSources) -> Self {
        Self {
            signature: request.signature(),
            sources: sources.clone(),
        }
    }

    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl PartialEq for SearchKey {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
            && self.sources.same_store(&other.sources)
            && self.sources.same_central_repo(&other.sources)
    }
}

impl Eq for SearchKey {}

impl Hash for SearchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
        self.sources.store_addr().hash(state);
    }
}

impl fmt::Debug for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchKey")
            .field("signature", &self.signature)
            .field("sources", &self.sources)
            .finish()
    }
}

/// Artifacts of one type that mention a domain, in one case store.
#[derive(Clone)]
pub struct ArtifactsRequest {
    store: Arc<dyn CaseStore>,
    domain: String,
    artifact_type: ArtifactType,
}

impl ArtifactsRequest {
    /// The domain is matched case-insensitively, so it is stored lower-cased.
    #[must_use]
    pub fn new(store: Arc<dyn CaseStore>, domain: &str, artifact_type: ArtifactType) -> Self {
        Self {
            store,
            domain: domain.to_lowercase(),
            artifact_type,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn CaseStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub const fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }
}

impl PartialEq for ArtifactsRequest {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.artifact_type == other.artifact_type
            && std::ptr::addr_eq(Arc::as_ptr(&self.store), Arc::as_ptr(&other.store))
    }
}

impl Eq for ArtifactsRequest {}

impl Hash for ArtifactsRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.artifact_type.hash(state);
    }
}

impl fmt::Debug for ArtifactsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactsRequest")
            .field("domain", &self.domain)
            .field("artifact_type", &self.artifact_type)
            .finish_non_exhaustive()
    }
}

/// Thumbnail for a domain at one icon size, in one case store.
#[derive(Clone)]
pub struct ThumbnailRequest {
    store: Arc<dyn CaseStore>,
    domain: String,
    icon_size: u32,
}

impl ThumbnailRequest {
    #[must_use]
    pub fn new(store: Arc<dyn CaseStore>, domain: &str, icon_size: u32) -> Self {
        Self {
            store,
            domain: domain.to_lowercase(),
            icon_size,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn CaseStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub const fn icon_size(&self) -> u32 {
        self.icon_size
    }

    /// Matching artifacts request for the same domain and store.
    #[must_use]
    pub fn artifacts(&self, artifact_type: ArtifactType) -> ArtifactsRequest {
        ArtifactsRequest {
            store: Arc::clone(&self.store),
            domain: self.domain.clone(),
            artifact_type,
        }
    }
}

impl PartialEq for ThumbnailRequest {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.icon_size == other.icon_size
            && std::ptr::addr_eq(Arc::as_ptr(&self.store), Arc::as_ptr(&other.store))
    }
}

impl Eq for ThumbnailRequest {}

impl Hash for ThumbnailRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.icon_size.hash(state);
    }
}

impl fmt::Debug for ThumbnailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailRequest")
            .field("domain", &self.domain)
            .field("icon_size", &self.icon_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{KnownFilter, SizeFilter};
    use crate::store::{Artifact, DirectoryRef, FileRow, StoreResult, StoreRow};
    use discovery_core::FileSize;
    use std::collections::hash_map::DefaultHasher;
    use std::ops::ControlFlow;

    struct EmptyStore;

    impl CaseStore for EmptyStore {
        fn find_files_where(
            &self,
            _where_clause: &str,
            _visitor: &mut dyn FnMut(FileRow) -> ControlFlow<()>,
        ) -> StoreResult<()> {
            Ok(())
        }
        fn select(
            &self,
            _query: &str,
            _visitor: &mut dyn FnMut(&StoreRow) -> ControlFlow<()>,
        ) -> StoreResult<()> {
            Ok(())
        }
        fn content_tags(&self, _file_id: i64) -> StoreResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn artifacts_of_type(&self, _artifact_type: ArtifactType) -> StoreResult<Vec<Artifact>> {
            Ok(Vec::new())
        }
        fn file_by_id(&self, _file_id: i64) -> StoreResult<Option<FileRow>> {
            Ok(None)
        }
        fn data_source_name(&self, _data_source_id: i64) -> StoreResult<Option<String>> {
            Ok(None)
        }
        fn containing_directory(&self, _file_id: i64) -> StoreResult<Option<DirectoryRef>> {
            Ok(None)
        }
        fn read_content(&self, _file_id: i64, _max_bytes: usize) -> StoreResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn request() -> SearchRequest {
        SearchRequest::files("examiner")
            .with_filter(Arc::new(SizeFilter::new(vec![FileSize::MediumImage])))
            .grouped_by(GroupingAttribute::FileSize)
            .sorted_by(SortingMethod::ByFileSize)
    }

    #[test]
    fn signature_lists_every_part_in_order() {
        let signature = request().signature();
        assert!(signature.starts_with("examiner|files|"));
        assert!(signature.ends_with("|File Size|Group Name|File Size"));
    }

    #[test]
    fn same_named_size_buckets_sign_differently() {
        let image = SearchRequest::files("a").with_filter(Arc::new(SizeFilter::new(vec![FileSize::XxLargeImage])));
        let video = SearchRequest::files("a").with_filter(Arc::new(SizeFilter::new(vec![FileSize::XxLargeVideo])));
        assert_ne!(image.signature(), video.signature());
    }

    #[test]
    fn keys_match_on_signature_and_store_identity() {
        let store: Arc<dyn CaseStore> = Arc::new(EmptyStore);
        let sources = SearchSources::new(Arc::clone(&store));
        let a = SearchKey::new(&request(), &sources);
        let b = SearchKey::new(&request(), &SearchSources::new(Arc::clone(&store)));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let other_store = SearchSources::new(Arc::new(EmptyStore));
        assert_ne!(a, SearchKey::new(&request(), &other_store));

        let more_filters = request().with_filter(Arc::new(KnownFilter));
        assert_ne!(a, SearchKey::new(&more_filters, &sources));
    }

    #[test]
    fn file_and_domain_searches_never_share_a_key() {
        let files = SearchRequest::files("u");
        let domains = SearchRequest::domains("u").sorted_by(SortingMethod::ByFileName);
        assert_ne!(files.signature(), domains.signature());
    }

    #[test]
    fn required_attributes_are_deduplicated() {
        let request = SearchRequest::files("u")
            .grouped_by(GroupingAttribute::Frequency)
            .sorted_by(SortingMethod::ByFrequency);
        assert_eq!(request.required_attributes(), vec![GroupingAttribute::Frequency]);

        let request = request.grouped_by(GroupingAttribute::FileSize);
        assert_eq!(
            request.required_attributes(),
            vec![GroupingAttribute::FileSize, GroupingAttribute::Frequency]
        );
    }

    #[test]
    fn artifacts_requests_ignore_domain_case() {
        let store: Arc<dyn CaseStore> = Arc::new(EmptyStore);
        let a = ArtifactsRequest::new(Arc::clone(&store), "Example.COM", ArtifactType::WebHistory);
        let b = ArtifactsRequest::new(Arc::clone(&store), "example.com", ArtifactType::WebHistory);
        assert_eq!(a, b);
        assert_eq!(a.domain(), "example.com");
        let c = ArtifactsRequest::new(store, "example.com", ArtifactType::WebCache);
        assert_ne!(a, c);
    }
}
