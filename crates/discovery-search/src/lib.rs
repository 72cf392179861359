//! Discovery search engine.
//!
//! This crate provides:
//! - Search filters that compile to case store clauses or run in memory
//! - Grouping attributes, group keys and result sorting
//! - File and domain search pipelines
//! - Size-bounded, single-flight caches for searches, domain artifacts
//!   and domain thumbnails
//! - Cooperative cancellation through [`SearchContext`]
//!
//! # Entry point
//!
//! Callers build a [`SearchRequest`], pair it with [`SearchSources`] and
//! page through the groups via [`DiscoveryService`]:
//!
//! ```ignore
//! let service = DiscoveryService::new(DiscoveryConfig::default());
//! let request = SearchRequest::files("analyst")
//!     .with_filter(Arc::new(FileTypeFilter::new(vec![FileType::Image])))
//!     .grouped_by(GroupingAttribute::FileSize);
//! let sizes = service.get_group_sizes(&request, &sources, &SearchContext::new())?;
//! ```

#![forbid(unsafe_code)]

pub mod artifacts;
pub mod attributes;
pub mod cache;
pub mod coalesce;
pub mod context;
pub mod domain_query;
pub mod error;
pub mod filters;
pub mod group_key;
pub mod grouping;
pub mod query;
pub mod request;
pub mod results;
pub mod service;
pub mod sorter;
pub mod store;
pub mod summary;
pub mod thumbnails;

pub use artifacts::{ArtifactList, artifact_mentions_domain, load_artifacts};
pub use attributes::{AttributeType, GroupingAttribute, enrich_all};
pub use cache::{CacheMetricsSnapshot, LoadingCache};
pub use coalesce::{CoalesceMap, CoalesceMetrics, CoalesceOutcome};
pub use context::{SearchContext, SearchEnv};
pub use error::{CentralRepoError, DiscoveryError, DiscoveryResult, StoreError};
pub use filters::{
    ArtifactDateRangeFilter, ArtifactTypeFilter, DataSourceFilter, DataSourceRef, FileTypeFilter,
    FilterRef, FrequencyFilter, HashSetFilter, InterestingFileSetFilter, KeywordListFilter,
    KnownAccountTypeFilter, KnownFilter, NotableFilter, ObjectDetectionFilter, ParentFilter,
    ParentSearchTerm, PreviouslyNotableFilter, ScoreFilter, SearchFilter, SizeFilter, TagNameRef,
    TagsFilter, UserCreatedFilter,
};
pub use group_key::{ActivityDay, GroupKey, GroupKeyKind, NameList};
pub use grouping::{Group, GroupSortingAlgorithm, GroupedResults, SearchResults};
pub use query::{combined_where_clause, group_and_sort, run_queries, run_search};
pub use request::{
    ArtifactsRequest, SearchKey, SearchRequest, SearchSources, SearchTarget, ThumbnailRequest,
};
pub use results::{DomainResult, EMPTY_CONTENT_MD5, FileResult, SearchResult};
pub use service::{DiscoveryCacheMetrics, DiscoveryService};
pub use sorter::{ResultComparator, ResultsSorter, SortingMethod};
pub use store::{
    Artifact, ArtifactAttribute, CaseStore, CentralRepoResult, CentralRepository, DirectoryRef,
    FileRow, StoreResult, StoreRow, Value,
};
pub use summary::{NO_BYTES, NO_PREVIEW, TextSummarizer, TextSummary};
pub use thumbnails::{NoThumbnails, Thumbnail, ThumbnailProvider};
