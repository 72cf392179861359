//! The public surface of the discovery engine.
//!
//! A [`DiscoveryService`] owns the search, artifacts and thumbnail caches
//! for one application session. Every operation takes the caller's
//! [`SearchContext`]; a cancelled context makes the operation return
//! `DiscoveryError::Cancelled` and never caches a partial result.

use std::sync::Arc;

use discovery_core::{ArtifactType, DiscoveryConfig};
use indexmap::IndexMap;
use serde::Serialize;

use crate::artifacts::{ArtifactList, load_artifacts};
use crate::cache::{CacheMetricsSnapshot, LoadingCache};
use crate::context::{SearchContext, SearchEnv};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::group_key::GroupKey;
use crate::grouping::GroupedResults;
use crate::query::run_search;
use crate::request::{ArtifactsRequest, SearchKey, SearchRequest, SearchSources, SearchTarget, ThumbnailRequest};
use crate::results::{DomainResult, FileResult, SearchResult};
use crate::store::{Artifact, CaseStore, FileRow};
use crate::summary::{TextSummarizer, TextSummary, summarize};
use crate::thumbnails::{NoThumbnails, Thumbnail, ThumbnailProvider, load_thumbnail};

/// Counters for every cache the service owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryCacheMetrics {
    pub search: CacheMetricsSnapshot,
    pub artifacts: CacheMetricsSnapshot,
    pub thumbnails: CacheMetricsSnapshot,
}

pub struct DiscoveryService {
    config: DiscoveryConfig,
    search_cache: LoadingCache<SearchKey, Arc<GroupedResults>>,
    artifacts_cache: LoadingCache<ArtifactsRequest, ArtifactList>,
    thumbnail_cache: LoadingCache<ThumbnailRequest, Thumbnail>,
    thumbnail_provider: Arc<dyn ThumbnailProvider>,
    summarizer: Option<Arc<dyn TextSummarizer>>,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(config: DiscoveryConfig) -> Self {
        let poll = config.join_poll_interval;
        Self {
            search_cache: LoadingCache::new("search", config.search_cache_size, poll),
            artifacts_cache: LoadingCache::new("artifacts", config.artifacts_cache_size, poll),
            thumbnail_cache: LoadingCache::new("thumbnails", config.thumbnail_cache_size, poll),
            thumbnail_provider: Arc::new(NoThumbnails),
            summarizer: None,
            config,
        }
    }

    #[must_use]
    pub fn with_thumbnail_provider(mut self, provider: Arc<dyn ThumbnailProvider>) -> Self {
        self.thumbnail_provider = provider;
        self
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn TextSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Searches
    // -------------------------------------------------------------------------

    /// Grouped results for `request`, from the cache or a fresh search.
    pub fn search(
        &self,
        request: &SearchRequest,
        sources: &SearchSources,
        context: &SearchContext,
    ) -> DiscoveryResult<Arc<GroupedResults>> {
        let key = SearchKey::new(request, sources);
        self.search_cache.get_or_load(&key, context, |ctx| {
            let env = SearchEnv::new(
                sources.store.as_ref(),
                sources.central_repo.as_deref(),
                &self.config,
                ctx,
            );
            run_search(request, &env).map(Arc::new)
        })
    }

    /// Size of every group, in group display order.
    pub fn get_group_sizes(
        &self,
        request: &SearchRequest,
        sources: &SearchSources,
        context: &SearchContext,
    ) -> DiscoveryResult<IndexMap<GroupKey, usize>> {
        let grouped = self.search(request, sources, context)?;
        Ok(grouped
            .iter()
            .map(|(key, results)| (key.clone(), results.len()))
            .collect())
    }

    /// One page of a file search group.
    pub fn get_files_in_group(
        &self,
        request: &SearchRequest,
        sources: &SearchSources,
        group: &GroupKey,
        start: usize,
        count: usize,
        context: &SearchContext,
    ) -> DiscoveryResult<Vec<FileResult>> {
        expect_target(request, SearchTarget::Files)?;
        let page = self.results_in_group(request, sources, group, start, count, context)?;
        Ok(page
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::File(file) => Some(file),
                SearchResult::Domain(_) => None,
            })
            .collect())
    }

    /// One page of a domain search group.
    pub fn get_domains_in_group(
        &self,
        request: &SearchRequest,
        sources: &SearchSources,
        group: &GroupKey,
        start: usize,
        count: usize,
        context: &SearchContext,
    ) -> DiscoveryResult<Vec<DomainResult>> {
        expect_target(request, SearchTarget::Domains)?;
        let page = self.results_in_group(request, sources, group, start, count, context)?;
        Ok(page
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::Domain(domain) => Some(domain),
                SearchResult::File(_) => None,
            })
            .collect())
    }

    fn results_in_group(
        &self,
        request: &SearchRequest,
        sources: &SearchSources,
        group: &GroupKey,
        start: usize,
        count: usize,
        context: &SearchContext,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        let mut grouped = self.search(request, sources, context)?;
        if !grouped.contains_key(group) {
            tracing::info!(group = %group, "group not in cached results, searching again");
            self.search_cache.invalidate(&SearchKey::new(request, sources));
            grouped = self.search(request, sources, context)?;
        }
        let Some(results) = grouped.get(group) else {
            tracing::warn!(group = %group, "group does not exist in search results");
            return Ok(Vec::new());
        };
        if start > results.len() {
            tracing::warn!(
                group = %group,
                group_size = results.len(),
                start,
                "starting entry is past the end of the group"
            );
            return Ok(Vec::new());
        }
        let end = start.saturating_add(count).min(results.len());
        Ok(results[start..end].to_vec())
    }

    // -------------------------------------------------------------------------
    // Domain details
    // -------------------------------------------------------------------------

    /// Artifacts of one type mentioning a domain.
    pub fn get_artifacts(
        &self,
        request: &ArtifactsRequest,
        context: &SearchContext,
    ) -> DiscoveryResult<ArtifactList> {
        self.artifacts_cache
            .get_or_load(request, context, |ctx| load_artifacts(request, ctx))
    }

    /// Representative thumbnail for a domain, or the placeholder.
    pub fn get_thumbnail(
        &self,
        request: &ThumbnailRequest,
        context: &SearchContext,
    ) -> DiscoveryResult<Thumbnail> {
        self.thumbnail_cache.get_or_load(request, context, |ctx| {
            load_thumbnail(request, self.thumbnail_provider.as_ref(), ctx, |artifacts, ctx| {
                self.get_artifacts(artifacts, ctx)
            })
        })
    }

    /// Every web artifact mentioning `domain`, grouped by artifact type.
    pub fn get_all_artifacts_for_domain(
        &self,
        store: &Arc<dyn CaseStore>,
        domain: &str,
        context: &SearchContext,
    ) -> DiscoveryResult<Vec<Artifact>> {
        let mut all = Vec::new();
        for artifact_type in ArtifactType::DOMAIN_TYPES {
            context.check("domain artifacts")?;
            let request = ArtifactsRequest::new(Arc::clone(store), domain, artifact_type);
            all.extend(self.get_artifacts(&request, context)?.iter().cloned());
        }
        Ok(all)
    }

    // -------------------------------------------------------------------------
    // Previews
    // -------------------------------------------------------------------------

    /// Text preview of a document. Never fails.
    #[must_use]
    pub fn summarize(&self, store: &dyn CaseStore, file: &FileRow) -> TextSummary {
        summarize(
            store,
            self.summarizer.as_deref(),
            file,
            self.config.summary_prefix_bytes,
        )
    }

    // -------------------------------------------------------------------------
    // Cache management
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn cache_metrics(&self) -> DiscoveryCacheMetrics {
        DiscoveryCacheMetrics {
            search: self.search_cache.metrics(),
            artifacts: self.artifacts_cache.metrics(),
            thumbnails: self.thumbnail_cache.metrics(),
        }
    }

    pub fn clear_caches(&self) {
        self.search_cache.clear();
        self.artifacts_cache.clear();
        self.thumbnail_cache.clear();
        tracing::debug!("discovery caches cleared");
    }
}

impl std::fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("config", &self.config)
            .field("summarizer", &self.summarizer.is_some())
            .finish_non_exhaustive()
    }
}

fn expect_target(request: &SearchRequest, expected: SearchTarget) -> DiscoveryResult<()> {
    if request.target == expected {
        Ok(())
    } else {
        Err(DiscoveryError::invalid_filters(format!(
            "{} page requested for a {} search",
            expected.as_str(),
            request.target.as_str()
        )))
    }
}
