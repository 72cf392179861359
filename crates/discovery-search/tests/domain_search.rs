//! Domain searches, domain artifacts, thumbnails and previews.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use discovery_core::{ArtifactType, AttributeKind, CorrelationKind, DiscoveryConfig, Frequency, PageViews};
use discovery_search::{
    ArtifactDateRangeFilter, ArtifactsRequest, CaseStore, DiscoveryService, DomainResult, FileRow,
    FrequencyFilter, GroupKey, GroupingAttribute, KnownAccountTypeFilter, NO_BYTES, NO_PREVIEW,
    NameList, SearchContext, SearchRequest, SearchSources, SortingMethod, StoreError, StoreResult,
    TextSummarizer, TextSummary, Thumbnail, ThumbnailProvider, ThumbnailRequest,
};
use discovery_test_helpers::{
    ArtifactFixture, DomainRowFixture, FileFixture, MemoryCaseStore, MemoryCentralRepository,
    init_test_logging,
};

const DAY: i64 = 86_400;

fn domain_store() -> MemoryCaseStore {
    MemoryCaseStore::new()
        .with_latest_activity(100 * DAY)
        .with_domain_row(DomainRowFixture::new("example.com", 10 * DAY, 90 * DAY).page_views(1_200, 30).build())
        .with_domain_row(DomainRowFixture::new("localhost", 10 * DAY, 95 * DAY).page_views(900, 900).build())
        .with_domain_row(
            DomainRowFixture::new("mail.test", 20 * DAY, 100 * DAY)
                .page_views(40, 40)
                .account_type("Email")
                .build(),
        )
        .with_domain_row(DomainRowFixture::new("  ", 20 * DAY, 100 * DAY).build())
        .with_domain_row(DomainRowFixture::new("quiet.org", 20 * DAY, 21 * DAY).page_views(3, 0).build())
}

fn names(domains: &[DomainResult]) -> Vec<&str> {
    domains.iter().map(|d| d.domain.as_str()).collect()
}

#[test]
fn banned_and_blank_domains_never_appear() {
    init_test_logging();
    let sources = SearchSources::new(Arc::new(domain_store()));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst");
    let domains = service
        .get_domains_in_group(&request, &sources, &GroupKey::NoGrouping, 0, 10, &SearchContext::new())
        .unwrap();
    assert_eq!(names(&domains), vec!["example.com", "mail.test", "quiet.org"]);
}

#[test]
fn recent_window_ends_at_the_latest_case_activity() {
    let store = Arc::new(domain_store());
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(DiscoveryConfig::default());
    service
        .get_group_sizes(&SearchRequest::domains("analyst"), &sources, &SearchContext::new())
        .unwrap();

    let cutoff = 100 * DAY - 60 * DAY;
    let queries = store.queries();
    assert!(queries[0].contains("AS latest_activity"));
    assert!(queries[1].contains(&format!("activity.activity_date >= {cutoff}")));
}

#[test]
fn date_range_filter_constrains_the_aggregate() {
    let store = Arc::new(domain_store());
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst").with_filter(Arc::new(ArtifactDateRangeFilter::new(5 * DAY, 50 * DAY)));
    service
        .get_group_sizes(&request, &sources, &SearchContext::new())
        .unwrap();
    let aggregate = store.queries().pop().unwrap();
    assert!(aggregate.ends_with(&format!(
        "HAVING (MAX(activity.activity_date) >= {} AND MIN(activity.activity_date) <= {})",
        5 * DAY,
        50 * DAY
    )));
}

#[test]
fn date_ranges_within_one_day_are_cached_separately() {
    let store = Arc::new(domain_store());
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let context = SearchContext::new();

    for end in [5 * DAY + 3_600, 5 * DAY + 7_200] {
        let request = SearchRequest::domains("analyst").with_filter(Arc::new(ArtifactDateRangeFilter::new(5 * DAY, end)));
        service.get_group_sizes(&request, &sources, &context).unwrap();
    }
    let aggregates = store
        .queries()
        .iter()
        .filter(|q| q.contains("AS activity_start"))
        .count();
    assert_eq!(aggregates, 2);
    assert_eq!(service.cache_metrics().search.entries, 2);
}

#[test]
fn page_view_groups_and_sorting() {
    let sources = SearchSources::new(Arc::new(domain_store()));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst")
        .grouped_by(GroupingAttribute::PageViews)
        .sorted_by(SortingMethod::ByPageViews);
    let sizes = service
        .get_group_sizes(&request, &sources, &SearchContext::new())
        .unwrap();
    assert_eq!(
        sizes.keys().cloned().collect::<Vec<_>>(),
        vec![
            GroupKey::PageViews { views: PageViews::Over1000 },
            GroupKey::PageViews { views: PageViews::UpTo50 },
            GroupKey::PageViews { views: PageViews::UpTo10 },
        ]
    );
    assert_eq!(sizes.keys().next().unwrap().display_name(), "1000+ page views");
}

#[test]
fn known_account_type_filter_keeps_account_domains() {
    let sources = SearchSources::new(Arc::new(domain_store()));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst").with_filter(Arc::new(KnownAccountTypeFilter));
    let domains = service
        .get_domains_in_group(&request, &sources, &GroupKey::NoGrouping, 0, 10, &SearchContext::new())
        .unwrap();
    assert_eq!(names(&domains), vec!["mail.test"]);
    assert_eq!(domains[0].account_types, vec!["Email".to_string()]);
}

#[test]
fn domain_frequency_skips_values_that_fail_normalization() {
    let repo = Arc::new(
        MemoryCentralRepository::new()
            .with_count(CorrelationKind::Domain, "example.com", 40)
            .with_unnormalizable("quiet.org"),
    );
    let sources = SearchSources::new(Arc::new(domain_store())).with_central_repo(repo);
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst").with_filter(Arc::new(FrequencyFilter::new(vec![
        Frequency::Common,
        Frequency::Unknown,
    ])));
    let domains = service
        .get_domains_in_group(&request, &sources, &GroupKey::NoGrouping, 0, 10, &SearchContext::new())
        .unwrap();
    // mail.test is unseen by the repository and therefore unique.
    assert_eq!(names(&domains), vec!["example.com", "quiet.org"]);
}

#[test]
fn domain_categories_group_domains() {
    let store = domain_store().with_artifact(
        ArtifactFixture::new(500, ArtifactType::WebCategorization)
            .domain("Example.com")
            .attribute(AttributeKind::Name, "Search Engine")
            .build(),
    );
    let sources = SearchSources::new(Arc::new(store));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::domains("analyst").grouped_by(GroupingAttribute::DomainCategory);
    let sizes = service
        .get_group_sizes(&request, &sources, &SearchContext::new())
        .unwrap();
    let keys: Vec<String> = sizes.keys().map(GroupKey::display_name).collect();
    assert_eq!(keys, vec!["Search Engine".to_string(), "Uncategorized".to_string()]);
    assert_eq!(
        sizes[&GroupKey::DomainCategory { categories: NameList::new(["Search Engine"]) }],
        1
    );
}

// -----------------------------------------------------------------------------
// Artifacts
// -----------------------------------------------------------------------------

fn artifact_store() -> MemoryCaseStore {
    MemoryCaseStore::new()
        .with_artifact(ArtifactFixture::new(1, ArtifactType::WebHistory).domain("Example.com").build())
        .with_artifact(
            ArtifactFixture::new(2, ArtifactType::WebHistory)
                .url("https://WWW.EXAMPLE.COM/login")
                .build(),
        )
        .with_artifact(ArtifactFixture::new(3, ArtifactType::WebHistory).domain("other.net").build())
        .with_artifact(ArtifactFixture::new(4, ArtifactType::WebBookmark).domain("example.com").build())
}

#[test]
fn artifacts_match_domain_or_url_and_are_cached() {
    let store = Arc::new(artifact_store());
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = ArtifactsRequest::new(Arc::clone(&store) as _, "EXAMPLE.com", ArtifactType::WebHistory);
    let context = SearchContext::new();

    let first = service.get_artifacts(&request, &context).unwrap();
    let ids: Vec<i64> = first.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let again = service.get_artifacts(&request, &context).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(store.calls().artifacts_of_type, 1);
    assert_eq!(service.cache_metrics().artifacts.hits, 1);
}

#[test]
fn all_artifacts_for_domain_walk_every_web_type() {
    let store: Arc<dyn CaseStore> = Arc::new(artifact_store());
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let all = service
        .get_all_artifacts_for_domain(&store, "example.com", &SearchContext::new())
        .unwrap();
    let ids: Vec<i64> = all.iter().map(|a| a.id).collect();
    // Bookmarks come before history in the web type order.
    assert_eq!(ids, vec![4, 1, 2]);
    assert_eq!(service.cache_metrics().artifacts.entries, ArtifactType::DOMAIN_TYPES.len());
}

#[test]
fn artifact_failures_name_the_artifact_type() {
    let store = Arc::new(artifact_store().failing_artifact_queries("table locked"));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = ArtifactsRequest::new(store, "example.com", ArtifactType::WebHistory);
    let err = service.get_artifacts(&request, &SearchContext::new()).unwrap_err();
    assert_eq!(err.error_code(), "CASE_STORE_ERROR");
    assert!(err.to_string().starts_with("Web History"));
}

// -----------------------------------------------------------------------------
// Thumbnails
// -----------------------------------------------------------------------------

/// Renders every file except ones named `broken*`, counting calls.
#[derive(Default)]
struct CountingProvider {
    calls: AtomicUsize,
}

impl ThumbnailProvider for CountingProvider {
    fn thumbnail(&self, file: &FileRow, icon_size: u32) -> Option<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if file.name.starts_with("broken") {
            return None;
        }
        Some(vec![u8::try_from(icon_size).unwrap_or(u8::MAX)])
    }
}

fn thumbnail_store() -> MemoryCaseStore {
    MemoryCaseStore::new()
        .with_files([
            FileFixture::new(10, "favicon.ico").mime("image/x-icon").crtime(900).build(),
            FileFixture::new(11, "older.png").crtime(100).build(),
            FileFixture::new(12, "broken-newest.png").crtime(800).build(),
            FileFixture::new(13, "notes.txt").mime("text/plain").crtime(1_000).build(),
            FileFixture::new(20, "small-cache.png").size(10).build(),
            FileFixture::new(21, "big-cache.jpg").mime("image/jpeg").size(90_000).build(),
        ])
        .with_artifact(ArtifactFixture::new(1, ArtifactType::WebDownload).domain("example.com").path_id(10).build())
        .with_artifact(ArtifactFixture::new(2, ArtifactType::WebDownload).domain("example.com").path_id(11).build())
        .with_artifact(ArtifactFixture::new(3, ArtifactType::WebDownload).domain("example.com").path_id(12).build())
        .with_artifact(ArtifactFixture::new(4, ArtifactType::WebDownload).domain("example.com").path_id(13).build())
        .with_artifact(ArtifactFixture::new(5, ArtifactType::WebCache).domain("cache.example").path_id(20).build())
        .with_artifact(ArtifactFixture::new(6, ArtifactType::WebCache).domain("cache.example").path_id(21).build())
}

#[test]
fn thumbnail_prefers_newest_renderable_download_over_icons() {
    let store = Arc::new(thumbnail_store());
    let provider = Arc::new(CountingProvider::default());
    let service = DiscoveryService::new(DiscoveryConfig::default()).with_thumbnail_provider(Arc::clone(&provider) as _);
    let request = ThumbnailRequest::new(store, "example.com", 32);
    let context = SearchContext::new();

    let thumbnail = service.get_thumbnail(&request, &context).unwrap();
    assert_eq!(thumbnail.source_file_id(), Some(11));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let again = service.get_thumbnail(&request, &context).unwrap();
    assert_eq!(again, thumbnail);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn thumbnail_falls_back_to_largest_cache_entry() {
    let store = Arc::new(thumbnail_store());
    let service = DiscoveryService::new(DiscoveryConfig::default())
        .with_thumbnail_provider(Arc::new(CountingProvider::default()));
    let request = ThumbnailRequest::new(store, "cache.example", 32);
    let thumbnail = service.get_thumbnail(&request, &SearchContext::new()).unwrap();
    assert_eq!(thumbnail.source_file_id(), Some(21));
}

#[test]
fn thumbnail_without_provider_is_the_placeholder() {
    let store = Arc::new(thumbnail_store());
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = ThumbnailRequest::new(store, "example.com", 32);
    let thumbnail = service.get_thumbnail(&request, &SearchContext::new()).unwrap();
    assert_eq!(thumbnail, Thumbnail::Unsupported);
    // Both artifact lists were loaded through the artifacts cache.
    assert_eq!(service.cache_metrics().artifacts.entries, 2);
}

// -----------------------------------------------------------------------------
// Previews
// -----------------------------------------------------------------------------

struct FailingSummarizer;

impl TextSummarizer for FailingSummarizer {
    fn summarize(&self, _store: &dyn CaseStore, _file: &FileRow, _length: usize) -> StoreResult<TextSummary> {
        Err(StoreError::Content("parser crashed".to_string()))
    }
}

struct BlankSummarizer;

impl TextSummarizer for BlankSummarizer {
    fn summarize(&self, _store: &dyn CaseStore, _file: &FileRow, _length: usize) -> StoreResult<TextSummary> {
        Ok(TextSummary::text_only("   "))
    }
}

#[test]
fn default_preview_reads_the_start_of_the_file() {
    let doc = FileFixture::new(1, "memo.txt").mime("text/plain").build();
    let empty = FileFixture::new(2, "empty.txt").mime("text/plain").build();
    let unreadable = FileFixture::new(3, "gone.txt").mime("text/plain").build();
    let store = MemoryCaseStore::new()
        .with_content(1, "Quarterly\n\n  results\tattached")
        .with_content(2, Vec::new());
    let service = DiscoveryService::new(DiscoveryConfig::default());

    assert_eq!(service.summarize(&store, &doc).text, "Quarterly results attached");
    assert_eq!(service.summarize(&store, &empty).text, NO_BYTES);
    assert_eq!(service.summarize(&store, &unreadable).text, NO_PREVIEW);
}

#[test]
fn summarizer_failure_and_blank_output_are_handled() {
    let doc = FileFixture::new(1, "memo.txt").mime("text/plain").build();
    let store = MemoryCaseStore::new().with_content(1, "fallback text");

    let failing = DiscoveryService::new(DiscoveryConfig::default()).with_summarizer(Arc::new(FailingSummarizer));
    assert_eq!(failing.summarize(&store, &doc).text, NO_PREVIEW);

    let blank = DiscoveryService::new(DiscoveryConfig::default()).with_summarizer(Arc::new(BlankSummarizer));
    assert_eq!(blank.summarize(&store, &doc).text, "fallback text");
}
