//! Criterion benchmarks for grouping, sorting and cache hits.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use discovery_core::{DiscoveryConfig, FileType};
use discovery_search::{
    DiscoveryService, FileTypeFilter, GroupSortingAlgorithm, GroupingAttribute, LoadingCache,
    SearchContext, SearchRequest, SearchResult, SearchResults, SearchSources, SortingMethod,
};
use discovery_test_helpers::{FileFixture, MemoryCaseStore};

const RESULTS: i64 = 10_000;

fn results() -> Vec<SearchResult> {
    (0..RESULTS)
        .map(|id| {
            let size = u64::try_from(id).unwrap_or(0).wrapping_mul(48_271) % 400_000_000;
            let mut fixture = FileFixture::new(id, &format!("file-{}.png", id % 977)).size(size);
            if id % 7 == 0 {
                fixture = fixture.md5(&format!("{:032x}", id % 301));
            }
            SearchResult::file(fixture.build())
        })
        .collect()
}

fn bench_group_by_size(c: &mut Criterion) {
    let input = results();
    let context = SearchContext::new();
    c.bench_function("group_and_sort_10k_by_size", |b| {
        b.iter(|| {
            let mut search = SearchResults::new(
                GroupSortingAlgorithm::ByGroupName,
                GroupingAttribute::FileSize,
                SortingMethod::ByFileName,
            );
            search.add(input.clone(), &context).unwrap();
            search.sort_groups_and_results();
            black_box(search.group_count());
        });
    });
}

fn bench_group_by_size_ordering(c: &mut Criterion) {
    let input = results();
    let context = SearchContext::new();
    c.bench_function("group_and_sort_10k_by_group_size", |b| {
        b.iter(|| {
            let mut search = SearchResults::new(
                GroupSortingAlgorithm::ByGroupSize,
                GroupingAttribute::FileSize,
                SortingMethod::ByFileSize,
            );
            search.add(input.clone(), &context).unwrap();
            search.sort_groups_and_results();
            black_box(search.result_count());
        });
    });
}

fn bench_cached_search(c: &mut Criterion) {
    let store = MemoryCaseStore::new().with_files(
        (0..2_000).map(|id| FileFixture::new(id, &format!("f{id}.png")).size(u64::try_from(id).unwrap_or(0) * 1_000).build()),
    );
    let sources = SearchSources::new(Arc::new(store));
    let service = DiscoveryService::new(DiscoveryConfig::default());
    let request = SearchRequest::files("bench")
        .with_filter(Arc::new(FileTypeFilter::new(vec![FileType::Image])))
        .grouped_by(GroupingAttribute::FileSize);
    let context = SearchContext::new();
    service.get_group_sizes(&request, &sources, &context).unwrap();

    c.bench_function("cached_group_sizes", |b| {
        b.iter(|| black_box(service.get_group_sizes(&request, &sources, &context).unwrap()));
    });
}

fn bench_cache_hits(c: &mut Criterion) {
    let cache: LoadingCache<u64, u64> = LoadingCache::new("bench", 1_000, Duration::from_millis(5));
    let context = SearchContext::new();
    for key in 0..1_000 {
        cache.get_or_load(&key, &context, |_| Ok(key * 2)).unwrap();
    }
    c.bench_function("loading_cache_hit_1000_keys", |b| {
        b.iter(|| {
            for key in 0..1_000_u64 {
                black_box(cache.get_or_load(&key, &context, |_| Ok(key)).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_group_by_size,
    bench_group_by_size_ordering,
    bench_cached_search,
    bench_cache_hits
);
criterion_main!(benches);
