//! Search cache behaviour: reuse, eviction, single-flight loading and
//! cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use discovery_core::{DiscoveryConfig, FileType};
use discovery_search::{
    DiscoveryService, FileTypeFilter, GroupKey, GroupingAttribute, SearchContext, SearchRequest,
    SearchSources, SortingMethod,
};
use discovery_test_helpers::{FileFixture, MemoryCaseStore, init_test_logging};

fn image_search() -> SearchRequest {
    SearchRequest::files("analyst").with_filter(Arc::new(FileTypeFilter::new(vec![FileType::Image])))
}

fn store_with_files(count: i64) -> MemoryCaseStore {
    MemoryCaseStore::new().with_files((1..=count).map(|id| FileFixture::new(id, &format!("f{id}.png")).build()))
}

fn config(search_cache_size: usize) -> DiscoveryConfig {
    DiscoveryConfig {
        search_cache_size,
        join_poll_interval: Duration::from_millis(5),
        ..DiscoveryConfig::default()
    }
}

#[test]
fn repeated_requests_reuse_the_cached_search() {
    init_test_logging();
    let store = Arc::new(store_with_files(3));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(10));
    let request = image_search();
    let context = SearchContext::new();

    let sizes = service.get_group_sizes(&request, &sources, &context).unwrap();
    let page = service
        .get_files_in_group(&request, &sources, &GroupKey::NoGrouping, 0, 2, &context)
        .unwrap();
    assert_eq!(sizes[&GroupKey::NoGrouping], 3);
    assert_eq!(page.len(), 2);
    assert_eq!(store.calls().find_files, 1);

    let metrics = service.cache_metrics().search;
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.loads, 1);

    let json = serde_json::to_value(service.cache_metrics()).unwrap();
    assert_eq!(json["search"]["entries"], 1);
    assert_eq!(json["artifacts"]["loads"], 0);
}

#[test]
fn different_sorting_or_store_is_a_different_search() {
    let store = Arc::new(store_with_files(3));
    let other_store = Arc::new(store_with_files(3));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let other_sources = SearchSources::new(Arc::clone(&other_store) as _);
    let service = DiscoveryService::new(config(10));
    let context = SearchContext::new();

    service.get_group_sizes(&image_search(), &sources, &context).unwrap();
    service
        .get_group_sizes(&image_search().sorted_by(SortingMethod::ByFileSize), &sources, &context)
        .unwrap();
    service.get_group_sizes(&image_search(), &other_sources, &context).unwrap();

    assert_eq!(store.calls().find_files, 2);
    assert_eq!(other_store.calls().find_files, 1);
    assert_eq!(service.cache_metrics().search.entries, 3);
}

#[test]
fn least_recently_used_search_is_evicted() {
    let store = Arc::new(store_with_files(2));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(2));
    let context = SearchContext::new();
    let by_name = image_search();
    let by_size = image_search().sorted_by(SortingMethod::ByFileSize);
    let by_path = image_search().sorted_by(SortingMethod::ByFullPath);

    service.get_group_sizes(&by_name, &sources, &context).unwrap();
    service.get_group_sizes(&by_size, &sources, &context).unwrap();
    // Touch by_name so by_size becomes the eviction candidate.
    service.get_group_sizes(&by_name, &sources, &context).unwrap();
    service.get_group_sizes(&by_path, &sources, &context).unwrap();
    assert_eq!(store.calls().find_files, 3);

    service.get_group_sizes(&by_name, &sources, &context).unwrap();
    assert_eq!(store.calls().find_files, 3);
    service.get_group_sizes(&by_size, &sources, &context).unwrap();
    assert_eq!(store.calls().find_files, 4);

    let metrics = service.cache_metrics().search;
    assert_eq!(metrics.entries, 2);
    assert_eq!(metrics.evictions, 2);
}

#[test]
fn clearing_caches_forces_a_new_search() {
    let store = Arc::new(store_with_files(1));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(10));
    let context = SearchContext::new();

    service.get_group_sizes(&image_search(), &sources, &context).unwrap();
    service.clear_caches();
    assert_eq!(service.cache_metrics().search.entries, 0);
    service.get_group_sizes(&image_search(), &sources, &context).unwrap();
    assert_eq!(store.calls().find_files, 2);
}

#[test]
fn concurrent_identical_searches_run_once() {
    let store = Arc::new(store_with_files(25).with_file_query_delay(Duration::from_millis(100)));
    let sources = Arc::new(SearchSources::new(Arc::clone(&store) as _));
    let service = Arc::new(DiscoveryService::new(config(10)));
    let request = Arc::new(image_search().grouped_by(GroupingAttribute::FileSize));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let (service, sources, request, barrier) = (
                Arc::clone(&service),
                Arc::clone(&sources),
                Arc::clone(&request),
                Arc::clone(&barrier),
            );
            thread::spawn(move || {
                barrier.wait();
                service
                    .search(&request, &sources, &SearchContext::new())
                    .unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.calls().find_files, 1);
    for grouped in &results[1..] {
        assert_eq!(grouped, &results[0]);
    }
    let metrics = service.cache_metrics().search;
    assert_eq!(metrics.loads, 1);
    assert_eq!(metrics.hits + metrics.misses, 8);
}

#[test]
fn cancelled_context_fails_before_touching_the_store() {
    let store = Arc::new(store_with_files(3));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(10));
    let context = SearchContext::new();
    context.cancel();

    let err = service.get_group_sizes(&image_search(), &sources, &context).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.error_code(), "SEARCH_CANCELLED");
    assert_eq!(store.calls().find_files, 0);
}

#[test]
fn cancellation_mid_search_caches_nothing() {
    let context = SearchContext::new();
    let trigger = context.clone();
    let armed = Arc::new(AtomicBool::new(true));
    let armed_hook = Arc::clone(&armed);
    let store = Arc::new(store_with_files(5).on_find_files(move || {
        if armed_hook.swap(false, Ordering::SeqCst) {
            trigger.cancel();
        }
    }));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(10));

    let err = service.get_group_sizes(&image_search(), &sources, &context).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(service.cache_metrics().search.entries, 0);

    let sizes = service
        .get_group_sizes(&image_search(), &sources, &SearchContext::new())
        .unwrap();
    assert_eq!(sizes[&GroupKey::NoGrouping], 5);
    assert_eq!(store.calls().find_files, 2);
}

#[test]
fn external_interrupt_flag_cancels() {
    let flag = Arc::new(AtomicBool::new(false));
    let context = SearchContext::with_interrupt(Arc::clone(&flag));
    let sources = SearchSources::new(Arc::new(store_with_files(1)));
    let service = DiscoveryService::new(config(10));

    assert!(service.get_group_sizes(&image_search(), &sources, &context).is_ok());
    flag.store(true, Ordering::SeqCst);
    let err = service
        .get_files_in_group(&image_search(), &sources, &GroupKey::NoGrouping, 0, 1, &context)
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn waiting_caller_can_cancel_without_stopping_the_leader() {
    let store = Arc::new(store_with_files(4).with_file_query_delay(Duration::from_millis(400)));
    let sources = Arc::new(SearchSources::new(Arc::clone(&store) as _));
    let service = Arc::new(DiscoveryService::new(config(10)));
    let request = Arc::new(image_search());

    let leader = {
        let (service, sources, request) = (Arc::clone(&service), Arc::clone(&sources), Arc::clone(&request));
        thread::spawn(move || service.get_group_sizes(&request, &sources, &SearchContext::new()))
    };
    // Let the leader register its in-flight load.
    thread::sleep(Duration::from_millis(100));

    let waiter_context = SearchContext::new();
    let canceller = {
        let context = waiter_context.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            context.cancel();
        })
    };
    let started = Instant::now();
    let err = service.get_group_sizes(&request, &sources, &waiter_context).unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_millis(300));
    canceller.join().unwrap();

    let sizes = leader.join().unwrap().unwrap();
    assert_eq!(sizes[&GroupKey::NoGrouping], 4);
    assert_eq!(store.calls().find_files, 1);
    assert_eq!(service.cache_metrics().search.entries, 1);
}

#[test]
fn cancelled_leader_hands_the_search_to_one_waiter() {
    let store = Arc::new(store_with_files(4).with_file_query_delay(Duration::from_millis(150)));
    let sources = Arc::new(SearchSources::new(Arc::clone(&store) as _));
    let service = Arc::new(DiscoveryService::new(config(10)));
    let request = Arc::new(image_search());

    let leader_context = SearchContext::new();
    let leader = {
        let (service, sources, request) = (Arc::clone(&service), Arc::clone(&sources), Arc::clone(&request));
        let context = leader_context.clone();
        thread::spawn(move || service.get_group_sizes(&request, &sources, &context))
    };
    thread::sleep(Duration::from_millis(20));

    let waiters: Vec<_> = (0..6)
        .map(|_| {
            let (service, sources, request) = (Arc::clone(&service), Arc::clone(&sources), Arc::clone(&request));
            thread::spawn(move || service.get_group_sizes(&request, &sources, &SearchContext::new()))
        })
        .collect();
    thread::sleep(Duration::from_millis(30));
    leader_context.cancel();

    assert!(leader.join().unwrap().unwrap_err().is_cancelled());
    for waiter in waiters {
        let sizes = waiter.join().unwrap().unwrap();
        assert_eq!(sizes[&GroupKey::NoGrouping], 4);
    }
    assert_eq!(store.calls().find_files, 2);
    let metrics = service.cache_metrics().search;
    assert_eq!(metrics.loads, 1);
    assert_eq!(metrics.joined, 5);
    assert_eq!(metrics.entries, 1);
}

#[test]
fn cancellation_stops_the_file_row_stream() {
    let context = SearchContext::new();
    let trigger = context.clone();
    let store = Arc::new(store_with_files(6).on_file_row(move |row| {
        if row.id == 3 {
            trigger.cancel();
        }
    }));
    let sources = SearchSources::new(Arc::clone(&store) as _);
    let service = DiscoveryService::new(config(10));

    let err = service.get_group_sizes(&image_search(), &sources, &context).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(store.calls().file_rows, 3);
    assert_eq!(service.cache_metrics().search.entries, 0);
}
