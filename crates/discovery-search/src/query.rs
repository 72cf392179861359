//! The search pipeline.
//!
//! 1. Fetch candidate rows: files through the combined store-level filter
//!    clause, domains through the aggregate domain query.
//! 2. Run in-memory filters in declaration order, stopping as soon as the
//!    working set is empty.
//! 3. Enrich results for the grouping attribute and the sort method.
//! 4. Group and sort.

use std::collections::HashMap;
use std::time::Instant;

use crate::attributes::enrich_all;
use crate::context::SearchEnv;
use crate::domain_query::run_domain_query;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::filters::FilterRef;
use crate::grouping::{GroupedResults, SearchResults};
use crate::request::{SearchRequest, SearchTarget};
use crate::results::{FileResult, SearchResult};
use crate::store::FileRow;

/// AND together every non-empty store-level clause.
///
/// Fails with `InvalidFilters` when no filter contributes one: a file
/// search must never scan the whole case unconstrained.
pub fn combined_where_clause(filters: &[FilterRef]) -> DiscoveryResult<String> {
    let clauses: Vec<String> = filters
        .iter()
        .map(|f| f.where_clause())
        .filter(|clause| !clause.trim().is_empty())
        .map(|clause| format!("({clause})"))
        .collect();
    if clauses.is_empty() {
        return Err(DiscoveryError::invalid_filters(
            "at least one filter must constrain the case store query",
        ));
    }
    Ok(clauses.join(" AND "))
}

/// Folds file rows into results as they stream in. Rows with the same
/// content become extra instances of one result; output follows first-seen
/// order.
#[derive(Default)]
struct FileResultsBuilder {
    results: Vec<SearchResult>,
    by_hash: HashMap<String, usize>,
}

impl FileResultsBuilder {
    fn push(&mut self, row: FileRow) {
        let file = FileResult::new(row);
        let Some(hash) = file.dedup_key() else {
            self.results.push(SearchResult::File(file));
            return;
        };
        if let Some(&idx) = self.by_hash.get(&hash) {
            if let Some(existing) = self.results[idx].as_file_mut() {
                existing.add_duplicate(file.first_instance().clone());
            }
        } else {
            self.by_hash.insert(hash, self.results.len());
            self.results.push(SearchResult::File(file));
        }
    }

    fn finish(self) -> Vec<SearchResult> {
        self.results
    }
}

/// Fetch file results matching every store-level filter.
pub fn run_file_query(filters: &[FilterRef], env: &SearchEnv<'_>) -> DiscoveryResult<Vec<SearchResult>> {
    let where_clause = combined_where_clause(filters)?;
    env.context.check("file search")?;
    let mut builder = FileResultsBuilder::default();
    let rows = env.find_files("file search", &where_clause, |row| builder.push(row))?;
    tracing::debug!(rows, "file rows fetched");
    Ok(builder.finish())
}

/// Apply every in-memory filter in order. Empty input, or a filter that
/// empties the set, ends the pass early with an empty result.
pub fn apply_alternate_filters(
    filters: &[FilterRef],
    mut results: Vec<SearchResult>,
    env: &SearchEnv<'_>,
) -> DiscoveryResult<Vec<SearchResult>> {
    for filter in filters.iter().filter(|f| f.uses_alternate_filter()) {
        if results.is_empty() {
            break;
        }
        env.context.check("in-memory filters")?;
        let before = results.len();
        results = filter.apply_alternate_filter(results, env)?;
        tracing::debug!(
            filter = %filter.description(),
            before,
            after = results.len(),
            "in-memory filter applied"
        );
    }
    Ok(results)
}

/// Candidate results for `request`, after every filter.
pub fn run_queries(request: &SearchRequest, env: &SearchEnv<'_>) -> DiscoveryResult<Vec<SearchResult>> {
    let results = match request.target {
        SearchTarget::Files => run_file_query(&request.filters, env)?,
        SearchTarget::Domains => run_domain_query(&request.filters, env)?,
    };
    apply_alternate_filters(&request.filters, results, env)
}

/// Enrich, group and sort `results` as `request` asks.
pub fn group_and_sort(
    request: &SearchRequest,
    mut results: Vec<SearchResult>,
    env: &SearchEnv<'_>,
) -> DiscoveryResult<GroupedResults> {
    if results.is_empty() {
        return Ok(GroupedResults::new());
    }
    enrich_all(&request.required_attributes(), &mut results, env)?;
    let mut search = SearchResults::new(request.group_sorting, request.grouping, request.sorting);
    search.add(results, env.context)?;
    search.sort_groups_and_results();
    Ok(search.into_grouped_results())
}

/// Run a full search and return the grouped, sorted results.
pub fn run_search(request: &SearchRequest, env: &SearchEnv<'_>) -> DiscoveryResult<GroupedResults> {
    let started = Instant::now();
    tracing::info!(
        search_target = request.target.as_str(),
        filters = request.filters.len(),
        grouping = request.grouping.display_name(),
        sorting = request.sorting.display_name(),
        "search started"
    );
    let results = run_queries(request, env)?;
    let grouped = group_and_sort(request, results, env)?;
    tracing::info!(
        search_target = request.target.as_str(),
        groups = grouped.len(),
        results = grouped.values().map(Vec::len).sum::<usize>(),
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "search finished"
    );
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FrequencyFilter, KnownFilter, SizeFilter};
    use discovery_core::{FileSize, Frequency};
    use std::sync::Arc;

    #[test]
    fn combined_clause_ands_non_empty_parts() {
        let filters: Vec<FilterRef> = vec![
            Arc::new(SizeFilter::new(vec![FileSize::XSmallImage])),
            Arc::new(FrequencyFilter::new(vec![Frequency::Rare])),
            Arc::new(KnownFilter),
        ];
        assert_eq!(
            combined_where_clause(&filters).unwrap(),
            "((size > '0' AND size <= '16000')) AND (known!=1)"
        );
    }

    #[test]
    fn in_memory_filters_alone_are_invalid() {
        let filters: Vec<FilterRef> = vec![Arc::new(FrequencyFilter::new(vec![Frequency::Rare]))];
        let err = combined_where_clause(&filters).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTERS");
        assert!(combined_where_clause(&[]).is_err());
    }
}
