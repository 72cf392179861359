//! Bucketing results into groups and ordering both levels.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attributes::GroupingAttribute;
use crate::context::SearchContext;
use crate::error::DiscoveryResult;
use crate::group_key::GroupKey;
use crate::results::SearchResult;
use crate::sorter::{ResultsSorter, SortingMethod};

/// Fully sorted search output: groups in display order, each holding its
/// results in display order.
pub type GroupedResults = IndexMap<GroupKey, Vec<SearchResult>>;

/// How sibling groups are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSortingAlgorithm {
    /// Natural key order.
    ByGroupName,
    /// Largest group first, key order on ties.
    ByGroupSize,
}

impl GroupSortingAlgorithm {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ByGroupName => "Group Name",
            Self::ByGroupSize => "Group Size",
        }
    }
}

impl fmt::Display for GroupSortingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// One bucket of results sharing a key.
#[derive(Debug, Clone)]
pub struct Group {
    key: GroupKey,
    display_name: String,
    algorithm: GroupSortingAlgorithm,
    results: Vec<SearchResult>,
    // content hash -> index into `results`
    by_hash: HashMap<String, usize>,
}

impl Group {
    #[must_use]
    pub fn new(algorithm: GroupSortingAlgorithm, key: GroupKey) -> Self {
        Self {
            display_name: key.display_name(),
            key,
            algorithm,
            results: Vec::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Add a result. A file with the same content as one already in the
    /// group is merged into it as another instance.
    pub fn add_result(&mut self, result: SearchResult) {
        if let SearchResult::File(file) = &result
            && let Some(hash) = file.dedup_key()
        {
            if let Some(&idx) = self.by_hash.get(&hash) {
                if let (Some(existing), SearchResult::File(file)) =
                    (self.results[idx].as_file_mut(), result)
                {
                    existing.absorb(file);
                }
                return;
            }
            self.by_hash.insert(hash, self.results.len());
        }
        self.results.push(result);
    }

    pub fn sort_results(&mut self, sorter: &ResultsSorter) {
        sorter.sort(&mut self.results);
        self.by_hash.clear();
        for (idx, result) in self.results.iter().enumerate() {
            if let Some(hash) = result.as_file().and_then(|f| f.dedup_key()) {
                self.by_hash.insert(hash, idx);
            }
        }
    }

    #[must_use]
    pub const fn key(&self) -> &GroupKey {
        &self.key
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Order against a sibling group using this group's algorithm.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match self.algorithm {
            GroupSortingAlgorithm::ByGroupName => self.key.cmp(&other.key),
            GroupSortingAlgorithm::ByGroupSize => other
                .len()
                .cmp(&self.len())
                .then_with(|| self.key.cmp(&other.key)),
        }
    }

    fn into_parts(self) -> (GroupKey, Vec<SearchResult>) {
        (self.key, self.results)
    }
}

// ---------------------------------------------------------------------------
// SearchResults
// ---------------------------------------------------------------------------

/// Accumulates results into groups for one search.
#[derive(Debug)]
pub struct SearchResults {
    algorithm: GroupSortingAlgorithm,
    attribute: GroupingAttribute,
    sorter: ResultsSorter,
    groups: IndexMap<GroupKey, Group>,
}

impl SearchResults {
    #[must_use]
    pub fn new(
        algorithm: GroupSortingAlgorithm,
        attribute: GroupingAttribute,
        method: SortingMethod,
    ) -> Self {
        Self {
            algorithm,
            attribute,
            sorter: ResultsSorter::new(method),
            groups: IndexMap::new(),
        }
    }

    /// Place each result in the group for its key.
    pub fn add(&mut self, results: Vec<SearchResult>, context: &SearchContext) -> DiscoveryResult<()> {
        let attribute = self.attribute.attribute();
        for result in results {
            context.check("grouping")?;
            let key = attribute.group_key(&result)?;
            self.groups
                .entry(key)
                .or_insert_with_key(|key| Group::new(self.algorithm, key.clone()))
                .add_result(result);
        }
        Ok(())
    }

    /// Sort results inside every group, then the groups themselves.
    pub fn sort_groups_and_results(&mut self) {
        for group in self.groups.values_mut() {
            group.sort_results(&self.sorter);
        }
        self.groups.sort_by(|_, a, _, b| a.compare(b));
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn result_count(&self) -> usize {
        self.groups.values().map(Group::len).sum()
    }

    /// Group sizes in current group order.
    #[must_use]
    pub fn group_sizes(&self) -> IndexMap<GroupKey, usize> {
        self.groups
            .iter()
            .map(|(key, group)| (key.clone(), group.len()))
            .collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    #[must_use]
    pub fn into_grouped_results(self) -> GroupedResults {
        self.groups
            .into_values()
            .map(Group::into_parts)
            .collect()
    }
}
