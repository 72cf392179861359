//! Result ordering within a group.
//!
//! A [`ResultsSorter`] is a priority list of comparators built from a
//! [`SortingMethod`]. The first comparator that does not return `Equal`
//! decides. A default comparator always runs last so the order is total:
//! files fall back to lower-cased name then object id, domains to
//! frequency rank, lower-cased domain and data source id.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attributes::GroupingAttribute;
use crate::results::{DomainResult, FileResult, SearchResult};

pub type ResultComparator = fn(&SearchResult, &SearchResult) -> Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortingMethod {
    ByFileName,
    ByDataSource,
    ByFileSize,
    ByFileType,
    ByFrequency,
    ByKeywordListNames,
    ByFullPath,
    ByDomainName,
    ByPageViews,
    ByDownloads,
    ByLastActivity,
}

impl SortingMethod {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ByFileName => "File Name",
            Self::ByDataSource => "Data Source",
            Self::ByFileSize => "File Size",
            Self::ByFileType => "File Type",
            Self::ByFrequency => "Past Occurrences",
            Self::ByKeywordListNames => "Keyword List Names",
            Self::ByFullPath => "Full Path",
            Self::ByDomainName => "Domain Name",
            Self::ByPageViews => "Page Views",
            Self::ByDownloads => "File Downloads",
            Self::ByLastActivity => "Last Activity Date",
        }
    }

    /// Attributes whose enrichment the comparators depend on.
    #[must_use]
    pub const fn required_attributes(self) -> &'static [GroupingAttribute] {
        match self {
            Self::ByFrequency => &[GroupingAttribute::Frequency],
            Self::ByKeywordListNames => &[GroupingAttribute::KeywordList],
            Self::ByDataSource => &[GroupingAttribute::DataSource],
            _ => &[],
        }
    }

    #[must_use]
    pub const fn options_for_files() -> &'static [Self] {
        &[
            Self::ByFileSize,
            Self::ByFullPath,
            Self::ByFileName,
            Self::ByDataSource,
        ]
    }

    #[must_use]
    pub const fn options_for_domains() -> &'static [Self] {
        &[
            Self::ByPageViews,
            Self::ByDownloads,
            Self::ByLastActivity,
            Self::ByDomainName,
        ]
    }

    fn primary_comparator(self) -> ResultComparator {
        match self {
            Self::ByFileName => compare_file_name,
            Self::ByDataSource => compare_data_source,
            Self::ByFileSize => compare_file_size,
            Self::ByFileType => compare_file_type,
            Self::ByFrequency => compare_frequency,
            Self::ByKeywordListNames => compare_keyword_lists,
            Self::ByFullPath => compare_full_path,
            Self::ByDomainName => compare_domain_name,
            Self::ByPageViews => compare_page_views,
            Self::ByDownloads => compare_downloads,
            Self::ByLastActivity => compare_last_activity,
        }
    }
}

impl fmt::Display for SortingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Comparator chain for one sorting method.
#[derive(Clone)]
pub struct ResultsSorter {
    method: SortingMethod,
    comparators: Vec<ResultComparator>,
}

impl ResultsSorter {
    #[must_use]
    pub fn new(method: SortingMethod) -> Self {
        Self {
            method,
            comparators: vec![method.primary_comparator(), compare_default],
        }
    }

    #[must_use]
    pub const fn method(&self) -> SortingMethod {
        self.method
    }

    #[must_use]
    pub fn compare(&self, a: &SearchResult, b: &SearchResult) -> Ordering {
        self.comparators
            .iter()
            .map(|cmp| cmp(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    pub fn sort(&self, results: &mut [SearchResult]) {
        results.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Debug for ResultsSorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsSorter")
            .field("method", &self.method)
            .field("comparators", &self.comparators.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn files<'r>(a: &'r SearchResult, b: &'r SearchResult) -> Option<(&'r FileResult, &'r FileResult)> {
    Some((a.as_file()?, b.as_file()?))
}

fn domains<'r>(
    a: &'r SearchResult,
    b: &'r SearchResult,
) -> Option<(&'r DomainResult, &'r DomainResult)> {
    Some((a.as_domain()?, b.as_domain()?))
}

fn compare_file_name(a: &SearchResult, b: &SearchResult) -> Ordering {
    files(a, b).map_or(Ordering::Equal, |(x, y)| {
        cmp_ignore_case(&x.first_instance().name, &y.first_instance().name)
    })
}

fn compare_full_path(a: &SearchResult, b: &SearchResult) -> Ordering {
    files(a, b).map_or(Ordering::Equal, |(x, y)| {
        cmp_ignore_case(&x.first_instance().full_path(), &y.first_instance().full_path())
    })
}

/// Largest first.
fn compare_file_size(a: &SearchResult, b: &SearchResult) -> Ordering {
    files(a, b).map_or(Ordering::Equal, |(x, y)| {
        y.first_instance().size.cmp(&x.first_instance().size)
    })
}

fn compare_file_type(a: &SearchResult, b: &SearchResult) -> Ordering {
    files(a, b).map_or(Ordering::Equal, |(x, y)| {
        x.file_type()
            .ranking()
            .cmp(&y.file_type().ranking())
            .then_with(|| {
                x.first_instance()
                    .mime_type
                    .as_deref()
                    .unwrap_or("")
                    .cmp(y.first_instance().mime_type.as_deref().unwrap_or(""))
            })
    })
}

/// Files with keyword hits first, then by the joined list names.
fn compare_keyword_lists(a: &SearchResult, b: &SearchResult) -> Ordering {
    files(a, b).map_or(Ordering::Equal, |(x, y)| {
        let xs = x.keyword_list_names();
        let ys = y.keyword_list_names();
        match (xs.is_empty(), ys.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let xj = xs.iter().cloned().collect::<Vec<_>>().join(",");
                let yj = ys.iter().cloned().collect::<Vec<_>>().join(",");
                cmp_ignore_case(&xj, &yj)
            }
        }
    })
}

fn compare_data_source(a: &SearchResult, b: &SearchResult) -> Ordering {
    let name = |r: &SearchResult| -> String {
        match r {
            SearchResult::File(f) => f.data_source_name().unwrap_or("").to_string(),
            SearchResult::Domain(d) => d.data_source_name.clone().unwrap_or_default(),
        }
    };
    cmp_ignore_case(&name(a), &name(b)).then_with(|| a.data_source_id().cmp(&b.data_source_id()))
}

fn compare_frequency(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.frequency().ranking().cmp(&b.frequency().ranking())
}

fn compare_domain_name(a: &SearchResult, b: &SearchResult) -> Ordering {
    domains(a, b).map_or(Ordering::Equal, |(x, y)| cmp_ignore_case(&x.domain, &y.domain))
}

/// Most viewed first.
fn compare_page_views(a: &SearchResult, b: &SearchResult) -> Ordering {
    domains(a, b).map_or(Ordering::Equal, |(x, y)| {
        y.total_page_views.cmp(&x.total_page_views)
    })
}

fn compare_downloads(a: &SearchResult, b: &SearchResult) -> Ordering {
    domains(a, b).map_or(Ordering::Equal, |(x, y)| {
        y.files_downloaded.cmp(&x.files_downloaded)
    })
}

/// Most recent first.
fn compare_last_activity(a: &SearchResult, b: &SearchResult) -> Ordering {
    domains(a, b).map_or(Ordering::Equal, |(x, y)| y.activity_end.cmp(&x.activity_end))
}

fn compare_default(a: &SearchResult, b: &SearchResult) -> Ordering {
    match (a, b) {
        (SearchResult::File(x), SearchResult::File(y)) => {
            let (x, y) = (x.first_instance(), y.first_instance());
            cmp_ignore_case(&x.name, &y.name).then_with(|| x.id.cmp(&y.id))
        }
        (SearchResult::Domain(x), SearchResult::Domain(y)) => x
            .frequency
            .ranking()
            .cmp(&y.frequency.ranking())
            .then_with(|| cmp_ignore_case(&x.domain, &y.domain))
            .then_with(|| x.data_source_id.cmp(&y.data_source_id)),
        (SearchResult::File(_), SearchResult::Domain(_)) => Ordering::Less,
        (SearchResult::Domain(_), SearchResult::File(_)) => Ordering::Greater,
    }
}
